//! Registry of block factories, keyed by block type

use crate::block::BoxedBlock;
use crate::error::{BlockInitError, RegistryError};
use rg_blocks_types::BlockConfig;
use std::collections::BTreeMap;

/// Function that builds a block from its configuration
pub type BlockFactory = fn(&BlockConfig) -> Result<BoxedBlock, BlockInitError>;

/// Description of a registered block type
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BlockInfo {
    pub id: String,
    pub description: String,
}

struct Entry {
    description: String,
    factory: BlockFactory,
}

/// Maps block type IDs to the factories that build them.
///
/// The registry is an ordinary value owned by whoever assembles the bar,
/// so tests can register fakes without touching shared state.
#[derive(Default)]
pub struct Registry {
    factories: BTreeMap<String, Entry>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a block type. A later registration for the same ID
    /// replaces the earlier one.
    pub fn register(&mut self, id: &str, description: &str, factory: BlockFactory) {
        let previous = self.factories.insert(
            id.to_string(),
            Entry {
                description: description.to_string(),
                factory,
            },
        );
        if previous.is_some() {
            log::warn!("Block type '{}' registered twice, keeping the latest", id);
        }
    }

    /// Build a block for `config`, labelling failures with `name`
    pub fn create(&self, name: &str, config: &BlockConfig) -> Result<BoxedBlock, RegistryError> {
        let id = config.block_type();
        let entry = self
            .factories
            .get(id)
            .ok_or_else(|| RegistryError::UnknownType(id.to_string()))?;
        (entry.factory)(config).map_err(|source| RegistryError::InvalidConfig {
            name: name.to_string(),
            source,
        })
    }

    pub fn contains(&self, id: &str) -> bool {
        self.factories.contains_key(id)
    }

    /// List registered block types, sorted by ID
    pub fn list(&self) -> Vec<BlockInfo> {
        self.factories
            .iter()
            .map(|(id, entry)| BlockInfo {
                id: id.clone(),
                description: entry.description.clone(),
            })
            .collect()
    }
}
