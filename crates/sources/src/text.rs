//! Static text block

use async_trait::async_trait;
use rg_blocks_core::{Block, BlockConfig, BlockInitError, BlockMetadata, BoxedBlock, Failure, Fragment};
use rg_blocks_types::block_configs::TextBlockConfig;
use std::time::Duration;

/// Fixed text that only re-renders when asked to
pub struct TextBlock {
    metadata: BlockMetadata,
    fragment: Fragment,
}

impl TextBlock {
    pub fn new(config: &TextBlockConfig) -> Self {
        let mut fragment = Fragment::new(config.text.clone());
        if let Some(short_text) = &config.short_text {
            fragment = fragment.with_short_text(short_text.clone());
        }

        Self {
            metadata: BlockMetadata::new("text", "Static text", Duration::ZERO),
            fragment,
        }
    }
}

#[async_trait]
impl Block for TextBlock {
    fn metadata(&self) -> &BlockMetadata {
        &self.metadata
    }

    fn placeholder(&self) -> Option<Fragment> {
        Some(self.fragment.clone())
    }

    async fn poll(&mut self) -> Result<Fragment, Failure> {
        Ok(self.fragment.clone())
    }
}

pub fn build(config: &BlockConfig) -> Result<BoxedBlock, BlockInitError> {
    match config {
        BlockConfig::Text(cfg) => Ok(Box::new(TextBlock::new(cfg))),
        other => Err(BlockInitError::WrongConfig {
            expected: "text",
            actual: other.block_type(),
        }),
    }
}
