//! rg-blocks-core: Core traits and registry for rg-blocks.
//!
//! This crate contains the `Block` capability contract every probe
//! implements, the failure type a poll can return, the named-field
//! template engine used for block text, and the factory `Registry`.

pub mod constants;
mod block;
mod error;
mod registry;
pub mod template;

pub use block::{Block, BlockMetadata, BoxedBlock, Failure, FailureReason};
pub use constants::{BYTES_PER_GIB, DEFAULT_POLL_TIMEOUT};
pub use error::{BlockInitError, RegistryError};
pub use registry::{BlockFactory, BlockInfo, Registry};
pub use template::{Template, TemplateError};

// Re-export types used in trait signatures for convenience
pub use rg_blocks_types::{
    BlockConfig, BlockStyle, ClickEvent, Color, FieldMetadata, FieldPurpose, FieldType, Fragment,
    MouseButton, ThresholdMap,
};
