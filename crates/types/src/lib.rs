//! rg-blocks-types: Shared data types for the rg-blocks status line generator.
//!
//! This crate contains pure data types (fragments, colors, click events,
//! threshold mappings, field metadata and block configs) that are shared
//! across all rg-blocks crates. Nothing in here touches the runtime, so it
//! is suitable as a foundation layer.

pub mod block_configs;
pub mod color;
pub mod event;
pub mod field;
pub mod fragment;
pub mod threshold;

// Re-export commonly used types at the crate root for convenience
pub use block_configs::{BlockConfig, BlockEntry};
pub use color::{Color, ColorParseError};
pub use event::{ClickEvent, EventKind, MouseButton};
pub use field::{FieldMetadata, FieldPurpose, FieldType};
pub use fragment::{Align, BlockStyle, Fragment, Markup};
pub use threshold::{resolve, ThresholdError, ThresholdMap};
