//! rg-blocks: an i3bar-compatible status line generator
//!
//! This library provides:
//! - The block runtime: one task per block, a compositor that keeps the
//!   line in registration order, and click routing back to blocks
//! - The i3bar protocol adapter
//! - Configuration management

pub mod config;
pub mod core;
pub mod protocol;

// Re-export commonly used types
pub use config::AppConfig;
pub use core::{RegisterOptions, Runner};
pub use rg_blocks_core::{Block, Failure, Fragment, Registry};
pub use rg_blocks_sources as sources;
