//! Block configuration types for all built-in blocks.

pub mod clock;
pub mod cpu;
pub mod disk;
pub mod memory;
pub mod mumble;
pub mod network;
pub mod shell;
pub mod text;

use crate::fragment::BlockStyle;
use serde::{Deserialize, Serialize};

pub use clock::ClockBlockConfig;
pub use cpu::CpuBlockConfig;
pub use disk::{DiskBlockConfig, DiskUnit};
pub use memory::MemoryBlockConfig;
pub use mumble::MumbleBlockConfig;
pub use network::{NetworkBlockConfig, SpeedUnit};
pub use shell::ShellBlockConfig;
pub use text::TextBlockConfig;

/// Type-safe enum for all block configurations.
/// Uses serde tag for JSON serialization: {"block_type": "cpu", ...}
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "block_type")]
pub enum BlockConfig {
    #[serde(rename = "clock")]
    Clock(ClockBlockConfig),

    #[serde(rename = "cpu")]
    Cpu(CpuBlockConfig),

    #[serde(rename = "memory")]
    Memory(MemoryBlockConfig),

    #[serde(rename = "disk")]
    Disk(DiskBlockConfig),

    #[serde(rename = "network")]
    Network(NetworkBlockConfig),

    #[serde(rename = "mumble")]
    Mumble(MumbleBlockConfig),

    #[serde(rename = "shell")]
    Shell(ShellBlockConfig),

    #[serde(rename = "text")]
    Text(TextBlockConfig),
}

impl BlockConfig {
    /// Get the block type ID string
    pub fn block_type(&self) -> &'static str {
        match self {
            BlockConfig::Clock(_) => "clock",
            BlockConfig::Cpu(_) => "cpu",
            BlockConfig::Memory(_) => "memory",
            BlockConfig::Disk(_) => "disk",
            BlockConfig::Network(_) => "network",
            BlockConfig::Mumble(_) => "mumble",
            BlockConfig::Shell(_) => "shell",
            BlockConfig::Text(_) => "text",
        }
    }

    /// Polling interval in milliseconds; zero means event-driven only
    pub fn interval_ms(&self) -> u64 {
        match self {
            BlockConfig::Clock(cfg) => cfg.interval_ms,
            BlockConfig::Cpu(cfg) => cfg.interval_ms,
            BlockConfig::Memory(cfg) => cfg.interval_ms,
            BlockConfig::Disk(cfg) => cfg.interval_ms,
            BlockConfig::Network(cfg) => cfg.interval_ms,
            BlockConfig::Mumble(cfg) => cfg.interval_ms,
            BlockConfig::Shell(cfg) => cfg.interval_ms,
            BlockConfig::Text(_) => 0,
        }
    }
}

/// One entry of the `blocks` list: options every block shares plus the
/// type-specific config
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlockEntry {
    /// Identity reported to the host; defaults to the block type
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// Instance reported to the host; defaults to a random UUID
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,
    /// Unix signal number that forces an immediate refresh
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub signal: Option<i32>,
    /// Default state layered under every fragment this block renders
    #[serde(default)]
    pub style: BlockStyle,
    #[serde(flatten)]
    pub config: BlockConfig,
}

impl BlockEntry {
    pub fn new(config: BlockConfig) -> Self {
        Self {
            name: None,
            instance: None,
            signal: None,
            style: BlockStyle::default(),
            config,
        }
    }

    /// Identity this entry registers under
    pub fn identity(&self) -> &str {
        self.name.as_deref().unwrap_or_else(|| self.config.block_type())
    }
}
