//! Network block configuration types.

use crate::color::Color;
use crate::threshold::ThresholdMap;
use serde::{Deserialize, Serialize};

/// Network speed unit types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum SpeedUnit {
    BytesPerSec,
    #[default]
    KiBPerSec,
    MiBPerSec,
}

impl SpeedUnit {
    pub fn bytes(&self) -> f64 {
        match self {
            SpeedUnit::BytesPerSec => 1.0,
            SpeedUnit::KiBPerSec => 1024.0,
            SpeedUnit::MiBPerSec => 1024.0 * 1024.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            SpeedUnit::BytesPerSec => "B/s",
            SpeedUnit::KiBPerSec => "KiB/s",
            SpeedUnit::MiBPerSec => "MiB/s",
        }
    }
}

fn default_format() -> String {
    "{interface} U {upload:.0}{unit} D {download:.0}{unit}".to_string()
}

fn default_colors() -> ThresholdMap<Option<Color>> {
    ThresholdMap::new(vec![
        (1024.0 * 1024.0, Some(Color::WARN)),
        (5.0 * 1024.0 * 1024.0, Some(Color::URGENT)),
    ])
    .unwrap_or_default()
}

fn default_update_interval() -> u64 {
    3000
}

/// Network block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkBlockConfig {
    pub interface: String,
    #[serde(default)]
    pub unit: SpeedUnit,
    /// Placeholders: interface, upload, download, unit,
    /// total_upload, total_download (bytes)
    #[serde(default = "default_format")]
    pub format: String,
    /// Foreground color by the faster direction, in bytes per second
    #[serde(default = "default_colors")]
    pub colors: ThresholdMap<Option<Color>>,
    #[serde(default = "default_update_interval")]
    pub interval_ms: u64,
}

impl Default for NetworkBlockConfig {
    fn default() -> Self {
        Self {
            interface: "eth0".to_string(),
            unit: SpeedUnit::KiBPerSec,
            format: default_format(),
            colors: default_colors(),
            interval_ms: default_update_interval(),
        }
    }
}
