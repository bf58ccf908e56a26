//! Disk block configuration types.

use crate::color::Color;
use crate::threshold::ThresholdMap;
use serde::{Deserialize, Serialize};

/// Disk capacity unit types
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub enum DiskUnit {
    MiB,
    #[default]
    GiB,
    TiB,
}

impl DiskUnit {
    pub fn bytes(&self) -> f64 {
        match self {
            DiskUnit::MiB => 1024.0 * 1024.0,
            DiskUnit::GiB => 1024.0 * 1024.0 * 1024.0,
            DiskUnit::TiB => 1024.0 * 1024.0 * 1024.0 * 1024.0,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DiskUnit::MiB => "MiB",
            DiskUnit::GiB => "GiB",
            DiskUnit::TiB => "TiB",
        }
    }
}

fn default_path() -> String {
    "/".to_string()
}

fn default_format() -> String {
    "{label}: {free:.1}{unit}".to_string()
}

fn default_colors() -> ThresholdMap<Option<Color>> {
    ThresholdMap::new(vec![(80.0, Some(Color::WARN)), (95.0, Some(Color::URGENT))])
        .unwrap_or_default()
}

fn default_update_interval() -> u64 {
    5000
}

/// Disk block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskBlockConfig {
    /// Mount point to report on
    #[serde(default = "default_path")]
    pub path: String,
    /// Abbreviate the label to the first letter of each component
    #[serde(default)]
    pub short_label: bool,
    #[serde(default)]
    pub unit: DiskUnit,
    /// Placeholders: label, path, free, used, total, percent, unit
    #[serde(default = "default_format")]
    pub format: String,
    /// Foreground color by used percentage
    #[serde(default = "default_colors")]
    pub colors: ThresholdMap<Option<Color>>,
    #[serde(default = "default_update_interval")]
    pub interval_ms: u64,
}

impl Default for DiskBlockConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            short_label: false,
            unit: DiskUnit::GiB,
            format: default_format(),
            colors: default_colors(),
            interval_ms: default_update_interval(),
        }
    }
}
