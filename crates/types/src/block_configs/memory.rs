//! Memory block configuration types.

use crate::color::Color;
use crate::threshold::ThresholdMap;
use serde::{Deserialize, Serialize};

fn default_format() -> String {
    "M {available:.1}GiB".to_string()
}

fn default_colors() -> ThresholdMap<Option<Color>> {
    ThresholdMap::new(vec![(70.0, Some(Color::WARN)), (90.0, Some(Color::URGENT))])
        .unwrap_or_default()
}

fn default_update_interval() -> u64 {
    3000
}

/// Memory block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MemoryBlockConfig {
    /// Placeholders: total, used, available (GiB), percent, swap_used,
    /// swap_total (GiB)
    #[serde(default = "default_format")]
    pub format: String,
    /// Foreground color by used percentage
    #[serde(default = "default_colors")]
    pub colors: ThresholdMap<Option<Color>>,
    #[serde(default = "default_update_interval")]
    pub interval_ms: u64,
}

impl Default for MemoryBlockConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            colors: default_colors(),
            interval_ms: default_update_interval(),
        }
    }
}
