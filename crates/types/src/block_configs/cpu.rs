//! CPU block configuration types.

use crate::color::Color;
use crate::threshold::ThresholdMap;
use serde::{Deserialize, Serialize};

fn default_format() -> String {
    "C {usage:.1}%".to_string()
}

fn default_colors() -> ThresholdMap<Option<Color>> {
    ThresholdMap::new(vec![(50.0, Some(Color::WARN)), (75.0, Some(Color::URGENT))])
        .unwrap_or_default()
}

fn default_update_interval() -> u64 {
    1000
}

/// CPU block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CpuBlockConfig {
    /// Placeholders: usage, cores, frequency
    #[serde(default = "default_format")]
    pub format: String,
    /// Foreground color by global usage percentage
    #[serde(default = "default_colors")]
    pub colors: ThresholdMap<Option<Color>>,
    #[serde(default = "default_update_interval")]
    pub interval_ms: u64,
}

impl Default for CpuBlockConfig {
    fn default() -> Self {
        Self {
            format: default_format(),
            colors: default_colors(),
            interval_ms: default_update_interval(),
        }
    }
}
