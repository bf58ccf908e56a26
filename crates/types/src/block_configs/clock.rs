//! Clock block configuration types.

use serde::{Deserialize, Serialize};

fn default_format_time() -> String {
    "%T".to_string()
}

fn default_format_date() -> String {
    "%D".to_string()
}

fn default_update_interval() -> u64 {
    1000
}

/// Clock block configuration
///
/// Both formats are strftime strings; clicking the block switches between
/// them, so either may show date, time or both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClockBlockConfig {
    #[serde(default = "default_format_time")]
    pub format_time: String,
    #[serde(default = "default_format_date")]
    pub format_date: String,
    #[serde(default = "default_update_interval")]
    pub interval_ms: u64,
}

impl Default for ClockBlockConfig {
    fn default() -> Self {
        Self {
            format_time: default_format_time(),
            format_date: default_format_date(),
            interval_ms: default_update_interval(),
        }
    }
}
