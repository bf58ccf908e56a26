//! Shell command block configuration types.

use crate::color::Color;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

fn default_format() -> String {
    "{output}".to_string()
}

fn default_timeout_ms() -> u64 {
    5000
}

fn default_update_interval() -> u64 {
    1000
}

/// Shell block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellBlockConfig {
    /// Command line handed to `sh -c`
    pub command: String,
    /// Placeholders: output, output_err, status
    #[serde(default = "default_format")]
    pub format: String,
    /// Command to run per mouse button id ("1".."5") before refreshing
    #[serde(default)]
    pub command_on_click: HashMap<String, String>,
    /// Foreground color keyed by exit status ("0", "1", ...)
    #[serde(default)]
    pub color_by_returncode: HashMap<String, Color>,
    /// Upper bound for a single command run
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    #[serde(default = "default_update_interval")]
    pub interval_ms: u64,
}

impl Default for ShellBlockConfig {
    fn default() -> Self {
        Self {
            command: "true".to_string(),
            format: default_format(),
            command_on_click: HashMap::new(),
            color_by_returncode: HashMap::new(),
            timeout_ms: default_timeout_ms(),
            interval_ms: default_update_interval(),
        }
    }
}
