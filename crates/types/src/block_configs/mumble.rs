//! Mumble latency block configuration types.

use crate::color::Color;
use crate::threshold::ThresholdMap;
use serde::{Deserialize, Serialize};

fn default_host() -> String {
    "localhost".to_string()
}

fn default_port() -> u16 {
    64738
}

fn default_timeout_ms() -> u64 {
    1000
}

fn default_format_success() -> String {
    "M {users} {ping:.0f}ms".to_string()
}

fn default_format_timeout() -> String {
    "timeout".to_string()
}

fn default_backgrounds_ping() -> ThresholdMap<Option<Color>> {
    ThresholdMap::new(vec![(100.0, Some(Color::WARN))]).unwrap_or_default()
}

fn default_background_timeout() -> Option<Color> {
    Some(Color::URGENT)
}

fn default_update_interval() -> u64 {
    60_000
}

/// Mumble block configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MumbleBlockConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// How long to wait for the reply datagram
    #[serde(default = "default_timeout_ms")]
    pub timeout_ms: u64,
    /// Placeholders: ping, users, max_users, version, bandwidth
    #[serde(default = "default_format_success")]
    pub format_success: String,
    /// Shown on timeout, no placeholders
    #[serde(default = "default_format_timeout")]
    pub format_timeout: String,
    /// Background by connected users; lowest precedence
    #[serde(default)]
    pub backgrounds_users: ThresholdMap<Option<Color>>,
    /// Background by latency in ms; wins over `backgrounds_users`
    #[serde(default = "default_backgrounds_ping")]
    pub backgrounds_ping: ThresholdMap<Option<Color>>,
    #[serde(default = "default_background_timeout")]
    pub background_timeout: Option<Color>,
    #[serde(default = "default_update_interval")]
    pub interval_ms: u64,
}

impl Default for MumbleBlockConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            timeout_ms: default_timeout_ms(),
            format_success: default_format_success(),
            format_timeout: default_format_timeout(),
            backgrounds_users: ThresholdMap::empty(),
            backgrounds_ping: default_backgrounds_ping(),
            background_timeout: default_background_timeout(),
            interval_ms: default_update_interval(),
        }
    }
}
