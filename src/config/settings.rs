//! Application configuration

use rg_blocks_core::DEFAULT_POLL_TIMEOUT;
use rg_blocks_types::block_configs::ClockBlockConfig;
use rg_blocks_types::{BlockConfig, BlockEntry};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

/// Current config format version
pub const CONFIG_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("could not determine config directory")]
    NoConfigDir,

    #[error("cannot read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("cannot parse {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("unsupported config version {0} (expected {CONFIG_VERSION})")]
    UnsupportedVersion(u32),

    #[error("poll_timeout_ms must be greater than zero")]
    ZeroPollTimeout,
}

fn default_version() -> u32 {
    CONFIG_VERSION
}

fn default_poll_timeout_ms() -> u64 {
    DEFAULT_POLL_TIMEOUT.as_millis() as u64
}

fn default_click_events() -> bool {
    true
}

/// Application-wide configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Version of the config format
    #[serde(default = "default_version")]
    pub version: u32,
    /// Upper bound on a single poll or event handler call
    #[serde(default = "default_poll_timeout_ms")]
    pub poll_timeout_ms: u64,
    /// Ask the host to send click events
    #[serde(default = "default_click_events")]
    pub click_events: bool,
    /// Blocks in display order
    #[serde(default)]
    pub blocks: Vec<BlockEntry>,
}

impl AppConfig {
    /// Load configuration from the user's config directory, falling back
    /// to the defaults when no file exists there
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_path()?;

        if !config_path.exists() {
            log::info!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }

        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific file path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_json(&content).map_err(|e| match e {
            ConfigError::Parse { source, .. } => ConfigError::Parse {
                path: path.to_path_buf(),
                source,
            },
            other => other,
        })?;

        log::info!(
            "Loaded {} blocks from {}",
            config.blocks.len(),
            path.display()
        );
        Ok(config)
    }

    /// Parse and validate a JSON document
    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(content).map_err(|source| ConfigError::Parse {
            path: PathBuf::new(),
            source,
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Get the configuration file path
    pub fn config_path() -> Result<PathBuf, ConfigError> {
        let dirs = directories::ProjectDirs::from("com", "github.rg_blocks", "rg-blocks")
            .ok_or(ConfigError::NoConfigDir)?;

        Ok(dirs.config_dir().join("config.json"))
    }

    pub fn poll_timeout(&self) -> Duration {
        Duration::from_millis(self.poll_timeout_ms)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.version != CONFIG_VERSION {
            return Err(ConfigError::UnsupportedVersion(self.version));
        }
        if self.poll_timeout_ms == 0 {
            return Err(ConfigError::ZeroPollTimeout);
        }
        Ok(())
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            version: CONFIG_VERSION,
            poll_timeout_ms: default_poll_timeout_ms(),
            click_events: true,
            blocks: vec![BlockEntry::new(BlockConfig::Clock(ClockBlockConfig::default()))],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_round_trips() {
        let json = serde_json::to_string_pretty(&AppConfig::default()).unwrap();
        let config = AppConfig::from_json(&json).unwrap();
        assert_eq!(config.blocks.len(), 1);
        assert_eq!(config.blocks[0].identity(), "clock");
        assert_eq!(config.poll_timeout(), DEFAULT_POLL_TIMEOUT);
    }

    #[test]
    fn test_minimal_document() {
        let config = AppConfig::from_json(
            r#"{"blocks": [
                {"block_type": "text", "text": "hello"},
                {"block_type": "mumble", "name": "voice", "host": "example.org"}
            ]}"#,
        )
        .unwrap();

        assert_eq!(config.version, CONFIG_VERSION);
        assert!(config.click_events);
        let names: Vec<&str> = config.blocks.iter().map(|b| b.identity()).collect();
        assert_eq!(names, vec!["text", "voice"]);
    }

    #[test]
    fn test_invalid_documents() {
        assert!(matches!(
            AppConfig::from_json(r#"{"version": 7}"#),
            Err(ConfigError::UnsupportedVersion(7))
        ));
        assert!(matches!(
            AppConfig::from_json(r#"{"poll_timeout_ms": 0}"#),
            Err(ConfigError::ZeroPollTimeout)
        ));
        // Threshold keys must be numbers
        assert!(matches!(
            AppConfig::from_json(
                r##"{"blocks": [{"block_type": "cpu", "colors": {"high": "#FF0000"}}]}"##
            ),
            Err(ConfigError::Parse { .. })
        ));
        // Boundaries are compared as numbers, so "1" and "1.0" collide
        let err = AppConfig::from_json(
            r##"{"blocks": [{"block_type": "cpu", "colors": {"1": "#FF0000", "1.0": "#00FF00"}}]}"##,
        )
        .unwrap_err();
        assert!(err.to_string().contains("more than once"), "{}", err);
    }

    #[test]
    fn test_load_from_missing_path() {
        let err = AppConfig::load_from_path(Path::new("/nonexistent/rg-blocks.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Read { .. }));
    }
}
