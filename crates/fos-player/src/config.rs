//! Player Configuration
//!
//! Timing budget for discovery and selection plus debug panel limits.
//! Every field has a default, so partial JSON files are accepted.

use std::path::Path;

use serde::{Deserialize, Serialize};

/// Configuration error
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Invalid config: {0}")]
    Parse(#[from] serde_json::Error),
}

/// Player configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// `loadedmetadata` to the first track enumeration
    pub discovery_initial_delay_ms: u64,
    /// Track switched to hidden to its registration
    pub discovery_settle_ms: u64,
    /// `loadedmetadata` to the retry pass when the first one found nothing
    pub discovery_retry_delay_ms: u64,
    /// Embedded track switched on to renderer wiring
    pub embedded_activation_delay_ms: u64,
    /// Upper bound on waiting for the `<track>` load event
    pub track_load_timeout_ms: u64,
    /// Caption overlay state for a freshly loaded video
    pub captions_enabled: bool,
    pub debug: DebugConfig,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            discovery_initial_delay_ms: 500,
            discovery_settle_ms: 500,
            discovery_retry_delay_ms: 2000,
            embedded_activation_delay_ms: 500,
            track_load_timeout_ms: 500,
            captions_enabled: true,
            debug: DebugConfig::default(),
        }
    }
}

/// Debug panel limits
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DebugConfig {
    /// Lines kept by the page's own console and shown by the panel
    pub max_lines: usize,
    /// Minimum time between panel refreshes
    pub flush_interval_ms: u64,
}

impl Default for DebugConfig {
    fn default() -> Self {
        Self {
            max_lines: 500,
            flush_interval_ms: 250,
        }
    }
}

impl PlayerConfig {
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.display().to_string(),
            source,
        })?;
        let config = Self::from_json(&content)?;
        tracing::info!(path = %path.display(), "loaded player config");
        Ok(config)
    }

    pub fn to_json(&self) -> Result<String, ConfigError> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = PlayerConfig::default();
        assert_eq!(config.discovery_initial_delay_ms, 500);
        assert_eq!(config.discovery_retry_delay_ms, 2000);
        assert_eq!(config.track_load_timeout_ms, 500);
        assert!(config.captions_enabled);
        assert_eq!(config.debug.max_lines, 500);
    }

    #[test]
    fn test_partial_json() {
        let config = PlayerConfig::from_json(r#"{ "track_load_timeout_ms": 1000, "debug": { "max_lines": 50 } }"#).unwrap();
        assert_eq!(config.track_load_timeout_ms, 1000);
        assert_eq!(config.embedded_activation_delay_ms, 500);
        assert_eq!(config.debug.max_lines, 50);
        assert_eq!(config.debug.flush_interval_ms, 250);
    }

    #[test]
    fn test_serialization() {
        let mut config = PlayerConfig::default();
        config.captions_enabled = false;
        let json = config.to_json().unwrap();
        assert_eq!(PlayerConfig::from_json(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_json() {
        assert!(matches!(PlayerConfig::from_json("{ nope"), Err(ConfigError::Parse(_))));
    }

    #[test]
    fn test_missing_file() {
        let err = PlayerConfig::load(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(matches!(err, ConfigError::Io { .. }));
    }
}
