use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::error::Result;

/// Top-level configuration for a Courier deployment.
///
/// Loaded from a TOML file by the composition root. Each section covers one
/// concern; missing sections fall back to their defaults.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CourierConfig {
    #[serde(default)]
    pub general: GeneralConfig,
    #[serde(default)]
    pub bus: BusConfig,
    #[serde(default)]
    pub bootstrap: BootstrapConfig,
}

impl CourierConfig {
    /// Load configuration from a TOML file.
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: CourierConfig = toml::from_str(&content)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }

    /// Load configuration from a TOML file, falling back to defaults if the
    /// file does not exist or cannot be parsed.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                warn!(
                    "Failed to load config from {}: {}. Using defaults.",
                    path.display(),
                    e
                );
                Self::default()
            }
        }
    }

    /// Save the current configuration to a TOML file.
    pub fn save(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        info!("Configuration saved to {}", path.display());
        Ok(())
    }
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log level: trace, debug, info, warn, error.
    pub log_level: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
        }
    }
}

/// Event bus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BusConfig {
    /// Per-subscriber queue depth. A subscriber that falls further behind
    /// than this loses events (isolated to that subscriber).
    pub queue_capacity: usize,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self { queue_capacity: 256 }
    }
}

/// Bootstrap snapshot settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BootstrapConfig {
    /// Maximum conversations included in a bootstrap snapshot. `None`
    /// includes all.
    pub conversation_limit: Option<u64>,
    /// Maximum contacts included in a bootstrap snapshot. `None` includes
    /// all.
    pub contact_limit: Option<u64>,
    /// Recent messages included in a bootstrap snapshot. Zero omits the
    /// message section entirely.
    pub recent_messages: u64,
}

impl Default for BootstrapConfig {
    fn default() -> Self {
        Self {
            conversation_limit: None,
            contact_limit: None,
            recent_messages: 0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CourierConfig::default();
        assert_eq!(config.general.log_level, "info");
        assert_eq!(config.bus.queue_capacity, 256);
        assert_eq!(config.bootstrap.conversation_limit, None);
        assert_eq!(config.bootstrap.recent_messages, 0);
    }

    #[test]
    fn test_save_and_load_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("courier.toml");

        let mut config = CourierConfig::default();
        config.general.log_level = "debug".to_string();
        config.bus.queue_capacity = 64;
        config.bootstrap.contact_limit = Some(500);
        config.save(&path).unwrap();

        let loaded = CourierConfig::load(&path).unwrap();
        assert_eq!(loaded.general.log_level, "debug");
        assert_eq!(loaded.bus.queue_capacity, 64);
        assert_eq!(loaded.bootstrap.contact_limit, Some(500));
    }

    #[test]
    fn test_load_missing_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        assert!(CourierConfig::load(&path).is_err());
    }

    #[test]
    fn test_load_or_default_falls_back() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("does-not-exist.toml");
        let config = CourierConfig::load_or_default(&path);
        assert_eq!(config.bus.queue_capacity, 256);
    }

    #[test]
    fn test_partial_file_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("partial.toml");
        std::fs::write(&path, "[bus]\nqueue_capacity = 8\n").unwrap();

        let config = CourierConfig::load(&path).unwrap();
        assert_eq!(config.bus.queue_capacity, 8);
        assert_eq!(config.general.log_level, "info");
    }

    #[test]
    fn test_malformed_file_errors() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.toml");
        std::fs::write(&path, "[bus\nqueue_capacity = ").unwrap();
        assert!(CourierConfig::load(&path).is_err());
    }
}
