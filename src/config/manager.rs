//! Configuration manager for loading and saving icon settings
//!
//! Settings are stored as JSON (by default `$ICONPACK_HOME/iconpack/config.json`)
//! with atomic writes to prevent corruption.

use crate::config::models::EngineConfig;
use crate::error::{IconPackError, Result, StringError};
use std::io::Write;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Configuration manager bound to one settings file
#[derive(Debug, Clone)]
pub struct ConfigManager {
    path: PathBuf,
}

impl ConfigManager {
    /// Manager for the settings file at `path`
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Default settings path
    ///
    /// Returns `$ICONPACK_HOME/iconpack/config.json`, relative to the working
    /// directory when the variable is unset.
    pub fn default_path() -> PathBuf {
        let home = std::env::var("ICONPACK_HOME").unwrap_or_else(|_| ".".to_string());
        PathBuf::from(home).join("iconpack").join("config.json")
    }

    /// Path of the settings file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load configuration from disk
    ///
    /// If the file doesn't exist or is corrupt, returns default configuration.
    pub fn load(&self) -> Result<EngineConfig> {
        if !self.path.exists() {
            info!("Configuration file not found, using defaults");
            return Ok(EngineConfig::default());
        }

        let json = std::fs::read_to_string(&self.path)?;
        match serde_json::from_str(&json) {
            Ok(config) => {
                info!("Configuration loaded from {}", self.path.display());
                Ok(config)
            }
            Err(e) => {
                warn!("Failed to parse configuration, using defaults: {}", e);
                Ok(EngineConfig::default())
            }
        }
    }

    /// Save configuration with an atomic write
    pub fn save(&self, config: &EngineConfig) -> Result<()> {
        let config_dir = self
            .path
            .parent()
            .ok_or_else(|| IconPackError::ConfigError(StringError::new("Invalid config path")))?;
        std::fs::create_dir_all(config_dir)?;

        let json = serde_json::to_string_pretty(config)?;
        let mut temp = tempfile::NamedTempFile::new_in(config_dir)?;
        temp.write_all(json.as_bytes())?;
        temp.persist(&self.path)
            .map_err(|e| IconPackError::IoError(e.error))?;

        info!("Configuration saved to {}", self.path.display());
        Ok(())
    }
}
