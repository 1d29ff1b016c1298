//! Store configuration
//!
//! Loaded from a JSON file:
//!
//! ```json
//! {
//!   "data_dir": "./data",
//!   "collection": "versions",
//!   "id_key": "id",
//!   "fsync": true,
//!   "log_level": "info"
//! }
//! ```
//!
//! Only `data_dir` is required.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::observability::Severity;
use crate::persistence::{DEFAULT_ID_KEY, RESERVED_KEYS};

/// Configuration errors
#[derive(Debug, Clone, Error)]
pub enum ConfigError {
    #[error("Failed to read config: {0}")]
    Read(String),

    #[error("Invalid config JSON: {0}")]
    Parse(String),

    #[error("Invalid config: {0}")]
    Invalid(String),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Data directory (required)
    pub data_dir: String,

    /// Collection (log file) name
    #[serde(default = "default_collection")]
    pub collection: String,

    /// Document field holding the identity
    #[serde(default = "default_id_key")]
    pub id_key: String,

    /// Sync the log after every write
    #[serde(default = "default_fsync")]
    pub fsync: bool,

    /// Minimum log severity: trace, info, warn, error, fatal
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_collection() -> String {
    "versions".to_string()
}
fn default_id_key() -> String {
    DEFAULT_ID_KEY.to_string()
}
fn default_fsync() -> bool {
    true
}
fn default_log_level() -> String {
    "info".to_string()
}

impl StoreConfig {
    /// Config with defaults for everything but the data directory.
    pub fn new(data_dir: impl Into<String>) -> Self {
        Self {
            data_dir: data_dir.into(),
            collection: default_collection(),
            id_key: default_id_key(),
            fsync: default_fsync(),
            log_level: default_log_level(),
        }
    }

    /// Load and validate configuration from file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::Read(e.to_string()))?;
        Self::from_json(&content)
    }

    pub fn from_json(content: &str) -> Result<Self, ConfigError> {
        let config: StoreConfig =
            serde_json::from_str(content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.data_dir.trim().is_empty() {
            return Err(ConfigError::Invalid("data_dir must not be empty".into()));
        }

        let collection_ok = !self.collection.is_empty()
            && self
                .collection
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-');
        if !collection_ok {
            return Err(ConfigError::Invalid(format!(
                "collection '{}' must be non-empty and use only [A-Za-z0-9_-]",
                self.collection
            )));
        }

        if self.id_key.is_empty() || RESERVED_KEYS.contains(&self.id_key.as_str()) {
            return Err(ConfigError::Invalid(format!(
                "id_key '{}' is empty or reserved",
                self.id_key
            )));
        }

        self.severity()?;
        Ok(())
    }

    pub fn severity(&self) -> Result<Severity, ConfigError> {
        self.log_level.parse().map_err(ConfigError::Invalid)
    }

    pub fn data_path(&self) -> &Path {
        Path::new(&self.data_dir)
    }
}
