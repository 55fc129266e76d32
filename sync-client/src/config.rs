//! Configuration for the sync engine.
//!
//! Configuration can be loaded from a TOML file; every field has a default,
//! so an empty file is valid.

use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Engine configuration.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct EngineConfig {
    /// Maximum number of topic groups processed at the same time
    /// (default: 0 = unbounded, every group starts immediately).
    #[serde(default = "default_max_concurrent_groups")]
    pub max_concurrent_groups: usize,
    /// Timeout in milliseconds for applying one action (default: none).
    /// A timed-out action is recorded as failed.
    #[serde(default)]
    pub apply_timeout_ms: Option<u64>,
    /// Timeout in milliseconds for one entity metadata lookup (default: none).
    /// A timed-out lookup counts as "no conflict data".
    #[serde(default)]
    pub lookup_timeout_ms: Option<u64>,
    /// Group key for actions without a topic id (default: "default").
    #[serde(default = "default_group")]
    pub default_group: String,
}

fn default_max_concurrent_groups() -> usize {
    0
}

fn default_group() -> String {
    sync_core::DEFAULT_GROUP.to_string()
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            max_concurrent_groups: default_max_concurrent_groups(),
            apply_timeout_ms: None,
            lookup_timeout_ms: None,
            default_group: default_group(),
        }
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// Bound the number of concurrently processed topic groups (0 = unbounded).
    pub fn with_max_concurrent_groups(mut self, max: usize) -> Self {
        self.max_concurrent_groups = max;
        self
    }

    /// Set the per-action apply timeout.
    pub fn with_apply_timeout(mut self, timeout: Duration) -> Self {
        self.apply_timeout_ms = Some(duration_to_ms(timeout));
        self
    }

    /// Set the per-lookup metadata timeout.
    pub fn with_lookup_timeout(mut self, timeout: Duration) -> Self {
        self.lookup_timeout_ms = Some(duration_to_ms(timeout));
        self
    }

    /// Set the group key for actions without a topic.
    pub fn with_default_group(mut self, group: &str) -> Self {
        self.default_group = group.to_string();
        self
    }

    /// Per-action apply timeout, if configured.
    pub fn apply_timeout(&self) -> Option<Duration> {
        self.apply_timeout_ms.map(Duration::from_millis)
    }

    /// Per-lookup metadata timeout, if configured.
    pub fn lookup_timeout(&self) -> Option<Duration> {
        self.lookup_timeout_ms.map(Duration::from_millis)
    }
}

fn duration_to_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
}
