//! Runtime configuration loaded from `arrayrt.toml`.
//!
//! ```toml
//! [store]
//! pattern_cache_capacity = 64
//! default_ttl_secs = 0
//!
//! [dump]
//! max_depth = 32
//!
//! [log]
//! level = "info"
//! ```
//!
//! Every section and field is optional; missing values take their defaults.

use std::path::Path;

use serde::Deserialize;

use super::errors::{ContainerError, ContainerResult};

/// Top-level configuration.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RuntimeConfig {
    /// External store section.
    #[serde(default)]
    pub store: StoreConfig,

    /// Debug dump section.
    #[serde(default)]
    pub dump: DumpConfig,

    /// Logging section.
    #[serde(default)]
    pub log: LogConfig,
}

/// The `[store]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// Compiled key patterns kept in the LRU cache (0 is treated as 1).
    pub pattern_cache_capacity: usize,

    /// TTL applied by `store`, in seconds; 0 never expires.
    pub default_ttl_secs: u64,
}

impl Default for StoreConfig {
    fn default() -> Self {
        StoreConfig {
            pattern_cache_capacity: 64,
            default_ttl_secs: 0,
        }
    }
}

/// The `[dump]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    /// Nesting depth past which containers print as `...`.
    pub max_depth: usize,
}

impl Default for DumpConfig {
    fn default() -> Self {
        DumpConfig { max_depth: 32 }
    }
}

/// The `[log]` section.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Default filter level (`error`, `warn`, `info`, `debug`, `trace`).
    pub level: String,
}

impl Default for LogConfig {
    fn default() -> Self {
        LogConfig {
            level: "info".to_string(),
        }
    }
}

impl RuntimeConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> ContainerResult<Self> {
        toml::from_str(content).map_err(|e| ContainerError::Config(e.to_string()))
    }

    /// Read and parse a configuration file
    pub fn load(path: &Path) -> ContainerResult<Self> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ContainerError::Config(format!("{}: {}", path.display(), e)))?;
        Self::from_toml_str(&content)
    }
}
