//! Configuration file handling.
//!
//! This module handles loading and merging configuration from
//! `.procdash.toml` files.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Name of the configuration file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = ".procdash.toml";

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Snapshot locations.
    #[serde(default)]
    pub storage: StorageConfig,

    /// HTTP server settings.
    #[serde(default)]
    pub server: ServerConfig,

    /// Dashboard settings.
    #[serde(default)]
    pub dashboard: DashboardConfig,
}

/// Where the snapshot lives.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Preferred location, usually a remote mount.
    #[serde(default = "default_primary_path")]
    pub primary_path: PathBuf,

    /// Local mirror, refreshed from the primary on every successful read.
    #[serde(default = "default_secondary_path")]
    pub secondary_path: PathBuf,

    /// How long a loaded snapshot may be reused. Zero reloads on every query.
    #[serde(default)]
    pub cache_ttl_seconds: u64,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            primary_path: default_primary_path(),
            secondary_path: default_secondary_path(),
            cache_ttl_seconds: 0,
        }
    }
}

impl StorageConfig {
    pub fn cache_ttl(&self) -> Duration {
        Duration::from_secs(self.cache_ttl_seconds)
    }
}

fn default_primary_path() -> PathBuf {
    PathBuf::from("/mnt/remote/processos.json")
}

fn default_secondary_path() -> PathBuf {
    PathBuf::from("data/processos.json")
}

/// HTTP server settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    /// Socket address to listen on.
    #[serde(default = "default_bind_address")]
    pub bind_address: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: default_bind_address(),
        }
    }
}

fn default_bind_address() -> String {
    "127.0.0.1:3000".to_string()
}

/// Dashboard settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DashboardConfig {
    /// Day threshold used when a query does not give one.
    #[serde(default = "default_threshold_days")]
    pub threshold_days: f64,
}

impl Default for DashboardConfig {
    fn default() -> Self {
        Self {
            threshold_days: default_threshold_days(),
        }
    }
}

fn default_threshold_days() -> f64 {
    30.0
}

impl Config {
    /// Load configuration from a file path.
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file: {}", path.display()))?;

        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config file: {}", path.display()))?;

        Ok(config)
    }

    /// Try to load configuration from the default location.
    ///
    /// Returns `Ok(None)` if the file doesn't exist, `Err` if it exists but can't be parsed.
    pub fn load_default() -> Result<Option<Self>> {
        let default_path = Path::new(DEFAULT_CONFIG_FILE);

        if default_path.exists() {
            Ok(Some(Self::load(default_path)?))
        } else {
            Ok(None)
        }
    }

    /// Merge this configuration with CLI arguments.
    ///
    /// Only values given explicitly on the command line override the file.
    pub fn merge_with_args(&mut self, args: &crate::cli::Args) {
        if let Some(ref primary) = args.primary {
            self.storage.primary_path = primary.clone();
        }
        if let Some(ref secondary) = args.secondary {
            self.storage.secondary_path = secondary.clone();
        }
        if let Some(ttl) = args.cache_ttl {
            self.storage.cache_ttl_seconds = ttl;
        }

        if let Some(crate::cli::Command::Serve { bind: Some(bind) }) = &args.command {
            self.server.bind_address = bind.clone();
        }
    }

    /// Generate a default configuration file content.
    pub fn default_toml() -> String {
        let config = Config::default();
        toml::to_string_pretty(&config).unwrap_or_else(|_| String::new())
    }
}
