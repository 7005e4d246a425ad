//! Configuration management for scoringd.
//!
//! Loads settings from a TOML file; every key has a default.

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::auth::AuthSettings;

/// Default config file path
pub const CONFIG_PATH: &str = "/etc/scoringd/config.toml";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Largest accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Maximum number of cache records kept in memory
    #[serde(default = "default_cache_capacity")]
    pub cache_capacity: usize,

    /// JSON object loaded into the primary keyspace at startup
    #[serde(default)]
    pub seed_path: Option<PathBuf>,
}

fn default_cache_capacity() -> usize {
    10_000
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            cache_capacity: default_cache_capacity(),
            seed_path: None,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub auth: AuthSettings,

    #[serde(default)]
    pub store: StoreConfig,
}

impl Config {
    /// Load config from a specific path
    pub fn load(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?;
        let config: Config = toml::from_str(&content)
            .with_context(|| format!("Failed to parse config {}", path.display()))?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Load config, falling back to defaults when it is missing or invalid
    pub fn load_or_default(path: &Path) -> Self {
        Self::load(path).unwrap_or_else(|e| {
            warn!("Config not loaded, using defaults: {:#}", e);
            Config::default()
        })
    }
}
