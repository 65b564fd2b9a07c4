//! Configuration for credicheck

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::db::DbOptions;
use crate::services::DemoConfig;

/// Default storage directory
pub fn default_storage_dir() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join("credicheck")
}

/// Configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Directory holding the SQLite database and config.toml
    #[serde(default = "default_storage_dir")]
    pub storage_dir: PathBuf,

    /// HTTP API port
    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Address the HTTP server binds to
    #[serde(default = "default_bind_address")]
    pub bind_address: String,

    /// Populate newly registered sites with random votes and a score
    #[serde(default)]
    pub demo_mode: bool,

    /// Serve `PUT /score`
    #[serde(default)]
    pub admin_api: bool,

    /// Maximum pooled SQLite connections
    #[serde(default = "default_pool_size")]
    pub pool_size: u32,

    /// How long a vote waits for the SQLite write lock
    #[serde(default = "default_busy_timeout_ms")]
    pub busy_timeout_ms: u64,

    /// Fewest votes generated per site in demo mode
    #[serde(default = "default_demo_votes_min")]
    pub demo_votes_min: u32,

    /// Most votes generated per site in demo mode
    #[serde(default = "default_demo_votes_max")]
    pub demo_votes_max: u32,

    /// Upper bound of generated demo scores
    #[serde(default = "default_demo_score_max")]
    pub demo_score_max: f64,
}

fn default_http_port() -> u16 {
    4269
}

fn default_bind_address() -> String {
    "0.0.0.0".to_string()
}

fn default_pool_size() -> u32 {
    8
}

fn default_busy_timeout_ms() -> u64 {
    5_000
}

fn default_demo_votes_min() -> u32 {
    5
}

fn default_demo_votes_max() -> u32 {
    20
}

fn default_demo_score_max() -> f64 {
    10.0
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_dir: default_storage_dir(),
            http_port: default_http_port(),
            bind_address: default_bind_address(),
            demo_mode: false,
            admin_api: false,
            pool_size: default_pool_size(),
            busy_timeout_ms: default_busy_timeout_ms(),
            demo_votes_min: default_demo_votes_min(),
            demo_votes_max: default_demo_votes_max(),
            demo_score_max: default_demo_score_max(),
        }
    }
}

impl Config {
    /// Load config from file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, std::io::Error> {
        let content = std::fs::read_to_string(path)?;
        toml::from_str(&content)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }

    /// Save config to file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), std::io::Error> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))?;
        std::fs::write(path, content)
    }

    /// Get config file path
    pub fn config_path(&self) -> PathBuf {
        self.storage_dir.join("config.toml")
    }

    pub fn db_options(&self) -> DbOptions {
        DbOptions {
            pool_size: self.pool_size,
            busy_timeout_ms: self.busy_timeout_ms,
        }
    }

    pub fn demo_config(&self) -> DemoConfig {
        DemoConfig {
            votes_min: self.demo_votes_min,
            votes_max: self.demo_votes_max,
            score_max: self.demo_score_max,
        }
    }
}
