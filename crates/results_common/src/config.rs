//! Configuration management for resultsd.
//!
//! Loads settings from a TOML file or uses defaults. Every field has a
//! default, so a partial file only overrides what it names.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Config file looked up in the working directory when no path is given
pub const DEFAULT_CONFIG_FILE: &str = "results.toml";

/// Google Drive file holding the published results database
pub const DEFAULT_DRIVE_FILE_ID: &str = "1sM013T1oIkKvBDoU6aw1f0HF9bfsKroQ";

/// Config loading errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Invalid listen address {0}")]
    Address(String),
}

/// HTTP listener settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    #[serde(default = "default_port")]
    pub port: u16,
}

fn default_bind_addr() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            port: default_port(),
        }
    }
}

/// Location of the results database
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    #[serde(default = "default_data_path")]
    pub path: PathBuf,
}

fn default_data_path() -> PathBuf {
    PathBuf::from("data.db")
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            path: default_data_path(),
        }
    }
}

/// Where and how the database is fetched on first run
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProvisionConfig {
    #[serde(default = "default_drive_file_id")]
    pub drive_file_id: String,

    /// Download URL with an `{id}` placeholder for the file ID
    #[serde(default = "default_url_template")]
    pub url_template: String,

    #[serde(default = "default_max_attempts")]
    pub max_attempts: u32,

    /// Backoff grows linearly: attempt N waits N times this value
    #[serde(default = "default_retry_backoff_ms")]
    pub retry_backoff_ms: u64,

    /// Whole-request timeout for the download
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_drive_file_id() -> String {
    DEFAULT_DRIVE_FILE_ID.to_string()
}

fn default_url_template() -> String {
    "https://drive.google.com/uc?export=download&id={id}".to_string()
}

fn default_max_attempts() -> u32 {
    3
}

fn default_retry_backoff_ms() -> u64 {
    2000
}

fn default_timeout_secs() -> u64 {
    300
}

impl Default for ProvisionConfig {
    fn default() -> Self {
        Self {
            drive_file_id: default_drive_file_id(),
            url_template: default_url_template(),
            max_attempts: default_max_attempts(),
            retry_backoff_ms: default_retry_backoff_ms(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl ProvisionConfig {
    /// Download URL for the configured file
    pub fn download_url(&self) -> String {
        self.url_template.replace("{id}", &self.drive_file_id)
    }

    /// Attempts actually made; zero still means one try
    pub fn attempts(&self) -> u32 {
        self.max_attempts.max(1)
    }
}

/// Full service configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub data: DataConfig,

    #[serde(default)]
    pub provision: ProvisionConfig,
}

impl Config {
    /// Load config from an explicit path, or from `results.toml` if present.
    ///
    /// An explicit path must exist. Without one, a missing default file
    /// falls back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) => Self::load_from_path(path),
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::load_from_path(default_path)
                } else {
                    warn!("No {} found, using defaults", DEFAULT_CONFIG_FILE);
                    Ok(Config::default())
                }
            }
        }
    }

    /// Load config from specific path
    pub fn load_from_path(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let config: Config = toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })?;
        info!("Loaded config from {}", path.display());
        Ok(config)
    }

    /// Socket address the HTTP server binds to
    pub fn listen_addr(&self) -> Result<SocketAddr, ConfigError> {
        let addr = format!("{}:{}", self.server.bind_addr, self.server.port);
        addr.parse().map_err(|_| ConfigError::Address(addr))
    }
}
