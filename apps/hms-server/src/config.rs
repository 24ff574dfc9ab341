//! # Server Configuration
//!
//! ## Configuration Sources
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Configuration Priority                               │
//! │                                                                         │
//! │  1. Environment Variables (highest priority)                           │
//! │     HMS_PORTS=5000,5001   HMS_STORAGE_MODE=memory                      │
//! │     (.env is loaded first with dotenvy)                                │
//! │                                                                         │
//! │  2. TOML Config File                                                   │
//! │     ./hms.toml, or the path given with --config                        │
//! │                                                                         │
//! │  3. Default Values (lowest priority)                                   │
//! │     port 5000, auto storage, sqlite://hms.db                           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Configuration File Format
//! ```toml
//! [server]
//! host = "0.0.0.0"
//! ports = [5000, 5001, 5002]
//! request_timeout_secs = 5
//!
//! [storage]
//! mode = "auto"                          # auto | sqlite | memory
//! database_urls = ["sqlite://hms.db"]
//! connect_timeout_secs = 5
//! seed_on_empty = true
//!
//! [reports]
//! low_stock_threshold = 5
//! recent_window_days = 30
//! ```

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info};

use hms_core::ReportSettings;
use hms_db::{StoragePreference, StorageSettings};

/// Default config file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "hms.toml";

/// Longest accepted recent-sales window, about a century.
pub const MAX_RECENT_WINDOW_DAYS: i64 = 36_500;

/// Configuration error types.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid value for {0}")]
    InvalidValue(String),

    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to parse config file: {0}")]
    Parse(#[from] toml::de::Error),
}

// =============================================================================
// Server Settings
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,

    /// Ports tried in order until one binds.
    pub ports: Vec<u16>,

    /// Upper bound for handling one request.
    pub request_timeout_secs: u64,
}

impl Default for ServerSettings {
    fn default() -> Self {
        ServerSettings {
            host: "0.0.0.0".to_string(),
            ports: vec![5000],
            request_timeout_secs: 5,
        }
    }
}

impl ServerSettings {
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }
}

// =============================================================================
// Server Config
// =============================================================================

/// Complete server configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub server: ServerSettings,
    pub storage: StorageSettings,
    pub reports: ReportSettings,
}

impl ServerConfig {
    /// Loads defaults, then the TOML file (if present), then environment
    /// overrides, and validates the result.
    ///
    /// An explicitly given path must exist; the default `hms.toml` is
    /// optional.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();

        let (path, required) = match path {
            Some(p) => (p.to_path_buf(), true),
            None => (PathBuf::from(DEFAULT_CONFIG_FILE), false),
        };

        let mut config = if path.exists() || required {
            let contents = std::fs::read_to_string(&path).map_err(|source| ConfigError::Io {
                path: path.clone(),
                source,
            })?;
            info!(?path, "Loading config file");
            Self::from_toml(&contents)?
        } else {
            debug!(?path, "Config file not found, using defaults");
            Self::default()
        };

        config.apply_env_overrides(|key| std::env::var(key).ok())?;
        config.validate()?;
        Ok(config)
    }

    /// Parses a TOML document. Missing sections keep their defaults.
    pub fn from_toml(contents: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(contents)?)
    }

    /// Applies `HMS_*` overrides read through `lookup`.
    pub fn apply_env_overrides<F>(&mut self, lookup: F) -> Result<(), ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(host) = lookup("HMS_HOST") {
            self.server.host = host;
        }

        if let Some(ports) = lookup("HMS_PORTS") {
            self.server.ports = parse_list(&ports, "HMS_PORTS")?;
        } else if let Some(port) = lookup("HMS_PORT") {
            self.server.ports = vec![parse_value(&port, "HMS_PORT")?];
        }

        if let Some(secs) = lookup("HMS_REQUEST_TIMEOUT_SECS") {
            self.server.request_timeout_secs = parse_value(&secs, "HMS_REQUEST_TIMEOUT_SECS")?;
        }

        if let Some(mode) = lookup("HMS_STORAGE_MODE") {
            self.storage.mode = mode
                .parse::<StoragePreference>()
                .map_err(|_| ConfigError::InvalidValue("HMS_STORAGE_MODE".to_string()))?;
        }

        if let Some(urls) = lookup("HMS_DATABASE_URLS") {
            self.storage.database_urls = urls
                .split(',')
                .map(str::trim)
                .filter(|u| !u.is_empty())
                .map(str::to_string)
                .collect();
        } else if let Some(url) = lookup("DATABASE_URL") {
            self.storage.database_urls = vec![url];
        }

        if let Some(secs) = lookup("HMS_DB_CONNECT_TIMEOUT_SECS") {
            self.storage.connect_timeout_secs = parse_value(&secs, "HMS_DB_CONNECT_TIMEOUT_SECS")?;
        }

        if let Some(seed) = lookup("HMS_SEED") {
            self.storage.seed_on_empty = parse_value(&seed, "HMS_SEED")?;
        }

        if let Some(threshold) = lookup("HMS_LOW_STOCK_THRESHOLD") {
            self.reports.low_stock_threshold = parse_value(&threshold, "HMS_LOW_STOCK_THRESHOLD")?;
        }

        if let Some(days) = lookup("HMS_RECENT_WINDOW_DAYS") {
            self.reports.recent_window_days = parse_value(&days, "HMS_RECENT_WINDOW_DAYS")?;
        }

        Ok(())
    }

    /// Rejects settings the server cannot run with.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.ports.is_empty() {
            return Err(ConfigError::InvalidValue("server.ports (empty)".to_string()));
        }
        if self.server.request_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("server.request_timeout_secs".to_string()));
        }
        if self.storage.connect_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue("storage.connect_timeout_secs".to_string()));
        }
        if self.storage.mode == StoragePreference::Sqlite && self.storage.database_urls.is_empty() {
            return Err(ConfigError::InvalidValue(
                "storage.database_urls (required in sqlite mode)".to_string(),
            ));
        }
        if self.reports.low_stock_threshold < 1 {
            return Err(ConfigError::InvalidValue("reports.low_stock_threshold".to_string()));
        }
        if !(1..=MAX_RECENT_WINDOW_DAYS).contains(&self.reports.recent_window_days) {
            return Err(ConfigError::InvalidValue("reports.recent_window_days".to_string()));
        }
        Ok(())
    }
}

fn parse_value<T: std::str::FromStr>(raw: &str, key: &str) -> Result<T, ConfigError> {
    raw.trim()
        .parse()
        .map_err(|_| ConfigError::InvalidValue(key.to_string()))
}

fn parse_list<T: std::str::FromStr>(raw: &str, key: &str) -> Result<Vec<T>, ConfigError> {
    raw.split(',')
        .map(str::trim)
        .filter(|p| !p.is_empty())
        .map(|p| parse_value(p, key))
        .collect()
}
