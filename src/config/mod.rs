//! Configuration loading and validation.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::calculate::{Catalog, CatalogError, TierTable};
use crate::models::{default_mini_games, MiniGame};
use crate::parse_duration;
use crate::storage::{
    JsonlPlayerStore, PlayerStore, RestPlayerStore, RestStoreConfig, StorageConfig, StorageError,
};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    #[error("Invalid tier configuration: {0}")]
    Catalog(#[from] CatalogError),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    #[serde(default = "default_cors_origin")]
    pub cors_origin: String,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_cors_origin() -> String {
    "*".to_string()
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            cors_origin: default_cors_origin(),
        }
    }
}

/// Where player rows live.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum StoreBackend {
    /// `players.jsonl` under the data directory
    #[default]
    Jsonl,
    /// Hosted PostgREST-style table
    Rest,
}

/// Player store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    #[serde(default)]
    pub backend: StoreBackend,

    /// Project URL for the `rest` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rest_url: Option<String>,

    /// API key for the `rest` backend
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Timeout in seconds
    #[serde(default = "default_timeout")]
    pub timeout_seconds: u64,
}

fn default_timeout() -> u64 {
    10
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            backend: StoreBackend::default(),
            rest_url: None,
            api_key: None,
            timeout_seconds: default_timeout(),
        }
    }
}

/// Live leaderboard polling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LiveConfig {
    /// How often the store is re-read (e.g. "5s", "1m")
    #[serde(default = "default_poll_interval")]
    pub poll_interval: String,
}

fn default_poll_interval() -> String {
    "5s".to_string()
}

impl Default for LiveConfig {
    fn default() -> Self {
        Self {
            poll_interval: default_poll_interval(),
        }
    }
}

impl LiveConfig {
    /// Parsed poll interval; `None` if the string is malformed.
    pub fn interval(&self) -> Option<Duration> {
        parse_duration(&self.poll_interval)
    }
}

/// Admin API access.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AdminConfig {
    /// Bearer token for `/api/admin`. Without one the admin API is closed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token: Option<String>,
}

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_log_level")]
    pub log_level: String,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub store: StoreConfig,

    #[serde(default)]
    pub live: LiveConfig,

    #[serde(default)]
    pub admin: AdminConfig,

    /// Points per active tier key ("ht1" .. "lt5")
    #[serde(default = "default_tier_points")]
    pub tier_points: BTreeMap<String, u32>,

    #[serde(default = "default_mini_games")]
    pub mini_games: Vec<MiniGame>,
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("./data")
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_tier_points() -> BTreeMap<String, u32> {
    TierTable::standard().to_keys()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            log_level: default_log_level(),
            server: ServerConfig::default(),
            store: StoreConfig::default(),
            live: LiveConfig::default(),
            admin: AdminConfig::default(),
            tier_points: default_tier_points(),
            mini_games: default_mini_games(),
        }
    }
}

impl AppConfig {
    /// Load configuration from a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        let config: AppConfig = toml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Load from `path` if it exists, otherwise use the defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if path.exists() {
            info!("Loading configuration from {:?}", path);
            Self::from_file(path)
        } else {
            info!("No config file at {:?}, using defaults", path);
            Ok(Self::default())
        }
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError(
                "Server port must be greater than 0".to_string(),
            ));
        }

        match self.live.interval() {
            Some(interval) if !interval.is_zero() => {}
            _ => {
                return Err(ConfigError::ValidationError(format!(
                    "Poll interval must be a positive duration, got {:?}",
                    self.live.poll_interval
                )))
            }
        }

        if self.store.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "Store timeout must be greater than 0".to_string(),
            ));
        }

        if self.store.backend == StoreBackend::Rest {
            let rest_url = self.store.rest_url.as_deref().ok_or_else(|| {
                ConfigError::ValidationError("store.rest_url is required for the rest backend".into())
            })?;
            Url::parse(rest_url).map_err(|e| {
                ConfigError::ValidationError(format!("store.rest_url {:?}: {}", rest_url, e))
            })?;
            if self.store.api_key.as_deref().map_or(true, str::is_empty) {
                return Err(ConfigError::ValidationError(
                    "store.api_key is required for the rest backend".to_string(),
                ));
            }
        }

        if self.mini_games.iter().any(|g| g.id.trim().is_empty()) {
            return Err(ConfigError::ValidationError(
                "Mini-game ids must not be empty".to_string(),
            ));
        }

        self.catalog()?;
        Ok(())
    }

    /// Build the immutable catalog every view shares.
    pub fn catalog(&self) -> Result<Catalog, ConfigError> {
        let table = TierTable::from_keys(&self.tier_points)?;
        Ok(Catalog::new(self.mini_games.clone(), table)?)
    }

    pub fn poll_interval(&self) -> Duration {
        self.live.interval().unwrap_or(Duration::from_secs(5))
    }

    /// Open the configured player store.
    pub fn open_store(&self) -> Result<Arc<dyn PlayerStore>, StorageError> {
        match self.store.backend {
            StoreBackend::Jsonl => Ok(Arc::new(JsonlPlayerStore::from_config(
                &StorageConfig::new(self.data_dir.clone()),
            ))),
            StoreBackend::Rest => {
                let raw = self.store.rest_url.as_deref().unwrap_or_default();
                let base_url =
                    Url::parse(raw).map_err(|e| StorageError::InvalidUrl(format!("{}: {}", raw, e)))?;
                let mut rest =
                    RestStoreConfig::new(base_url, self.store.api_key.clone().unwrap_or_default());
                rest.timeout = Duration::from_secs(self.store.timeout_seconds);
                Ok(Arc::new(RestPlayerStore::new(rest)?))
            }
        }
    }
}
