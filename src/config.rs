//! Configuration management with validation and defaults
//!
//! Values are layered: built-in defaults, then an optional TOML file, then
//! environment overrides. The binary applies CLI flags on top.

use crate::errors::{CasinoResult, ConfigurationError};
use crate::money::Money;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::Path;
use std::time::Duration;

/// Top-level server configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CasinoConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub session: SessionConfig,
    pub wager: WagerConfig,
    pub logging: LoggingConfig,
    /// Catalog file; the embedded catalog is used when unset
    pub games_path: Option<String>,
}

/// WebSocket / HTTP listener settings
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub allowed_origins: Vec<String>,
    pub request_timeout_secs: u64,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8080,
            allowed_origins: vec!["*".to_string()],
            request_timeout_secs: 30,
        }
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    Rocksdb,
    Memory,
}

impl std::str::FromStr for StorageBackend {
    type Err = ConfigurationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "rocksdb" => Ok(StorageBackend::Rocksdb),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(ConfigurationError::InvalidValue {
                field: "storage.backend".to_string(),
                value: other.to_string(),
                reason: "expected 'rocksdb' or 'memory'".to_string(),
            }),
        }
    }
}

/// RocksDB storage configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    pub backend: StorageBackend,
    pub data_directory: String,
    pub write_buffer_size_mb: usize,
    pub compression_type: CompressionType,
    /// Whether to clear database on startup (testing only!)
    pub clear_on_start: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub enum CompressionType {
    None,
    Snappy,
    Lz4,
    Zstd,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            backend: StorageBackend::Rocksdb,
            data_directory: "./DB/reelhouse".to_string(),
            write_buffer_size_mb: 64,
            compression_type: CompressionType::Lz4,
            clear_on_start: false,
        }
    }
}

/// Guest account issuance
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    pub starting_balance: Money,
    pub guest_username: String,
    /// Issue a fresh guest when a client presents a key we don't know
    pub create_on_unknown_key: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            starting_balance: Money::from_cents(1_000_000),
            guest_username: "Guest".to_string(),
            create_on_unknown_key: true,
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct WagerConfig {
    pub timeout_ms: u64,
}

impl WagerConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }
}

impl Default for WagerConfig {
    fn default() -> Self {
        Self { timeout_ms: 5000 }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// `tracing_subscriber::EnvFilter` directive; `RUST_LOG` wins when set
    pub filter: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "reelhouse=info,tower_http=info".to_string(),
        }
    }
}

/// Configuration loader with environment variable support
#[derive(Default)]
pub struct ConfigLoader {
    config_path: Option<String>,
}

impl ConfigLoader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the configuration file path
    pub fn with_path<P: AsRef<Path>>(mut self, path: P) -> Self {
        self.config_path = Some(path.as_ref().to_string_lossy().to_string());
        self
    }

    /// Load configuration from file and environment variables
    pub fn load(&self) -> CasinoResult<CasinoConfig> {
        let mut config = match self.config_path {
            Some(ref path) => Self::load_from_file(path)?,
            None => CasinoConfig::default(),
        };

        Self::apply_overrides(&mut config, |name| env::var(name).ok())?;
        Self::validate(&config)?;
        Ok(config)
    }

    fn load_from_file(path: &str) -> CasinoResult<CasinoConfig> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigurationError::LoadFailed(format!("Failed to read {}: {}", path, e)))?;
        Ok(toml::from_str(&content).map_err(ConfigurationError::from)?)
    }

    /// Apply `PORT` / `REELHOUSE_*` overrides, looked up through `lookup`
    pub fn apply_overrides<F>(config: &mut CasinoConfig, lookup: F) -> CasinoResult<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(port) = lookup("PORT") {
            config.server.port = port.parse().map_err(|_| ConfigurationError::InvalidValue {
                field: "PORT".to_string(),
                value: port,
                reason: "Invalid port number".to_string(),
            })?;
        }
        if let Some(host) = lookup("REELHOUSE_HOST") {
            config.server.host = host;
        }
        if let Some(path) = lookup("REELHOUSE_DB_PATH") {
            config.storage.data_directory = path;
        }
        if let Some(path) = lookup("REELHOUSE_GAMES") {
            config.games_path = Some(path);
        }
        if let Some(balance) = lookup("REELHOUSE_STARTING_BALANCE") {
            config.session.starting_balance = balance
                .parse::<f64>()
                .ok()
                .and_then(Money::round_from_f64)
                .ok_or_else(|| ConfigurationError::InvalidValue {
                    field: "REELHOUSE_STARTING_BALANCE".to_string(),
                    value: balance,
                    reason: "Invalid amount".to_string(),
                })?;
        }
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(config: &CasinoConfig) -> CasinoResult<()> {
        if config.server.port == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "server.port".to_string(),
                value: "0".to_string(),
                reason: "Port cannot be zero".to_string(),
            }
            .into());
        }

        if config.storage.backend == StorageBackend::Rocksdb && config.storage.data_directory.is_empty() {
            return Err(ConfigurationError::MissingRequired("storage.data_directory".to_string()).into());
        }

        if config.session.starting_balance.is_negative() {
            return Err(ConfigurationError::InvalidValue {
                field: "session.starting_balance".to_string(),
                value: config.session.starting_balance.to_string(),
                reason: "Starting balance cannot be negative".to_string(),
            }
            .into());
        }

        if config.wager.timeout_ms < 100 {
            return Err(ConfigurationError::InvalidValue {
                field: "wager.timeout_ms".to_string(),
                value: config.wager.timeout_ms.to_string(),
                reason: "Timeout must be at least 100ms".to_string(),
            }
            .into());
        }

        if config.server.request_timeout_secs == 0 {
            return Err(ConfigurationError::InvalidValue {
                field: "server.request_timeout_secs".to_string(),
                value: "0".to_string(),
                reason: "Request timeout cannot be zero".to_string(),
            }
            .into());
        }

        Ok(())
    }
}
