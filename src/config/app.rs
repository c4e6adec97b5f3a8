//! Application configuration structures.

use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineSettings, TimerSettings};
use crate::inventory::record::DEFAULT_SPONSOR_NAME;
use crate::inventory::{DEFAULT_FEED_TIMEOUT, FeedDefaults, InventoryLoader};
use crate::storage::{DEFAULT_DISMISSED_KEY, DEFAULT_METRICS_KEY, StorageBuilder, StorageDriver};

use super::engine::{BatchConfig, EngineConfig, ResetConfig, engine_settings};
use super::sink::SinkConfig;
use super::validation::{ConfigError, require_http_url, require_positive};

// =============================================================================
// Constants
// =============================================================================

/// Default storage directory for the `file` driver.
pub const DEFAULT_STORAGE_DIR: &str = "data";

/// Default database file for the `sqlite` driver.
pub const DEFAULT_SQLITE_PATH: &str = "data/adengine.db";

/// Default HTTP bridge port.
pub const DEFAULT_SERVER_PORT: u16 = 8088;

// =============================================================================
// Feed Configuration
// =============================================================================

/// Remote feed configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// Feed document URL (required).
    pub url: String,

    /// Fetch timeout (default: "8s").
    #[serde(with = "humantime_serde")]
    pub timeout: Duration,

    /// Sponsor name for entries without one (default: "Sponsored").
    pub default_sponsor: String,
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: String::new(),
            timeout: DEFAULT_FEED_TIMEOUT,
            default_sponsor: DEFAULT_SPONSOR_NAME.to_string(),
        }
    }
}

impl FeedConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_http_url("feed url", &self.url)?;
        require_positive("feed timeout", self.timeout)
    }

    /// Build the feed loader.
    pub fn loader(&self) -> Result<InventoryLoader, ConfigError> {
        let loader = InventoryLoader::new(self.timeout)
            .map_err(|e| ConfigError::ValidationError(e.to_string()))?;
        Ok(loader.with_defaults(FeedDefaults {
            sponsor_name: self.default_sponsor.clone(),
        }))
    }
}

// =============================================================================
// Storage Configuration
// =============================================================================

/// Persistence configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// `memory`, `file`, or `sqlite` (default: file).
    pub driver: StorageDriver,

    /// Directory (file) or database file (sqlite). Defaults per driver.
    pub path: Option<PathBuf>,

    pub metrics_key: String,

    pub dismissed_key: String,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            driver: StorageDriver::default(),
            path: None,
            metrics_key: DEFAULT_METRICS_KEY.to_string(),
            dismissed_key: DEFAULT_DISMISSED_KEY.to_string(),
        }
    }
}

impl StorageConfig {
    /// Configured path, or the driver's default.
    pub fn resolved_path(&self) -> PathBuf {
        match (&self.path, self.driver) {
            (Some(path), _) => path.clone(),
            (None, StorageDriver::Sqlite) => PathBuf::from(DEFAULT_SQLITE_PATH),
            (None, _) => PathBuf::from(DEFAULT_STORAGE_DIR),
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.metrics_key.is_empty() || self.dismissed_key.is_empty() {
            return Err(ConfigError::ValidationError(
                "storage keys cannot be empty".to_string(),
            ));
        }
        if self.metrics_key == self.dismissed_key {
            return Err(ConfigError::ValidationError(
                "storage metrics_key and dismissed_key must differ".to_string(),
            ));
        }
        Ok(())
    }

    pub fn builder(&self) -> StorageBuilder {
        StorageBuilder::new(self.driver, self.resolved_path())
            .metrics_key(self.metrics_key.clone())
            .dismissed_key(self.dismissed_key.clone())
    }
}

// =============================================================================
// Server Configuration
// =============================================================================

/// HTTP bridge configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Serve the bridge (default: false).
    pub enabled: bool,

    /// Server bind address (default: "127.0.0.1").
    pub bind: String,

    /// Server port (default: 8088).
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            bind: "127.0.0.1".to_string(),
            port: DEFAULT_SERVER_PORT,
        }
    }
}

impl ServerConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!("invalid server bind address: '{}'", self.bind))
        })?;
        if self.enabled && self.port == 0 {
            return Err(ConfigError::ValidationError(
                "server port must be non-zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Bind address and port.
    pub fn socket_addr(&self) -> Result<SocketAddr, ConfigError> {
        let ip = self.bind.parse::<IpAddr>().map_err(|_| {
            ConfigError::ValidationError(format!("invalid server bind address: '{}'", self.bind))
        })?;
        Ok(SocketAddr::new(ip, self.port))
    }
}

// =============================================================================
// Application Configuration
// =============================================================================

/// Top-level application configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub feed: FeedConfig,
    pub engine: EngineConfig,
    pub batch: BatchConfig,
    pub reset: ResetConfig,
    pub storage: StorageConfig,
    pub sink: SinkConfig,
    pub server: ServerConfig,
}

impl AppConfig {
    /// Parse a YAML file without validating it.
    ///
    /// Use this when command-line overrides still have to be applied.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read or parsed.
    pub fn read(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Ok(serde_yaml::from_str(&content)?)
    }

    /// Load configuration from a YAML file.
    ///
    /// # Errors
    /// Returns `ConfigError` if the file cannot be read, parsed, or validated.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let config = Self::read(path)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values.
    ///
    /// # Errors
    /// Returns `ConfigError::ValidationError` if any field is invalid.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.feed.validate()?;
        self.engine.validate()?;
        self.batch.validate()?;
        self.reset.schedule()?;
        self.storage.validate()?;
        self.sink.validate()?;
        self.server.validate()?;
        Ok(())
    }

    pub fn engine_settings(&self) -> EngineSettings {
        engine_settings(&self.engine, &self.batch)
    }

    pub fn timer_settings(&self) -> Result<TimerSettings, ConfigError> {
        Ok(TimerSettings {
            flush_interval: self.batch.flush_interval,
            reset: self.reset.schedule()?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selector::SelectionMode;

    const FULL: &str = r#"
feed:
  url: https://ads.example.com/feed.xml
  timeout: 3s
engine:
  slots: 3
  frequency_cap: 2
  selection: round_robin
  seed: 7
  dismiss:
    persist: false
batch:
  flush_interval: 10s
reset:
  cron: "0 0 * * * *"
storage:
  driver: sqlite
sink:
  kind: none
server:
  enabled: true
  port: 9000
"#;

    fn minimal() -> AppConfig {
        AppConfig {
            feed: FeedConfig {
                url: "https://ads.example.com/feed.xml".to_string(),
                ..FeedConfig::default()
            },
            ..AppConfig::default()
        }
    }

    #[test]
    fn test_server_config_default() {
        let config = ServerConfig::default();
        assert!(!config.enabled);
        assert_eq!(config.bind, "127.0.0.1");
        assert_eq!(config.port, 8088);
    }

    #[test]
    fn test_parse_full_config() {
        let config: AppConfig = serde_yaml::from_str(FULL).unwrap();
        config.validate().unwrap();

        assert_eq!(config.feed.timeout, Duration::from_secs(3));
        assert_eq!(config.feed.default_sponsor, "Sponsored");
        assert_eq!(config.engine.selection, SelectionMode::RoundRobin);
        assert!(config.engine.dismiss.enabled);
        assert!(!config.engine.dismiss.persist);
        assert_eq!(config.storage.resolved_path(), PathBuf::from(DEFAULT_SQLITE_PATH));

        let settings = config.engine_settings();
        assert_eq!((settings.slots, settings.frequency_cap, settings.seed), (3, 2, Some(7)));
        let timers = config.timer_settings().unwrap();
        assert_eq!(timers.flush_interval, Duration::from_secs(10));
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.yaml");
        std::fs::write(&path, FULL).unwrap();
        assert_eq!(AppConfig::load(&path).unwrap().server.port, 9000);

        assert!(matches!(
            AppConfig::load(dir.path().join("missing.yaml")),
            Err(ConfigError::IoError(_))
        ));
        std::fs::write(&path, "feed: [not, a, map]").unwrap();
        assert!(matches!(AppConfig::load(&path), Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_feed_url_required() {
        let err = AppConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("feed url is required"));

        let mut config = minimal();
        config.feed.url = "not a url".to_string();
        assert!(config.validate().is_err());
        config.feed.url = "file:///etc/passwd".to_string();
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_config_validation_invalid_bind_address() {
        let mut config = minimal();
        config.server.bind = "not-an-ip".to_string();
        let result = config.validate();
        assert!(
            result
                .unwrap_err()
                .to_string()
                .contains("invalid server bind address")
        );
    }

    #[test]
    fn test_port_zero_only_rejected_when_enabled() {
        let mut config = minimal();
        config.server.port = 0;
        assert!(config.validate().is_ok());
        config.server.enabled = true;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_invalid_cron_rejected() {
        let mut config = minimal();
        config.reset.cron = Some("every day".to_string());
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_storage_defaults() {
        let config = StorageConfig::default();
        assert_eq!(config.driver, StorageDriver::File);
        assert_eq!(config.resolved_path(), PathBuf::from(DEFAULT_STORAGE_DIR));

        let clash = StorageConfig {
            dismissed_key: DEFAULT_METRICS_KEY.to_string(),
            ..StorageConfig::default()
        };
        assert!(clash.validate().is_err());
    }

    #[test]
    fn test_sample_config_is_valid() {
        let path = Path::new(env!("CARGO_MANIFEST_DIR")).join("configs/config.yaml");
        let config = AppConfig::load(&path).unwrap();
        assert_eq!(config.engine.slots, 3);
        assert_eq!(config.storage.metrics_key, DEFAULT_METRICS_KEY);
        assert!(!config.server.enabled);
    }
}
