//! Configuration module for the ad engine.
//!
//! Provides YAML-based configuration loading and validation for:
//! - Feed source and fetch timeout
//! - Engine selection, batching, and daily-reset settings
//! - Storage backend and analytics sink
//! - Optional HTTP bridge (bind address, port)

mod app;
mod engine;
mod sink;
mod validation;

pub use app::{AppConfig, FeedConfig, ServerConfig, StorageConfig};
pub use engine::{BatchConfig, DismissConfig, EngineConfig, ResetConfig};
pub use sink::{SinkConfig, SinkKind};
pub use validation::{
    ConfigError, expand_env_vars, parse_duration, require_http_url, require_positive,
};

// Re-export constants
pub use app::{DEFAULT_SERVER_PORT, DEFAULT_SQLITE_PATH, DEFAULT_STORAGE_DIR};
