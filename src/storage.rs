//! Storage Layer
//!
//! Best-effort persistence for engagement state. Two independent blobs survive
//! across sessions: metrics-by-identifier and the dismissed-identifier set.
//!
//! # Components
//!
//! - [`KvStore`]: string blob backend trait ([`MemoryStore`], [`FileStore`], [`SqliteStore`])
//! - [`MetricsStore`]: per-ad counters with daily impression reset
//! - [`DismissedSet`]: ads the user has permanently hidden
//! - [`StorageBuilder`] / [`StorageHandles`]: backend selection and lifecycle
//!
//! Every read from an unavailable backend yields an empty default and every
//! failed write is dropped with a warning.

pub mod backend;
mod builder;
pub mod db;
mod dismissed;
mod error;
mod metrics;
mod schema;
mod types;

pub use backend::{FileStore, KvStore, MemoryStore, UnavailableStore};
pub use builder::{StorageBuilder, StorageDriver, StorageHandles};
pub use db::SqliteStore;
pub use dismissed::{DEFAULT_DISMISSED_KEY, DismissedSet};
pub use error::StorageError;
pub use metrics::{DEFAULT_METRICS_KEY, MetricsStore};
pub use types::AdMetric;
