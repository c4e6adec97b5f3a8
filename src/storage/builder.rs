//! Storage builder and handles.
//!
//! Picks a persistence backend from configuration. A backend that cannot be
//! opened is logged and replaced by [`MemoryStore`], so the engine always has
//! somewhere to keep the current session's state.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use strum_macros::{AsRefStr, Display, EnumString};

use crate::storage::StorageError;
use crate::storage::backend::{FileStore, KvStore, MemoryStore};
use crate::storage::db::SqliteStore;
use crate::storage::dismissed::{DEFAULT_DISMISSED_KEY, DismissedSet};
use crate::storage::metrics::{DEFAULT_METRICS_KEY, MetricsStore};

/// Persistence backend selection.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Default,
    Serialize,
    Deserialize,
    EnumString,
    Display,
    AsRefStr,
)]
#[serde(rename_all = "lowercase")]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum StorageDriver {
    /// Nothing survives the process.
    Memory,
    /// JSON files in a directory.
    #[default]
    File,
    /// A SQLite database file.
    Sqlite,
}

/// Builder for constructing the storage layer.
#[derive(Debug, Clone)]
pub struct StorageBuilder {
    driver: StorageDriver,
    path: PathBuf,
    metrics_key: String,
    dismissed_key: String,
}

impl StorageBuilder {
    /// Create a new storage builder.
    ///
    /// `path` is a directory for [`StorageDriver::File`] and a database file for
    /// [`StorageDriver::Sqlite`]; it is ignored for [`StorageDriver::Memory`].
    pub fn new(driver: StorageDriver, path: impl AsRef<Path>) -> Self {
        Self {
            driver,
            path: path.as_ref().to_path_buf(),
            metrics_key: DEFAULT_METRICS_KEY.to_string(),
            dismissed_key: DEFAULT_DISMISSED_KEY.to_string(),
        }
    }

    /// In-memory storage only.
    pub fn memory() -> Self {
        Self::new(StorageDriver::Memory, "")
    }

    /// Set the key of the metrics blob.
    pub fn metrics_key(mut self, key: impl Into<String>) -> Self {
        self.metrics_key = key.into();
        self
    }

    /// Set the key of the dismissed-set blob.
    pub fn dismissed_key(mut self, key: impl Into<String>) -> Self {
        self.dismissed_key = key.into();
        self
    }

    /// Open the configured backend, falling back to memory on failure.
    pub async fn build(self) -> StorageHandles {
        match self.try_open().await {
            Ok((store, sqlite)) => {
                tracing::info!(driver = %self.driver, path = %self.path.display(), "Storage initialized");
                StorageHandles {
                    store,
                    sqlite,
                    metrics_key: self.metrics_key,
                    dismissed_key: self.dismissed_key,
                }
            }
            Err(e) => {
                tracing::warn!(
                    driver = %self.driver,
                    path = %self.path.display(),
                    error = %e,
                    "Persistence unavailable, keeping state in memory"
                );
                StorageHandles {
                    store: Arc::new(MemoryStore::new()),
                    sqlite: None,
                    metrics_key: self.metrics_key,
                    dismissed_key: self.dismissed_key,
                }
            }
        }
    }

    async fn try_open(&self) -> Result<(Arc<dyn KvStore>, Option<SqliteStore>), StorageError> {
        match self.driver {
            StorageDriver::Memory => Ok((Arc::new(MemoryStore::new()), None)),
            StorageDriver::File => Ok((Arc::new(FileStore::open(&self.path)?), None)),
            StorageDriver::Sqlite => {
                if let Some(parent) = self.path.parent()
                    && !parent.as_os_str().is_empty()
                    && !parent.exists()
                {
                    std::fs::create_dir_all(parent).map_err(|e| {
                        StorageError::Internal(format!(
                            "Failed to create database directory '{}': {}",
                            parent.display(),
                            e
                        ))
                    })?;
                }
                let sqlite = SqliteStore::connect(&SqliteStore::url_for_path(&self.path)).await?;
                Ok((Arc::new(sqlite.clone()), Some(sqlite)))
            }
        }
    }
}

/// Handles to the opened storage layer.
#[derive(Clone)]
pub struct StorageHandles {
    /// The backend every blob goes through.
    pub store: Arc<dyn KvStore>,
    sqlite: Option<SqliteStore>,
    metrics_key: String,
    dismissed_key: String,
}

impl std::fmt::Debug for StorageHandles {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorageHandles")
            .field("backend", &self.store.name())
            .field("metrics_key", &self.metrics_key)
            .field("dismissed_key", &self.dismissed_key)
            .finish()
    }
}

impl StorageHandles {
    /// Wrap an existing backend.
    pub fn from_store(store: Arc<dyn KvStore>) -> Self {
        Self {
            store,
            sqlite: None,
            metrics_key: DEFAULT_METRICS_KEY.to_string(),
            dismissed_key: DEFAULT_DISMISSED_KEY.to_string(),
        }
    }

    pub fn backend_name(&self) -> &str {
        self.store.name()
    }

    /// Load the persisted metrics map.
    pub async fn load_metrics(&self) -> MetricsStore {
        MetricsStore::load(Arc::clone(&self.store), self.metrics_key.clone()).await
    }

    /// Load the persisted dismissed set.
    pub async fn load_dismissed(&self) -> DismissedSet {
        DismissedSet::load(Arc::clone(&self.store), self.dismissed_key.clone()).await
    }

    /// Release backend resources (closes the SQLite pool if one is open).
    pub async fn shutdown(&self) {
        if let Some(sqlite) = &self.sqlite {
            sqlite.close().await;
        }
    }
}
