//! Key/value persistence backends.
//!
//! The engine persists two independent blobs (metrics, dismissed set). A backend
//! only has to store strings by key; everything above it is JSON.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

use crate::storage::StorageError;

/// Best-effort string blob storage.
#[async_trait::async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Short backend name for logs.
    fn name(&self) -> &str;

    /// Read a blob. `Ok(None)` means the key was never written.
    async fn get(&self, key: &str) -> Result<Option<String>, StorageError>;

    /// Write (replace) a blob.
    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError>;
}

// =============================================================================
// Memory
// =============================================================================

/// Process-local store. Also the fallback when nothing else can be opened.
#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
    blobs: Arc<RwLock<HashMap<String, String>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait::async_trait]
impl KvStore for MemoryStore {
    fn name(&self) -> &str {
        "memory"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        let blobs = self
            .blobs
            .read()
            .map_err(|_| StorageError::Internal("memory store lock poisoned".to_string()))?;
        Ok(blobs.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let mut blobs = self
            .blobs
            .write()
            .map_err(|_| StorageError::Internal("memory store lock poisoned".to_string()))?;
        blobs.insert(key.to_string(), value.to_string());
        Ok(())
    }
}

// =============================================================================
// File
// =============================================================================

/// One JSON file per key inside a directory.
///
/// Writes go through a temporary file and a rename so a crash never leaves a
/// half-written blob behind.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Open (and create if needed) the storage directory.
    pub fn open(dir: impl AsRef<Path>) -> Result<Self, StorageError> {
        let dir = dir.as_ref().to_path_buf();
        std::fs::create_dir_all(&dir)?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let file: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{file}.json"))
    }
}

#[async_trait::async_trait]
impl KvStore for FileStore {
    fn name(&self) -> &str {
        "file"
    }

    async fn get(&self, key: &str) -> Result<Option<String>, StorageError> {
        match tokio::fs::read_to_string(self.path_for(key)).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn set(&self, key: &str, value: &str) -> Result<(), StorageError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

// =============================================================================
// Unavailable
// =============================================================================

/// A backend that refuses everything, like storage blocked by privacy settings.
#[derive(Debug, Clone, Default)]
pub struct UnavailableStore;

#[async_trait::async_trait]
impl KvStore for UnavailableStore {
    fn name(&self) -> &str {
        "unavailable"
    }

    async fn get(&self, _key: &str) -> Result<Option<String>, StorageError> {
        Err(StorageError::Unavailable("storage is blocked".to_string()))
    }

    async fn set(&self, _key: &str, _value: &str) -> Result<(), StorageError> {
        Err(StorageError::Unavailable("storage is blocked".to_string()))
    }
}
