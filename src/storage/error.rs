//! Storage-specific error types.
//!
//! Persistence is best-effort: callers in the engine log these and carry on
//! with in-memory state. They are only surfaced from the backends themselves.

use thiserror::Error;

/// Errors that can occur in a persistence backend.
#[derive(Debug, Error)]
pub enum StorageError {
    /// Database operation failed (sqlx error).
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Filesystem operation failed.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization error.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),

    /// The backend refuses reads and writes (e.g. blocked by policy).
    #[error("storage unavailable: {0}")]
    Unavailable(String),

    /// Internal error (e.g., task join failure).
    #[error("internal error: {0}")]
    Internal(String),
}
