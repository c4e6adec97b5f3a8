//! Database-backed blob storage.
//!
//! Currently supports SQLite through sqlx.
//!
//! # Example
//!
//! ```ignore
//! let store = SqliteStore::connect("sqlite:data/adengine.db?mode=rwc").await?;
//! store.set("adengine.metrics.v1", "{}").await?;
//! ```

mod sqlite;

pub use sqlite::SqliteStore;
