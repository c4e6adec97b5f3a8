//! Database schema for the key/value blob table.

use sqlx::SqlitePool;

use crate::storage::StorageError;

/// SQL statement for creating the blob table.
///
/// One row per persisted blob (metrics map, dismissed set).
pub const KV_TABLE_DDL: &str = r#"
CREATE TABLE IF NOT EXISTS kv (
    key        TEXT PRIMARY KEY NOT NULL,
    value      TEXT NOT NULL,
    updated_at INTEGER NOT NULL
);
"#;

/// Initialize the database schema.
///
/// Creates the blob table if it doesn't exist.
pub async fn init_schema(pool: &SqlitePool) -> Result<(), StorageError> {
    sqlx::query(KV_TABLE_DDL).execute(pool).await?;
    tracing::debug!("Database schema initialized");
    Ok(())
}
