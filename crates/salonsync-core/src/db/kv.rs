//! libSQL-backed `DurableStorage`

#![allow(clippy::cast_possible_wrap)] // SQLite uses i64 for lengths

use std::path::Path;

use libsql::params;
use tokio::sync::Mutex;

use super::Database;
use crate::error::Result;
use crate::storage::DurableStorage;
use crate::util::unix_millis_now;

/// Key-value storage persisted in the `kv_entries` table
pub struct LibSqlStorage {
    db: Mutex<Database>,
}

impl LibSqlStorage {
    pub fn new(db: Database) -> Self {
        Self { db: Mutex::new(db) }
    }

    /// Open (or create) the on-disk database at `path`.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path).await?))
    }

    /// Open an in-memory database (useful for testing)
    pub async fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory().await?))
    }
}

impl DurableStorage for LibSqlStorage {
    async fn read(&self, key: &str) -> Result<Option<Vec<u8>>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query("SELECT value FROM kv_entries WHERE key = ?", [key])
            .await?;

        if let Some(row) = rows.next().await? {
            let value: Vec<u8> = row.get(0)?;
            Ok(Some(value))
        } else {
            Ok(None)
        }
    }

    async fn write(&self, key: &str, value: &[u8]) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute(
                "INSERT OR REPLACE INTO kv_entries (key, value, written_at) VALUES (?, ?, ?)",
                params![key, value.to_vec(), unix_millis_now()],
            )
            .await?;
        Ok(())
    }

    async fn delete(&self, key: &str) -> Result<()> {
        let db = self.db.lock().await;
        db.connection()
            .execute("DELETE FROM kv_entries WHERE key = ?", [key])
            .await?;
        Ok(())
    }

    async fn list_keys(&self, prefix: &str) -> Result<Vec<String>> {
        let db = self.db.lock().await;
        let mut rows = db
            .connection()
            .query(
                "SELECT key FROM kv_entries WHERE substr(key, 1, ?) = ? ORDER BY key ASC",
                params![prefix.chars().count() as i64, prefix],
            )
            .await?;

        let mut keys = Vec::new();
        while let Some(row) = rows.next().await? {
            keys.push(row.get::<String>(0)?);
        }
        Ok(keys)
    }
}
