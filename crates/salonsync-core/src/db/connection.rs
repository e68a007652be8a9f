//! libSQL connection for the key-value database

use std::path::Path;

use libsql::{Builder, Connection, Database as LibSqlDatabase};

use super::migrations;
use crate::error::Result;

/// Best-effort tuning; WAL cannot be enabled on `:memory:` databases.
const PRAGMAS: &[&str] = &[
    "PRAGMA journal_mode = WAL;",
    "PRAGMA synchronous = NORMAL;",
    "PRAGMA busy_timeout = 5000;",
];

/// An open, migrated libSQL database
pub struct Database {
    _db: LibSqlDatabase,
    conn: Connection,
}

impl Database {
    /// Open the file at `path`, creating it and its directory when missing.
    pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        if let Some(dir) = path.parent().filter(|dir| !dir.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir)?;
        }

        let db = Builder::new_local(path).build().await?;
        Self::prepare(db).await
    }

    pub async fn open_in_memory() -> Result<Self> {
        let db = Builder::new_local(":memory:").build().await?;
        Self::prepare(db).await
    }

    async fn prepare(db: LibSqlDatabase) -> Result<Self> {
        let conn = db.connect()?;
        for pragma in PRAGMAS {
            if let Err(error) = conn.execute(pragma, ()).await {
                tracing::debug!("Skipping `{pragma}`: {error}");
            }
        }
        migrations::run(&conn).await?;
        Ok(Self { _db: db, conn })
    }

    pub const fn connection(&self) -> &Connection {
        &self.conn
    }
}
