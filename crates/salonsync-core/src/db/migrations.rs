//! Versioned schema for the key-value database

use crate::error::Result;
use libsql::Connection;

/// One schema step; `statements` run in a single transaction.
struct Migration {
    version: i32,
    description: &'static str,
    statements: &'static [&'static str],
}

const MIGRATIONS: &[Migration] = &[
    Migration {
        version: 1,
        description: "key-value entries",
        statements: &[
            "CREATE TABLE IF NOT EXISTS schema_version (
                version INTEGER PRIMARY KEY
            )",
            "CREATE TABLE IF NOT EXISTS kv_entries (
                key TEXT PRIMARY KEY,
                value BLOB NOT NULL
            )",
        ],
    },
    Migration {
        version: 2,
        description: "write timestamps",
        statements: &[
            "ALTER TABLE kv_entries ADD COLUMN written_at INTEGER NOT NULL DEFAULT 0",
            "CREATE INDEX IF NOT EXISTS idx_kv_entries_written_at ON kv_entries(written_at DESC)",
        ],
    },
];

/// Highest version in [`MIGRATIONS`]
pub const CURRENT_VERSION: i32 = 2;

/// Bring the schema up to [`CURRENT_VERSION`], skipping steps already applied.
pub async fn run(conn: &Connection) -> Result<()> {
    let applied = schema_version(conn).await?;

    for migration in MIGRATIONS.iter().filter(|m| m.version > applied) {
        apply(conn, migration).await?;
        tracing::info!(
            "Migrated key-value database to version {} ({})",
            migration.version,
            migration.description
        );
    }
    Ok(())
}

/// Applied version, or 0 for a fresh file.
pub async fn schema_version(conn: &Connection) -> Result<i32> {
    let mut rows = conn
        .query(
            "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = 'schema_version'",
            (),
        )
        .await?;
    let has_table = match rows.next().await? {
        Some(row) => row.get::<i64>(0)? > 0,
        None => false,
    };
    if !has_table {
        return Ok(0);
    }

    let mut rows = conn
        .query("SELECT COALESCE(MAX(version), 0) FROM schema_version", ())
        .await?;
    match rows.next().await? {
        Some(row) => Ok(row.get(0)?),
        None => Ok(0),
    }
}

async fn apply(conn: &Connection, migration: &Migration) -> Result<()> {
    // libsql has no execute_batch; statements go one by one
    conn.execute("BEGIN", ()).await?;

    let outcome = async {
        for statement in migration.statements {
            conn.execute(statement, ()).await?;
        }
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?)",
            [i64::from(migration.version)],
        )
        .await?;
        conn.execute("COMMIT", ()).await?;
        Ok::<_, libsql::Error>(())
    }
    .await;

    if let Err(error) = outcome {
        conn.execute("ROLLBACK", ()).await.ok();
        return Err(error.into());
    }
    Ok(())
}
