//! SQLite implementations of storage interfaces.
//!
//! Writes that must see a consistent snapshot (claims, collection creation,
//! detail updates) run inside `BEGIN IMMEDIATE` transactions.

use std::path::Path;
use std::time::Duration;

use chrono::{DateTime, SecondsFormat, Utc};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions};
use sqlx::{SqliteConnection, SqlitePool};

use crate::storage::{Result, StorageError};

mod audit_store;
mod manifest_store;
mod store;

pub use audit_store::SqliteAuditStore;
pub use manifest_store::SqliteManifestStore;
pub use store::SqliteStore;

const MEMORY_PATH: &str = ":memory:";

/// Open a pool for `path`, creating the database file if needed.
///
/// `:memory:` (optionally with a `sqlite:` prefix) opens a private
/// in-memory database on a single pinned connection, so every store sharing
/// the pool sees the same data.
pub async fn connect(path: &str) -> Result<SqlitePool> {
    let path = path
        .trim_start_matches("sqlite://")
        .trim_start_matches("sqlite:");

    if path.is_empty() || path == MEMORY_PATH {
        let options = SqliteConnectOptions::new()
            .filename(MEMORY_PATH)
            .create_if_missing(true);
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .idle_timeout(None)
            .max_lifetime(None)
            .connect_with(options)
            .await?;
        return Ok(pool);
    }

    if let Some(parent) = Path::new(path).parent().filter(|p| !p.as_os_str().is_empty()) {
        tokio::fs::create_dir_all(parent).await.map_err(|e| {
            StorageError::Unavailable(format!("cannot create {}: {e}", parent.display()))
        })?;
    }

    let options = SqliteConnectOptions::new()
        .filename(path)
        .journal_mode(SqliteJournalMode::Wal)
        .busy_timeout(Duration::from_secs(30))
        .create_if_missing(true);

    let pool = SqlitePoolOptions::new()
        .max_connections(5)
        .connect_with(options)
        .await?;
    Ok(pool)
}

/// Fixed-width RFC 3339 so text order equals time order.
pub(crate) fn format_timestamp(ts: &DateTime<Utc>) -> String {
    ts.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

pub(crate) fn parse_timestamp(raw: &str) -> Result<DateTime<Utc>> {
    Ok(DateTime::parse_from_rfc3339(raw)?.with_timezone(&Utc))
}

/// Start a write transaction holding the database write lock.
///
/// BEGIN IMMEDIATE acquires the write lock upfront, preventing deadlocks
/// when concurrent DEFERRED transactions race to upgrade from shared to
/// exclusive.
pub(crate) async fn begin_immediate(conn: &mut SqliteConnection) -> Result<()> {
    sqlx::query("BEGIN IMMEDIATE").execute(&mut *conn).await?;
    Ok(())
}

/// Commit on success, roll back on error.
pub(crate) async fn finish<T>(conn: &mut SqliteConnection, result: Result<T>) -> Result<T> {
    match result {
        Ok(value) => {
            sqlx::query("COMMIT").execute(&mut *conn).await?;
            Ok(value)
        }
        Err(e) => {
            let _ = sqlx::query("ROLLBACK").execute(&mut *conn).await;
            Err(e)
        }
    }
}
