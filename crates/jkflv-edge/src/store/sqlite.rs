//! SQLite-backed snapshot store.

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::DateTime;
use jkflv_core::{Clock, Snapshot};
use parking_lot::Mutex;
use rusqlite::{Connection, OptionalExtension, params};

use super::{SnapshotStore, StoreError};

/// Current schema version. Increment when making breaking changes.
const SCHEMA_VERSION: i32 = 1;

/// Durable snapshot store in a single SQLite file.
///
/// Reads and writes are short single-row statements, so the connection is
/// used directly under the lock from async code.
pub struct SqliteStore {
    conn: Mutex<Connection>,
    clock: Arc<dyn Clock>,
    retention_factor: u32,
}

impl SqliteStore {
    /// Open or create the store at `path`, creating parent directories.
    pub fn open(
        path: impl AsRef<Path>,
        clock: Arc<dyn Clock>,
        retention_factor: u32,
    ) -> Result<Self, StoreError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
        {
            std::fs::create_dir_all(parent).map_err(|e| {
                StoreError::Unavailable(format!("failed to create {}: {e}", parent.display()))
            })?;
        }

        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA journal_mode=WAL; PRAGMA synchronous=NORMAL;")?;
        init_schema(&conn)?;

        Ok(Self {
            conn: Mutex::new(conn),
            clock,
            retention_factor,
        })
    }

    /// Open an in-memory database (for testing).
    pub fn open_in_memory(clock: Arc<dyn Clock>, retention_factor: u32) -> Result<Self, StoreError> {
        let conn = Connection::open_in_memory()?;
        init_schema(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
            clock,
            retention_factor,
        })
    }
}

#[async_trait]
impl SnapshotStore for SqliteStore {
    async fn put(&self, key: &str, body: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let now = self.clock.now().timestamp_millis();
        let ttl = i64::try_from(ttl_seconds).unwrap_or(i64::MAX);
        self.conn.lock().execute(
            "INSERT INTO snapshots (key, body, created_at_ms, ttl_seconds)
             VALUES (?1, ?2, ?3, ?4)
             ON CONFLICT(key) DO UPDATE SET
                body = excluded.body,
                created_at_ms = excluded.created_at_ms,
                ttl_seconds = excluded.ttl_seconds",
            params![key, body, now, ttl],
        )?;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Snapshot>, StoreError> {
        let conn = self.conn.lock();
        let row: Option<(String, i64, i64)> = conn
            .query_row(
                "SELECT body, created_at_ms, ttl_seconds FROM snapshots WHERE key = ?1",
                params![key],
                |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)),
            )
            .optional()?;

        let Some((body, created_at_ms, ttl)) = row else {
            return Ok(None);
        };

        let created_at = DateTime::from_timestamp_millis(created_at_ms).ok_or_else(|| {
            jkflv_core::Error::CorruptRecord {
                key: key.to_string(),
                reason: format!("invalid timestamp {created_at_ms}"),
            }
        })?;
        let snapshot = Snapshot::new(key, body, created_at, u64::try_from(ttl).unwrap_or(0));

        if !snapshot.is_retained_at(self.clock.now(), self.retention_factor) {
            conn.execute("DELETE FROM snapshots WHERE key = ?1", params![key])?;
            tracing::debug!(key = %key, "pruned expired snapshot");
            return Ok(None);
        }

        Ok(Some(snapshot))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .lock()
            .execute("DELETE FROM snapshots WHERE key = ?1", params![key])?;
        Ok(removed > 0)
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let conn = self.conn.lock();
        let mut stmt = conn.prepare("SELECT key FROM snapshots ORDER BY key")?;
        let keys = stmt
            .query_map([], |row| row.get(0))?
            .collect::<Result<Vec<String>, _>>()?;
        Ok(keys)
    }
}

/// Create tables if they don't exist.
fn init_schema(conn: &Connection) -> rusqlite::Result<()> {
    conn.execute(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER NOT NULL
        )",
        [],
    )?;

    let version: Option<i32> = conn
        .query_row("SELECT version FROM schema_version LIMIT 1", [], |row| {
            row.get(0)
        })
        .optional()?;

    if version.is_none() {
        conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS snapshots (
                key TEXT PRIMARY KEY,
                body TEXT NOT NULL,
                created_at_ms INTEGER NOT NULL,
                ttl_seconds INTEGER NOT NULL
            );
            "#,
        )?;
        conn.execute(
            "INSERT INTO schema_version (version) VALUES (?1)",
            [SCHEMA_VERSION],
        )?;
    }

    Ok(())
}
