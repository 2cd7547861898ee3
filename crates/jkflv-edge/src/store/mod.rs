//! Snapshot store: durable key-value storage for rendered pages and
//! refreshed section aggregates.
//!
//! The store is an availability optimization. A miss may be transient, so
//! callers never treat it as proof that content does not exist.
//!
//! ## Keys
//!
//! | Key | Written by | Body |
//! |-----|------------|------|
//! | `index`, `anime/{id}`, `generos/{slug}`, `pages/{slug}` | prerender | HTML |
//! | `home-data`, `genres-data`, `popular-data` | refresh | JSON payload |
//! | `sitemap-data` | refresh | JSON `[SitemapEntry]` |
//! | `last-update` | refresh | JSON `RefreshLedgerEntry` |

mod memory;
mod sqlite;

use std::sync::Arc;

use async_trait::async_trait;
use jkflv_core::{Clock, Snapshot};

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;

use crate::config::Config;

/// Snapshot store failure.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The backing store could not be reached or rejected the operation.
    #[error("snapshot store unavailable: {0}")]
    Unavailable(String),

    /// A stored record could not be decoded.
    #[error(transparent)]
    Record(#[from] jkflv_core::Error),
}

impl From<rusqlite::Error> for StoreError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Unavailable(err.to_string())
    }
}

/// Key-value snapshot storage with per-key TTL.
///
/// Writes are last-writer-wins. `get` returns stale snapshots as long as
/// they are within the store's retention window; freshness is the
/// caller's decision.
#[async_trait]
pub trait SnapshotStore: Send + Sync {
    /// Write (or overwrite) a snapshot stamped with the store's clock.
    async fn put(&self, key: &str, body: &str, ttl_seconds: u64) -> Result<(), StoreError>;

    /// Read a snapshot, fresh or stale.
    async fn get(&self, key: &str) -> Result<Option<Snapshot>, StoreError>;

    /// Remove a snapshot. Returns whether it existed.
    async fn delete(&self, key: &str) -> Result<bool, StoreError>;

    /// All stored keys, sorted.
    async fn keys(&self) -> Result<Vec<String>, StoreError>;
}

/// Open the store selected by configuration.
pub fn open_store(
    config: &Config,
    clock: Arc<dyn Clock>,
) -> Result<Arc<dyn SnapshotStore>, StoreError> {
    if config.uses_memory_store() {
        tracing::info!(
            retention_factor = config.retention_factor,
            "using in-memory snapshot store"
        );
        return Ok(Arc::new(MemoryStore::new(clock, config.retention_factor)));
    }

    let store = SqliteStore::open(&config.snapshot_db_path, clock, config.retention_factor)?;
    tracing::info!(
        path = %config.snapshot_db_path,
        retention_factor = config.retention_factor,
        "snapshot store opened"
    );
    Ok(Arc::new(store))
}

/// Count a store failure and log it.
pub(crate) fn record_store_error(op: &'static str, key: &str, err: &StoreError) {
    jkflv_core::metrics::record_labelled("snapshot_store_errors_total", "op", op);
    tracing::warn!(op, key = %key, error = %err, "snapshot store error");
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_display() {
        let err = StoreError::Unavailable("disk full".to_string());
        assert_eq!(err.to_string(), "snapshot store unavailable: disk full");
    }

    #[test]
    fn test_record_error_is_transparent() {
        let err: StoreError = jkflv_core::Error::InvalidSegment("x y".to_string()).into();
        assert_eq!(err.to_string(), "invalid route segment 'x y'");
    }

    #[test]
    fn test_open_store_selects_memory() {
        let config = Config {
            snapshot_db_path: ":memory:".to_string(),
            ..Config::default()
        };
        assert!(open_store(&config, Arc::new(jkflv_core::SystemClock)).is_ok());
    }

    #[test]
    fn test_open_store_sqlite_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("nested").join("snapshots.db");
        let config = Config {
            snapshot_db_path: path.to_string_lossy().into_owned(),
            ..Config::default()
        };
        assert!(open_store(&config, Arc::new(jkflv_core::SystemClock)).is_ok());
        assert!(path.exists());
    }
}
