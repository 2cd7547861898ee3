//! In-process snapshot store backed by moka.
//!
//! Used when `SNAPSHOT_DB_PATH=:memory:` and in tests. Contents are lost on
//! restart, which is acceptable because every entry can be regenerated.

use std::sync::Arc;

use async_trait::async_trait;
use jkflv_core::{Clock, Snapshot};
use moka::future::Cache;

use super::{SnapshotStore, StoreError};

/// Default cache capacity (number of entries).
/// Each rendered page is typically 5-20KB, so 20K entries ~= 100-400MB.
const DEFAULT_CAPACITY: u64 = 20_000;

/// Snapshot store held in process memory.
///
/// Expiry follows the injected clock rather than moka's own TTL, so
/// retention behaves identically to [`super::SqliteStore`].
pub struct MemoryStore {
    cache: Cache<String, Snapshot>,
    clock: Arc<dyn Clock>,
    retention_factor: u32,
}

impl MemoryStore {
    /// Create an empty store with the default capacity.
    pub fn new(clock: Arc<dyn Clock>, retention_factor: u32) -> Self {
        Self::with_capacity(clock, retention_factor, DEFAULT_CAPACITY)
    }

    /// Create an empty store holding at most `capacity` entries.
    pub fn with_capacity(clock: Arc<dyn Clock>, retention_factor: u32, capacity: u64) -> Self {
        Self {
            cache: Cache::builder().max_capacity(capacity).build(),
            clock,
            retention_factor,
        }
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn put(&self, key: &str, body: &str, ttl_seconds: u64) -> Result<(), StoreError> {
        let snapshot = Snapshot::new(key, body, self.clock.now(), ttl_seconds);
        self.cache.insert(key.to_string(), snapshot).await;
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Snapshot>, StoreError> {
        let Some(snapshot) = self.cache.get(key).await else {
            return Ok(None);
        };
        if !snapshot.is_retained_at(self.clock.now(), self.retention_factor) {
            self.cache.invalidate(key).await;
            return Ok(None);
        }
        Ok(Some(snapshot))
    }

    async fn delete(&self, key: &str) -> Result<bool, StoreError> {
        Ok(self.cache.remove(key).await.is_some())
    }

    async fn keys(&self) -> Result<Vec<String>, StoreError> {
        let mut keys: Vec<String> = self.cache.iter().map(|(k, _)| k.as_ref().clone()).collect();
        keys.sort();
        Ok(keys)
    }
}
