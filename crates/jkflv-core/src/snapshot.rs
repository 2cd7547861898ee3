//! Cached snapshots and their freshness.

use std::sync::atomic::{AtomicI64, Ordering};

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

/// Source of the current time.
///
/// Freshness is always judged against an injected clock so staleness rules
/// can be exercised without sleeping.
pub trait Clock: Send + Sync {
    /// Current wall-clock time.
    fn now(&self) -> DateTime<Utc>;
}

/// The real clock.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }
}

/// A clock that only moves when told to.
#[derive(Debug)]
pub struct ManualClock {
    millis: AtomicI64,
}

impl ManualClock {
    /// Start the clock at the given instant.
    pub fn new(start: DateTime<Utc>) -> Self {
        Self {
            millis: AtomicI64::new(start.timestamp_millis()),
        }
    }

    /// Move the clock forward.
    pub fn advance(&self, by: Duration) {
        self.millis.fetch_add(by.num_milliseconds(), Ordering::SeqCst);
    }

    /// Jump to an absolute instant.
    pub fn set(&self, to: DateTime<Utc>) {
        self.millis.store(to.timestamp_millis(), Ordering::SeqCst);
    }
}

impl Clock for ManualClock {
    fn now(&self) -> DateTime<Utc> {
        DateTime::from_timestamp_millis(self.millis.load(Ordering::SeqCst)).unwrap_or_default()
    }
}

/// A stored rendering or aggregate, keyed by route or section.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Snapshot {
    /// Store key (`index`, `anime/42`, `home-data`, ...).
    pub key: String,
    /// HTML document for route snapshots, JSON text for section aggregates.
    pub body: String,
    /// When the snapshot was written.
    pub created_at: DateTime<Utc>,
    /// Freshness lifetime.
    pub ttl_seconds: u64,
}

impl Snapshot {
    /// Create a snapshot stamped with the given creation time.
    pub fn new(
        key: impl Into<String>,
        body: impl Into<String>,
        created_at: DateTime<Utc>,
        ttl_seconds: u64,
    ) -> Self {
        Self {
            key: key.into(),
            body: body.into(),
            created_at,
            ttl_seconds,
        }
    }

    /// Age of the snapshot at `now`. Clock skew never yields a negative age.
    pub fn age_at(&self, now: DateTime<Utc>) -> Duration {
        (now - self.created_at).max(Duration::zero())
    }

    /// Fresh iff `now - created_at < ttl`.
    pub fn is_fresh_at(&self, now: DateTime<Utc>) -> bool {
        self.age_at(now) < ttl_duration(self.ttl_seconds)
    }

    /// Whether a store should still hand this snapshot out at `now`.
    ///
    /// Stale snapshots stay servable for `ttl × retention_factor`; past that
    /// they are treated as absent.
    pub fn is_retained_at(&self, now: DateTime<Utc>, retention_factor: u32) -> bool {
        let factor = u64::from(retention_factor.max(1));
        self.age_at(now) < ttl_duration(self.ttl_seconds.saturating_mul(factor))
    }
}

fn ttl_duration(seconds: u64) -> Duration {
    let seconds = i64::try_from(seconds).unwrap_or(i64::MAX).min(i64::MAX / 1000);
    Duration::seconds(seconds)
}
