//! Core types shared by the JKAnime FLV edge service and its tools.
//!
//! This crate provides:
//! - The envelope normalizer that folds the upstream API's legacy response
//!   shapes into one [`ContentEnvelope`]
//! - Route classification ([`RouteDescriptor`]) and snapshot keys
//! - Snapshot freshness and the injectable [`Clock`]
//! - The single-slot refresh ledger ([`RefreshLedgerEntry`])
//! - Prometheus metrics helpers
//! - Shared error types

pub mod envelope;
mod error;
pub mod ledger;
pub mod metrics;
pub mod route;
pub mod sitemap;
pub mod snapshot;

// ═══════════════════════════════════════════════════════════════════════════
// Store keys
// ═══════════════════════════════════════════════════════════════════════════

/// Store key of the single refresh ledger slot.
pub const LAST_UPDATE_KEY: &str = "last-update";

/// Store key of the cached home section aggregate.
pub const HOME_DATA_KEY: &str = "home-data";

/// Store key of the cached genre list aggregate.
pub const GENRES_DATA_KEY: &str = "genres-data";

/// Store key of the cached popular list aggregate.
pub const POPULAR_DATA_KEY: &str = "popular-data";

/// Store key of the derived sitemap entry list.
pub const SITEMAP_DATA_KEY: &str = "sitemap-data";

// ═══════════════════════════════════════════════════════════════════════════
// TTLs (seconds)
// ═══════════════════════════════════════════════════════════════════════════

/// Home section aggregate: changes whenever a new episode airs.
pub const HOME_DATA_TTL: u64 = 6 * 3600;

/// Genre list: practically static.
pub const GENRES_DATA_TTL: u64 = 24 * 3600;

/// Popular list.
pub const POPULAR_DATA_TTL: u64 = 12 * 3600;

/// Derived sitemap.
pub const SITEMAP_DATA_TTL: u64 = 24 * 3600;

/// Ledger slot. Long enough that the staleness check always finds it.
pub const LAST_UPDATE_TTL: u64 = 30 * 24 * 3600;

pub use envelope::{ContentEnvelope, normalize, normalize_bytes};
pub use error::{Error, Result};
pub use ledger::{RefreshLedgerEntry, Section};
pub use route::{RouteDescriptor, RouteKind, STATIC_PAGES};
pub use sitemap::{ChangeFreq, SitemapEntry};
pub use snapshot::{Clock, ManualClock, Snapshot, SystemClock};
