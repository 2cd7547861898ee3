//! JKAnime FLV Edge - crawler prerendering and content freshness for the SPA.
//!
//! This crate sits in front of the single-page application and the upstream
//! content API. It is designed to be placed behind a CDN so the edge cache
//! absorbs most crawler traffic.
//!
//! # Architecture
//!
//! - **Origin**: HTTP client for the content API with timeout and fixed-delay retry
//! - **Store**: Durable snapshot cache (SQLite, or moka for ephemeral deployments)
//! - **Render**: Snapshot generation with Open Graph tags and JSON-LD using maud
//! - **Prerender**: Middleware serving snapshots to crawlers, SPA to everyone else
//! - **Refresh**: Periodic section refresh with a single-slot ledger
//! - **Routes**: API proxy, refresh trigger, sitemap, robots, admin purge
//!
//! # Request Flow
//!
//! ```text
//! GET /anime/42 (Googlebot) ─► prerender ─► store ─► generator ─► origin
//! GET /anime/42 (browser)   ─► prerender ─► SPA (static_dir/index.html)
//! ANY /api/v1/...           ─► proxy ─────► origin
//! ```
//!
//! # Security
//!
//! - All dynamic content is HTML-escaped by maud
//! - JSON-LD blocks escape `<` so upstream text cannot close the script tag
//! - Image URLs are validated (HTTPS/HTTP only) before use in attributes
//! - Snapshot purge requires a bearer token

mod auth;
pub mod config;
pub mod crawler;
pub mod error;
pub mod origin;
pub mod payload;
pub mod prerender;
pub mod refresh;
pub mod render;
pub mod routes;
pub mod state;
pub mod store;

pub use config::Config;
pub use error::EdgeError;
pub use routes::router;
pub use state::AppState;
pub use store::{SnapshotStore, StoreError};

#[cfg(test)]
pub(crate) mod testing;
