//! Prometheus metrics helpers for the edge service.
//!
//! # Usage
//!
//! ```rust,ignore
//! use jkflv_core::metrics::{init_metrics, start_metrics_server};
//!
//! #[tokio::main]
//! async fn main() {
//!     let handle = init_metrics();
//!     start_metrics_server(9091, handle).await.unwrap();
//!
//!     jkflv_core::metrics::record_outcome("prerender_requests_total", "hit");
//! }
//! ```
//!
//! # Metric Naming Conventions
//!
//! - Prefix: component (`prerender_`, `origin_`, `refresh_`, `snapshot_store_`, `proxy_`)
//! - Suffix: unit or type (`_total`, `_seconds`)
//! - Labels: a single low-cardinality `outcome`/`section`/`op`/`status` label

use axum::{Router, routing::get};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::net::SocketAddr;

/// Initialize the Prometheus metrics recorder.
///
/// Must be called once at startup before any metrics are recorded.
///
/// # Panics
///
/// Panics if a recorder is already installed.
pub fn init_metrics() -> PrometheusHandle {
    let handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("Failed to install Prometheus recorder");

    register_edge_metrics();

    handle
}

/// Like [`init_metrics`] but returns `None` if a recorder is already installed.
pub fn try_init_metrics() -> Option<PrometheusHandle> {
    let handle = PrometheusBuilder::new().install_recorder().ok()?;
    register_edge_metrics();
    Some(handle)
}

/// Serve `/metrics` on the given port from a background task.
pub async fn start_metrics_server(
    port: u16,
    handle: PrometheusHandle,
) -> Result<(), std::io::Error> {
    let app = Router::new().route(
        "/metrics",
        get(move || {
            let handle = handle.clone();
            async move { handle.render() }
        }),
    );

    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    tracing::info!(%addr, "metrics server listening");

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, app).await {
            tracing::error!(error = %e, "metrics server stopped");
        }
    });

    Ok(())
}

/// Register descriptions for every metric the edge emits.
fn register_edge_metrics() {
    // =========================================================================
    // Prerendering
    // =========================================================================

    describe_counter!(
        "prerender_requests_total",
        "Crawler page requests by outcome (hit, miss, stale, not_found, uncached)"
    );
    describe_histogram!(
        "prerender_generate_duration_seconds",
        "Time spent generating a snapshot"
    );

    // =========================================================================
    // Origin
    // =========================================================================

    describe_counter!(
        "origin_requests_total",
        "Upstream content API calls by outcome (ok, app_error, status, network, timeout)"
    );

    // =========================================================================
    // Refresh
    // =========================================================================

    describe_counter!(
        "refresh_runs_total",
        "Refresh runs by outcome (skipped, success, partial, ledger_error)"
    );
    describe_gauge!(
        "refresh_last_run_timestamp_seconds",
        "Unix time of the last recorded refresh run"
    );
    describe_counter!(
        "refresh_section_failures_total",
        "Refresh section failures (label: section)"
    );

    // =========================================================================
    // Store and proxy
    // =========================================================================

    describe_counter!(
        "snapshot_store_errors_total",
        "Snapshot store failures (label: op)"
    );
    describe_counter!(
        "proxy_requests_total",
        "Proxied API requests by response status class"
    );
}

/// Increment an outcome-labelled counter.
#[inline]
pub fn record_outcome(name: &'static str, outcome: &'static str) {
    metrics::counter!(name, "outcome" => outcome).increment(1);
}

/// Increment a counter with an arbitrary single label.
#[inline]
pub fn record_labelled(name: &'static str, label: &'static str, value: &'static str) {
    metrics::counter!(name, label => value).increment(1);
}

/// Record a duration in seconds.
#[inline]
pub fn record_duration(name: &'static str, seconds: f64) {
    metrics::histogram!(name).record(seconds);
}
