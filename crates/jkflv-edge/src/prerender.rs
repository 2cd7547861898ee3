//! Prerender dispatcher.
//!
//! Middleware in front of the SPA fallback. Crawler page requests get a
//! complete HTML snapshot; everything else passes through untouched.
//!
//! ```text
//! crawler GET ─► lookup ─► fresh? ──yes──► serve (hit)
//!                   │        └─no──► regenerate ─► ok? ──yes──► store + serve (miss)
//!                   │                                └─no──► stale copy? ─► serve (stale)
//!                   │                                              └─────► 404 noindex shell
//!                   └─ store error ─► generate without caching
//! ```

use axum::extract::{Request, State};
use axum::http::header::{self, HeaderName};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use jkflv_core::metrics::record_outcome;
use jkflv_core::{Clock, RouteDescriptor, Snapshot};

use crate::crawler::is_crawler;
use crate::render::components::CSP_HEADER;
use crate::render::shell;
use crate::state::AppState;
use crate::store::record_store_error;

/// Cache-Control for freshly generated or fresh cached snapshots.
pub const CACHE_CONTROL_FRESH: &str = "public, max-age=3600, s-maxage=86400";

/// Cache-Control for a stale snapshot served because regeneration failed.
pub const CACHE_CONTROL_STALE: &str = "public, max-age=300, s-maxage=600";

const X_PRERENDER: HeaderName = HeaderName::from_static("x-prerender");
const X_ROBOTS_TAG: HeaderName = HeaderName::from_static("x-robots-tag");

/// How a prerendered response was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrerenderStatus {
    /// Fresh snapshot from the store.
    Hit,
    /// Generated for this request.
    Miss,
    /// Stale snapshot served because regeneration failed.
    Stale,
}

impl PrerenderStatus {
    fn as_str(self) -> &'static str {
        match self {
            Self::Hit => "hit",
            Self::Miss => "miss",
            Self::Stale => "stale",
        }
    }

    fn cache_control(self) -> &'static str {
        match self {
            Self::Hit | Self::Miss => CACHE_CONTROL_FRESH,
            Self::Stale => CACHE_CONTROL_STALE,
        }
    }
}

/// Middleware: serve snapshots to crawlers, pass everyone else through.
pub async fn prerender(State(state): State<AppState>, request: Request, next: Next) -> Response {
    if !wants_prerender(&request) {
        return next.run(request).await;
    }

    let route = RouteDescriptor::from_path(request.uri().path());
    if !route.is_prerenderable() {
        return next.run(request).await;
    }

    serve_snapshot(&state, &route).await
}

/// GET from a crawler asking for an HTML document.
///
/// A missing `Accept` header counts as accepting HTML; so does a bare
/// wildcard.
fn wants_prerender(request: &Request) -> bool {
    if request.method() != Method::GET {
        return false;
    }

    let headers = request.headers();
    let accepts_html = headers
        .get(header::ACCEPT)
        .and_then(|value| value.to_str().ok())
        .is_none_or(|accept| accept.contains("text/html") || accept.contains("*/*"));
    if !accepts_html {
        return false;
    }

    headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .is_some_and(is_crawler)
}

/// Resolve a prerenderable route to a response.
pub async fn serve_snapshot(state: &AppState, route: &RouteDescriptor) -> Response {
    let Some(key) = route.snapshot_key() else {
        return not_found(state, route);
    };

    let (cached, store_ok) = match state.store.get(&key).await {
        Ok(snapshot) => (snapshot, true),
        Err(err) => {
            record_store_error("get", &key, &err);
            (None, false)
        }
    };

    if let Some(snapshot) = &cached
        && snapshot.is_fresh_at(state.clock.now())
    {
        tracing::debug!(key = %key, "snapshot hit");
        record_outcome("prerender_requests_total", "hit");
        return build_response(&snapshot.body, PrerenderStatus::Hit);
    }

    match regenerate(state, route, &key, store_ok).await {
        Regenerated::Stored(html) => {
            tracing::debug!(key = %key, stale = cached.is_some(), "snapshot regenerated");
            record_outcome("prerender_requests_total", "miss");
            build_response(&html, PrerenderStatus::Miss)
        }
        Regenerated::Uncached(html) => {
            record_outcome("prerender_requests_total", "uncached");
            build_response(&html, PrerenderStatus::Miss)
        }
        Regenerated::Failed => serve_stale_or_empty(state, route, cached),
    }
}

enum Regenerated {
    Stored(String),
    Uncached(String),
    Failed,
}

/// Generate and store a snapshot in a detached task so a dropped client
/// connection cannot cancel the work half way.
async fn regenerate(
    state: &AppState,
    route: &RouteDescriptor,
    key: &str,
    store_ok: bool,
) -> Regenerated {
    let generator = state.generator.clone();
    let store = state.store.clone();
    let route = route.clone();
    let key = key.to_string();

    let task = tokio::spawn(async move {
        let Some(html) = generator.generate(&route).await else {
            return Regenerated::Failed;
        };
        if !store_ok {
            return Regenerated::Uncached(html);
        }
        match store.put(&key, &html, route.ttl_seconds()).await {
            Ok(()) => Regenerated::Stored(html),
            Err(err) => {
                record_store_error("put", &key, &err);
                Regenerated::Uncached(html)
            }
        }
    });

    match task.await {
        Ok(outcome) => outcome,
        Err(err) => {
            tracing::error!(error = %err, "snapshot generation task failed");
            Regenerated::Failed
        }
    }
}

fn serve_stale_or_empty(
    state: &AppState,
    route: &RouteDescriptor,
    cached: Option<Snapshot>,
) -> Response {
    match cached {
        Some(snapshot) => {
            tracing::info!(
                key = %snapshot.key,
                age_secs = snapshot.age_at(state.clock.now()).num_seconds(),
                "serving stale snapshot"
            );
            record_outcome("prerender_requests_total", "stale");
            build_response(&snapshot.body, PrerenderStatus::Stale)
        }
        None => not_found(state, route),
    }
}

fn not_found(state: &AppState, route: &RouteDescriptor) -> Response {
    record_outcome("prerender_requests_total", "not_found");
    let html = shell::not_found(&route.canonical_path(), state.site()).into_string();

    let mut headers = security_headers();
    headers.insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    headers.insert(X_ROBOTS_TAG, HeaderValue::from_static("noindex"));
    (StatusCode::NOT_FOUND, headers, html).into_response()
}

fn security_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert(
        header::CONTENT_TYPE,
        HeaderValue::from_static("text/html; charset=utf-8"),
    );
    headers.insert(
        header::CONTENT_SECURITY_POLICY,
        HeaderValue::from_static(CSP_HEADER),
    );
    headers.insert(
        header::X_CONTENT_TYPE_OPTIONS,
        HeaderValue::from_static("nosniff"),
    );
    headers.insert(header::X_FRAME_OPTIONS, HeaderValue::from_static("DENY"));
    headers.insert(header::VARY, HeaderValue::from_static("User-Agent"));
    headers
}

/// Build a 200 HTML response with cache, robots and security headers.
pub fn build_response(html: &str, status: PrerenderStatus) -> Response {
    let mut headers = security_headers();

    headers.insert(
        header::CACHE_CONTROL,
        HeaderValue::from_static(status.cache_control()),
    );
    headers.insert(X_ROBOTS_TAG, HeaderValue::from_static("index, follow"));
    headers.insert(X_PRERENDER, HeaderValue::from_static(status.as_str()));

    // ETag (xxHash of content)
    let hash = xxhash_rust::xxh3::xxh3_64(html.as_bytes());
    let etag = format!("\"{}\"", hex_fmt::HexFmt(&hash.to_be_bytes()));
    if let Ok(val) = HeaderValue::from_str(&etag) {
        headers.insert(header::ETAG, val);
    }

    (StatusCode::OK, headers, html.to_string()).into_response()
}
