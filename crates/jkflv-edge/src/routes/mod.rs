//! HTTP route definitions.
//!
//! ## Public
//! - `GET /health` - Health check (JSON)
//! - `GET /robots.txt` - Crawler instructions
//! - `GET /sitemap.xml` - Sitemap from the last refresh
//! - `GET /api/update-content` - Refresh ledger and cache presence
//! - `POST /api/update-content` - Forced refresh
//! - `ANY /api/v1/{*path}` - Content API proxy
//! - everything else - SPA, with crawler page requests prerendered
//!
//! ## Protected (bearer token)
//! - `GET /api/snapshots` - Stored snapshot keys
//! - `DELETE /api/snapshots/{*key}` - Purge one snapshot

mod admin;
mod health;
pub mod proxy;
mod sitemap;
mod update;

use axum::Router;
use axum::extract::State;
use axum::http::{HeaderValue, header};
use axum::middleware;
use axum::response::IntoResponse;
use axum::routing::{any, delete, get};
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::{ServeDir, ServeFile};
use tower_http::set_header::SetResponseHeaderLayer;

use crate::auth::require_auth;
use crate::prerender::prerender;
use crate::state::AppState;

/// Build the complete edge router.
///
/// The proxy's CORS layer answers preflights itself; allowed methods and
/// headers are stamped on every other proxy response as well.
pub fn router(state: AppState) -> Router {
    let api_proxy = Router::new()
        .route("/{*path}", any(proxy::proxy))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_METHODS,
            HeaderValue::from_static("*"),
        ))
        .layer(SetResponseHeaderLayer::if_not_present(
            header::ACCESS_CONTROL_ALLOW_HEADERS,
            HeaderValue::from_static("*"),
        ))
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        );

    let admin = Router::new()
        .route("/api/snapshots", get(admin::list_snapshots))
        .route("/api/snapshots/{*key}", delete(admin::purge_snapshot))
        .layer(middleware::from_fn_with_state(state.clone(), require_auth));

    Router::new()
        .route("/health", get(health::health_check))
        .route("/robots.txt", get(robots_txt))
        .route("/sitemap.xml", get(sitemap::sitemap_xml))
        .route(
            "/api/update-content",
            get(update::update_status).post(update::trigger_update),
        )
        .nest("/api/v1", api_proxy)
        .merge(admin)
        .merge(spa(&state))
        .with_state(state)
}

/// The built SPA with `index.html` as the client-side routing fallback,
/// wrapped by the prerender dispatcher.
fn spa(state: &AppState) -> Router<AppState> {
    let static_dir = &state.config.static_dir;
    let files = ServeDir::new(static_dir).fallback(ServeFile::new(static_dir.join("index.html")));

    Router::new()
        .fallback_service(files)
        .layer(middleware::from_fn_with_state(state.clone(), prerender))
}

/// Serve robots.txt allowing all crawlers and pointing at the sitemap.
async fn robots_txt(State(state): State<AppState>) -> impl IntoResponse {
    (
        [("content-type", "text/plain; charset=utf-8")],
        format!(
            "User-agent: *\nAllow: /\nDisallow: /api/\n\nSitemap: {}\n",
            state.site().url("/sitemap.xml")
        ),
    )
}
