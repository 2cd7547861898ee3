//! Reverse proxy for the content API.
//!
//! `ANY /api/v1/{*path}` is forwarded to the origin with method, query and
//! body preserved. Failures come back as JSON `{"error": ...}` bodies. CORS
//! is layered on in [`crate::routes::router`] so the SPA can always read
//! them.
//!
//! The forwarded path is taken from the raw request URI, still
//! percent-encoded, and must stay below `/api/v1/`.

use axum::Json;
use axum::body::Bytes;
use axum::extract::{OriginalUri, RawQuery, State};
use axum::http::{HeaderMap, HeaderValue, Method, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use jkflv_core::metrics::record_labelled;
use jkflv_core::normalize_bytes;
use serde_json::json;

use crate::origin::API_PREFIX;
use crate::state::AppState;

/// Cache-Control for successful proxied responses.
pub const PROXY_CACHE_CONTROL: &str = "public, max-age=300, s-maxage=600";

/// Upstream path below `/api/v1/`, still percent-encoded.
///
/// Dot segments (plain or encoded) and encoded separators are rejected.
fn forwarded_path(uri: &Uri) -> Option<&str> {
    let path = uri.path().strip_prefix(API_PREFIX)?.strip_prefix('/')?;
    let safe = path.split('/').all(|segment| {
        let segment = segment.to_ascii_lowercase();
        let dots = segment.replace("%2e", ".");
        dots != "."
            && dots != ".."
            && !segment.contains("%2f")
            && !segment.contains("%5c")
            && !segment.contains('\\')
    });
    (safe && !path.is_empty()).then_some(path)
}

/// Forward a request to the origin.
pub async fn proxy(
    State(state): State<AppState>,
    OriginalUri(uri): OriginalUri,
    RawQuery(query): RawQuery,
    method: Method,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let Some(path) = forwarded_path(&uri) else {
        tracing::warn!(path = %uri.path(), "proxy path rejected");
        record_labelled("proxy_requests_total", "status", "rejected");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error": "invalid api path" })),
        )
            .into_response();
    };

    let mut url = format!("{}{API_PREFIX}/{path}", state.config.origin_base_url);
    if let Some(query) = query.filter(|q| !q.is_empty()) {
        url.push('?');
        url.push_str(&query);
    }

    let mut request = state
        .http
        .request(method.clone(), &url)
        .timeout(state.config.origin_timeout);
    for name in [header::CONTENT_TYPE, header::ACCEPT] {
        if let Some(value) = headers.get(&name) {
            request = request.header(name, value.clone());
        }
    }
    if !body.is_empty() {
        request = request.body(body);
    }

    let upstream = match request.send().await {
        Ok(response) => response,
        Err(err) => {
            tracing::warn!(method = %method, path = %path, error = %err, "proxy upstream unreachable");
            record_labelled("proxy_requests_total", "status", "unreachable");
            let reason = if err.is_timeout() {
                "timeout".to_string()
            } else {
                format!("network error: {err}")
            };
            return gateway_error(reason);
        }
    };

    let status = upstream.status();
    if status.is_server_error() {
        tracing::warn!(method = %method, path = %path, status = status.as_u16(), "proxy upstream error");
        record_labelled("proxy_requests_total", "status", "5xx");
        return gateway_error(format!("upstream returned status {}", status.as_u16()));
    }

    let content_type = upstream.headers().get(header::CONTENT_TYPE).cloned();
    let bytes = match upstream.bytes().await {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::warn!(path = %path, error = %err, "proxy body read failed");
            record_labelled("proxy_requests_total", "status", "unreachable");
            return gateway_error(format!("network error: {err}"));
        }
    };

    if status.is_client_error() {
        record_labelled("proxy_requests_total", "status", "4xx");
        let message = normalize_bytes(&bytes)
            .error_message()
            .map(str::to_string)
            .unwrap_or_else(|| format!("upstream returned status {}", status.as_u16()));
        return (status, Json(json!({ "error": message }))).into_response();
    }

    record_labelled(
        "proxy_requests_total",
        "status",
        if status.is_success() { "2xx" } else { "3xx" },
    );

    let mut response_headers = HeaderMap::new();
    response_headers.insert(
        header::CONTENT_TYPE,
        content_type.unwrap_or_else(|| HeaderValue::from_static("application/json")),
    );
    if status.is_success() {
        response_headers.insert(
            header::CACHE_CONTROL,
            HeaderValue::from_static(PROXY_CACHE_CONTROL),
        );
    }

    (status, response_headers, bytes).into_response()
}

fn gateway_error(message: String) -> Response {
    (StatusCode::BAD_GATEWAY, Json(json!({ "error": message }))).into_response()
}
