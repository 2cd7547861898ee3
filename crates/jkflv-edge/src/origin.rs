//! Client for the upstream content API.
//!
//! Every call resolves to a [`ContentEnvelope`]; expected failures
//! (unreachable origin, timeouts, non-2xx statuses, malformed bodies) are
//! reported as `ContentEnvelope::Err` rather than as Rust errors so callers
//! can aggregate partial failures without error plumbing.

use std::time::Duration;

use async_trait::async_trait;
use jkflv_core::metrics::record_outcome;
use jkflv_core::{ContentEnvelope, normalize_bytes};

/// Path prefix of every content API endpoint.
pub const API_PREFIX: &str = "/api/v1";

/// Per-call options.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FetchOptions {
    /// Deadline for the whole call (connect, headers and body).
    pub timeout: Duration,
    /// Extra attempts after a network failure or timeout.
    pub retries: u32,
    /// Fixed pause between attempts.
    pub retry_delay: Duration,
}

impl Default for FetchOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            retries: 0,
            retry_delay: Duration::from_millis(500),
        }
    }
}

/// Source of upstream content.
#[async_trait]
pub trait Origin: Send + Sync {
    /// Fetch `endpoint` (relative to `/api/v1`, e.g. `anime/home`) and
    /// normalize the body.
    async fn fetch_json(&self, endpoint: &str, options: FetchOptions) -> ContentEnvelope;
}

/// Why a single attempt failed.
#[derive(Debug)]
enum AttemptError {
    Status(u16),
    Network(String),
    Timeout,
}

impl AttemptError {
    fn is_retryable(&self) -> bool {
        !matches!(self, Self::Status(_))
    }

    fn outcome(&self) -> &'static str {
        match self {
            Self::Status(_) => "status",
            Self::Network(_) => "network",
            Self::Timeout => "timeout",
        }
    }

    fn into_message(self) -> String {
        match self {
            Self::Status(code) => format!("upstream returned status {code}"),
            Self::Network(reason) => format!("network error: {reason}"),
            Self::Timeout => "timeout".to_string(),
        }
    }
}

/// reqwest-backed [`Origin`].
#[derive(Clone)]
pub struct OriginClient {
    http: reqwest::Client,
    api_base: String,
}

impl OriginClient {
    /// Create a client for the origin at `base_url` (without `/api/v1`).
    pub fn new(http: reqwest::Client, base_url: &str) -> Self {
        Self {
            http,
            api_base: format!("{}{API_PREFIX}", base_url.trim_end_matches('/')),
        }
    }

    /// Absolute URL of an endpoint.
    pub fn endpoint_url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.api_base, endpoint.trim_start_matches('/'))
    }

    async fn attempt(&self, url: &str, timeout: Duration) -> Result<ContentEnvelope, AttemptError> {
        let call = async {
            let response = self
                .http
                .get(url)
                .header(reqwest::header::ACCEPT, "application/json")
                .send()
                .await?;
            let status = response.status();
            if !status.is_success() {
                return Ok(Err(AttemptError::Status(status.as_u16())));
            }
            let body = response.bytes().await?;
            Ok::<_, reqwest::Error>(Ok(normalize_bytes(&body)))
        };

        match tokio::time::timeout(timeout, call).await {
            Err(_) => Err(AttemptError::Timeout),
            Ok(Err(e)) => Err(classify_reqwest_error(e)),
            Ok(Ok(result)) => result,
        }
    }
}

fn classify_reqwest_error(err: reqwest::Error) -> AttemptError {
    if err.is_timeout() {
        AttemptError::Timeout
    } else {
        AttemptError::Network(err.to_string())
    }
}

#[async_trait]
impl Origin for OriginClient {
    async fn fetch_json(&self, endpoint: &str, options: FetchOptions) -> ContentEnvelope {
        let url = self.endpoint_url(endpoint);
        let mut attempt = 0;

        loop {
            match self.attempt(&url, options.timeout).await {
                Ok(envelope) => {
                    record_outcome(
                        "origin_requests_total",
                        if envelope.is_ok() { "ok" } else { "app_error" },
                    );
                    if let Some(message) = envelope.error_message() {
                        tracing::debug!(endpoint, error = %message, "origin reported failure");
                    }
                    return envelope;
                }
                Err(err) => {
                    record_outcome("origin_requests_total", err.outcome());
                    if err.is_retryable() && attempt < options.retries {
                        attempt += 1;
                        tracing::debug!(endpoint, attempt, error = ?err, "retrying origin call");
                        tokio::time::sleep(options.retry_delay).await;
                        continue;
                    }
                    tracing::warn!(endpoint, attempts = attempt + 1, error = ?err, "origin call failed");
                    return ContentEnvelope::failure(err.into_message());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use axum::Router;
    use axum::extract::State;
    use axum::http::StatusCode;
    use axum::routing::get;
    use serde_json::json;

    fn fast(retries: u32) -> FetchOptions {
        FetchOptions {
            timeout: Duration::from_millis(200),
            retries,
            retry_delay: Duration::from_millis(5),
        }
    }

    async fn serve(app: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn client(base: &str) -> OriginClient {
        OriginClient::new(reqwest::Client::new(), base)
    }

    #[test]
    fn test_endpoint_url() {
        let client = client("http://origin:3000/");
        assert_eq!(
            client.endpoint_url("anime/home"),
            "http://origin:3000/api/v1/anime/home"
        );
        assert_eq!(
            client.endpoint_url("/anime/list?genre=accion"),
            "http://origin:3000/api/v1/anime/list?genre=accion"
        );
    }

    #[tokio::test]
    async fn test_success_is_normalized() {
        let app = Router::new().route(
            "/api/v1/anime/home",
            get(|| async { axum::Json(json!({"result_code": 200, "data": {"x": 1}})) }),
        );
        let base = serve(app).await;

        let envelope = client(&base).fetch_json("anime/home", fast(0)).await;
        assert_eq!(envelope, ContentEnvelope::Ok(json!({"x": 1})));
    }

    #[tokio::test]
    async fn test_application_error_not_retried() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/api/v1/anime/detail/{id}",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    axum::Json(json!({"msg": "anime not found"}))
                }),
            )
            .with_state(hits.clone());
        let base = serve(app).await;

        let envelope = client(&base).fetch_json("anime/detail/9", fast(3)).await;
        assert_eq!(envelope.error_message(), Some("anime not found"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_non_2xx_reports_status_without_retry() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/api/v1/anime/home",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    (StatusCode::SERVICE_UNAVAILABLE, "down")
                }),
            )
            .with_state(hits.clone());
        let base = serve(app).await;

        let envelope = client(&base).fetch_json("anime/home", fast(2)).await;
        assert_eq!(envelope.error_message(), Some("upstream returned status 503"));
        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_timeout_is_retried_then_reported() {
        let hits = Arc::new(AtomicUsize::new(0));
        let app = Router::new()
            .route(
                "/api/v1/anime/home",
                get(|State(hits): State<Arc<AtomicUsize>>| async move {
                    hits.fetch_add(1, Ordering::SeqCst);
                    tokio::time::sleep(Duration::from_secs(2)).await;
                    axum::Json(json!({}))
                }),
            )
            .with_state(hits.clone());
        let base = serve(app).await;

        let options = FetchOptions {
            timeout: Duration::from_millis(50),
            retries: 1,
            retry_delay: Duration::from_millis(5),
        };
        let envelope = client(&base).fetch_json("anime/home", options).await;
        assert_eq!(envelope.error_message(), Some("timeout"));
        assert_eq!(hits.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unreachable_origin_is_network_error() {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let envelope = client(&format!("http://{addr}"))
            .fetch_json("anime/home", fast(1))
            .await;
        let message = envelope.error_message().unwrap();
        assert!(message.starts_with("network error") || message == "timeout");
    }

    #[tokio::test]
    async fn test_malformed_body_is_invalid_payload() {
        let app = Router::new().route("/api/v1/anime/genres", get(|| async { "<html>oops" }));
        let base = serve(app).await;

        let envelope = client(&base).fetch_json("anime/genres", fast(0)).await;
        assert_eq!(envelope.error_message(), Some("invalid payload"));
    }

    #[test]
    fn test_default_options() {
        let options = FetchOptions::default();
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert_eq!(options.retries, 0);
    }
}
