//! Errors of the JSON endpoints.
//!
//! Crawler-facing HTML never goes through this type; the prerender
//! middleware always degrades to a snapshot or a shell document. These
//! errors are for the JSON endpoints.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::store::StoreError;

/// Failure of a JSON endpoint, rendered as `{"error": code, "message"?}`.
#[derive(Debug, thiserror::Error)]
pub enum EdgeError {
    /// Missing or unknown admin token.
    #[error("unauthorized")]
    Unauthorized,

    /// Nothing stored for the requested key.
    #[error("not found: {0}")]
    NotFound(String),

    /// Malformed path or parameters.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// Snapshot store failure.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// A stored snapshot exists but its body cannot be decoded.
    #[error("corrupt snapshot '{key}': {reason}")]
    CorruptSnapshot {
        /// Store key of the snapshot.
        key: String,
        /// Decoder message.
        reason: String,
    },
}

impl EdgeError {
    /// Wrap a decode failure of the snapshot stored under `key`.
    pub fn corrupt(key: &str, err: impl std::fmt::Display) -> Self {
        Self::CorruptSnapshot {
            key: key.to_string(),
            reason: err.to_string(),
        }
    }
}

/// JSON error response body.
#[derive(Debug, Clone, Serialize)]
struct ErrorResponse {
    error: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
}

impl IntoResponse for EdgeError {
    fn into_response(self) -> Response {
        let (status, error, message) = match &self {
            Self::Unauthorized => (StatusCode::UNAUTHORIZED, "unauthorized", None),
            Self::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", Some(msg.clone())),
            Self::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", Some(msg.clone())),
            Self::Store(err) => {
                tracing::error!(error = %err, "snapshot store error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "store_error",
                    Some("The snapshot store is temporarily unavailable".to_string()),
                )
            }
            Self::CorruptSnapshot { key, reason } => {
                tracing::error!(key = %key, reason = %reason, "stored snapshot is corrupt");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "corrupt_snapshot",
                    Some(format!("Snapshot '{key}' could not be read")),
                )
            }
        };

        let body = ErrorResponse {
            error: error.to_string(),
            message,
        };

        (status, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn error_display() {
        assert_eq!(EdgeError::Unauthorized.to_string(), "unauthorized");
        assert_eq!(
            EdgeError::NotFound("snapshot index".to_string()).to_string(),
            "not found: snapshot index"
        );
        let store = EdgeError::from(StoreError::Unavailable("locked".to_string()));
        assert_eq!(
            store.to_string(),
            "store error: snapshot store unavailable: locked"
        );
    }

    #[tokio::test]
    async fn unauthorized_response() {
        let response = EdgeError::Unauthorized.into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        let body = body_json(response).await;
        assert_eq!(body["error"], "unauthorized");
        assert!(body.get("message").is_none());
    }

    #[tokio::test]
    async fn store_error_hides_details() {
        let response =
            EdgeError::from(StoreError::Unavailable("/var/lib secret path".to_string()))
                .into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "store_error");
        assert!(!body["message"].as_str().unwrap().contains("secret"));
    }

    #[tokio::test]
    async fn corrupt_snapshot_names_key_only() {
        let err = serde_json::from_str::<serde_json::Value>("{oops").unwrap_err();
        let response = EdgeError::corrupt("sitemap-data", err).into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(response).await;
        assert_eq!(body["error"], "corrupt_snapshot");
        assert_eq!(body["message"], "Snapshot 'sitemap-data' could not be read");
    }

    #[test]
    fn not_found_and_bad_request_status() {
        assert_eq!(
            EdgeError::NotFound("x".into()).into_response().status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            EdgeError::BadRequest("x".into()).into_response().status(),
            StatusCode::BAD_REQUEST
        );
    }
}
