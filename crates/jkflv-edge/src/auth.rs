//! Bearer token authentication middleware.

use axum::extract::{Request, State};
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;

use crate::error::EdgeError;
use crate::state::AppState;

/// Middleware that requires a valid Bearer token.
///
/// The token must be provided in the `Authorization` header as:
/// ```text
/// Authorization: Bearer <token>
/// ```
///
/// Tokens are validated against `EDGE_ADMIN_TOKENS`. With no tokens
/// configured every request is rejected.
pub async fn require_auth(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, EdgeError> {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    let token = match auth_header.and_then(|header| header.strip_prefix("Bearer ")) {
        Some(token) => token.trim(),
        None => {
            tracing::debug!("missing or malformed authorization header");
            return Err(EdgeError::Unauthorized);
        }
    };

    if !state.config.admin_tokens.contains(token) {
        tracing::debug!("invalid admin token");
        return Err(EdgeError::Unauthorized);
    }

    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::Router;
    use axum::body::Body;
    use axum::http::StatusCode;
    use axum::middleware;
    use axum::routing::get;
    use tower::ServiceExt;

    use crate::testing::{ADMIN_TOKEN, test_app, test_app_with};

    fn guarded(state: AppState) -> Router {
        Router::new()
            .route("/admin", get(|| async { "ok" }))
            .layer(middleware::from_fn_with_state(state.clone(), require_auth))
            .with_state(state)
    }

    async fn status_with(state: AppState, header: Option<&str>) -> StatusCode {
        let mut request = axum::http::Request::builder().uri("/admin");
        if let Some(value) = header {
            request = request.header(AUTHORIZATION, value);
        }
        guarded(state)
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap()
            .status()
    }

    #[tokio::test]
    async fn test_valid_token_passes() {
        let app = test_app();
        let header = format!("Bearer {ADMIN_TOKEN}");
        assert_eq!(status_with(app.state, Some(&header)).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_missing_or_wrong_token_rejected() {
        let app = test_app();
        assert_eq!(
            status_with(app.state.clone(), None).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_with(app.state.clone(), Some("Bearer nope")).await,
            StatusCode::UNAUTHORIZED
        );
        assert_eq!(
            status_with(app.state, Some(ADMIN_TOKEN)).await,
            StatusCode::UNAUTHORIZED
        );
    }

    #[tokio::test]
    async fn test_no_configured_tokens_rejects_everything() {
        let app = test_app_with(|config| config.admin_tokens.clear());
        assert_eq!(
            status_with(app.state, Some("Bearer ")).await,
            StatusCode::UNAUTHORIZED
        );
    }
}
