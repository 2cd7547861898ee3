//! Administrative snapshot endpoints. Require a bearer token.

use axum::Json;
use axum::extract::{Path, State};
use serde::Serialize;

use crate::error::EdgeError;
use crate::state::AppState;

/// Stored keys.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotKeys {
    keys: Vec<String>,
}

/// Purge result.
#[derive(Debug, Clone, Serialize)]
pub struct PurgeResponse {
    key: String,
    deleted: bool,
}

/// `GET /api/snapshots`: list stored keys.
pub async fn list_snapshots(State(state): State<AppState>) -> Result<Json<SnapshotKeys>, EdgeError> {
    let keys = state.store.keys().await?;
    Ok(Json(SnapshotKeys { keys }))
}

/// `DELETE /api/snapshots/{*key}`: drop one snapshot so the next crawler
/// request regenerates it.
pub async fn purge_snapshot(
    State(state): State<AppState>,
    Path(key): Path<String>,
) -> Result<Json<PurgeResponse>, EdgeError> {
    let key = key.trim_matches('/').to_string();
    if key.is_empty() {
        return Err(EdgeError::BadRequest("snapshot key is required".to_string()));
    }

    if !state.store.delete(&key).await? {
        return Err(EdgeError::NotFound(format!("no snapshot stored under '{key}'")));
    }

    tracing::info!(key = %key, "snapshot purged");
    Ok(Json(PurgeResponse { key, deleted: true }))
}

#[cfg(test)]
mod tests {
    use axum::body::Body;
    use axum::http::{Method, StatusCode, header};
    use serde_json::Value;
    use tower::ServiceExt;

    use crate::routes::router;
    use crate::testing::{ADMIN_TOKEN, TestApp, test_app};

    async fn call(app: &TestApp, method: Method, uri: &str, token: Option<&str>) -> (StatusCode, Value) {
        let mut request = axum::http::Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            request = request.header(header::AUTHORIZATION, format!("Bearer {token}"));
        }
        let response = router(app.state.clone())
            .oneshot(request.body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap_or(Value::Null))
    }

    #[tokio::test]
    async fn test_purge_requires_token() {
        let app = test_app();
        app.store.put("anime/42", "<html></html>", 60).await.unwrap();

        let (status, body) = call(&app, Method::DELETE, "/api/snapshots/anime/42", None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "unauthorized");
        assert!(app.store.get("anime/42").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_purge_nested_key() {
        let app = test_app();
        app.store.put("anime/42", "<html></html>", 60).await.unwrap();

        let (status, body) = call(
            &app,
            Method::DELETE,
            "/api/snapshots/anime/42",
            Some(ADMIN_TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["key"], "anime/42");
        assert_eq!(body["deleted"], true);
        assert!(app.store.get("anime/42").await.unwrap().is_none());

        let (status, _) = call(
            &app,
            Method::DELETE,
            "/api/snapshots/anime/42",
            Some(ADMIN_TOKEN),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_list_snapshots() {
        let app = test_app();
        app.store.put("index", "<html></html>", 60).await.unwrap();
        app.store.put("generos/accion", "<html></html>", 60).await.unwrap();

        let (status, body) = call(&app, Method::GET, "/api/snapshots", Some(ADMIN_TOKEN)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["keys"], serde_json::json!(["generos/accion", "index"]));
    }
}
