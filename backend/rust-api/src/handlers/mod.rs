use axum::{
    extract::{Request, State},
    http::{header, HeaderMap, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use base64::{engine::general_purpose, Engine as _};
use serde_json::json;
use std::sync::Arc;
use std::time::Duration;

use crate::metrics;
use crate::services::AppState;

pub mod catalog;
pub mod error;
pub mod exercises;
pub mod history;
pub mod statistics;

pub use error::ApiError;

/// GET /health. The store is required, the topic cache only degrades the service.
pub async fn health_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    let mut dependencies = serde_json::Map::new();

    let store_health = check_store(&state).await;
    let store_healthy = store_health.get("status").and_then(|v| v.as_str()) == Some("healthy");
    dependencies.insert(state.store.backend().to_string(), json!(store_health));

    let mut cache_healthy = true;
    if state.topic_cache.is_some() {
        let cache_health = check_cache(&state).await;
        cache_healthy = cache_health.get("status").and_then(|v| v.as_str()) == Some("healthy");
        dependencies.insert("redis".to_string(), json!(cache_health));
    }

    let (status_code, status) = match (store_healthy, cache_healthy) {
        (true, true) => (StatusCode::OK, "healthy"),
        (true, false) => (StatusCode::OK, "degraded"),
        (false, _) => (StatusCode::SERVICE_UNAVAILABLE, "unhealthy"),
    };

    (
        status_code,
        Json(json!({
            "status": status,
            "service": "lingua-api",
            "version": env!("CARGO_PKG_VERSION"),
            "dependencies": dependencies
        })),
    )
}

async fn check_store(state: &AppState) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();

    match tokio::time::timeout(Duration::from_secs(1), state.store.ping()).await {
        Ok(Ok(())) => {
            result.insert("status".to_string(), json!("healthy"));
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("Store error: {}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("Store timeout after 1s"));
        }
    }

    result
}

async fn check_cache(state: &AppState) -> serde_json::Map<String, serde_json::Value> {
    let mut result = serde_json::Map::new();
    let Some(cache) = &state.topic_cache else {
        return result;
    };

    match tokio::time::timeout(Duration::from_millis(500), cache.ping()).await {
        Ok(Ok(())) => {
            result.insert("status".to_string(), json!("healthy"));
        }
        Ok(Err(e)) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!(format!("Redis error: {:#}", e)));
        }
        Err(_) => {
            result.insert("status".to_string(), json!("unhealthy"));
            result.insert("error".to_string(), json!("Redis timeout after 500ms"));
        }
    }

    result
}

pub async fn metrics_handler() -> impl IntoResponse {
    match metrics::render_metrics() {
        Ok(metrics_text) => (StatusCode::OK, metrics_text),
        Err(e) => (
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Failed to render metrics: {}", e),
        ),
    }
}

/// HTTP Basic auth in front of `/metrics`, credentials from `Config::metrics_auth`.
pub async fn metrics_auth_middleware(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    request: Request,
    next: Next,
) -> Result<Response, StatusCode> {
    let encoded = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Basic "))
        .ok_or(StatusCode::UNAUTHORIZED)?;

    let decoded = general_purpose::STANDARD
        .decode(encoded)
        .map_err(|_| StatusCode::UNAUTHORIZED)?;
    let credentials = String::from_utf8(decoded).map_err(|_| StatusCode::UNAUTHORIZED)?;

    if credentials != state.config.metrics_auth {
        tracing::warn!("Rejected /metrics request with invalid credentials");
        return Err(StatusCode::UNAUTHORIZED);
    }

    Ok(next.run(request).await)
}
