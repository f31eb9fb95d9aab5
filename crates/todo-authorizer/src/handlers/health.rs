//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - the JWKS endpoint publishes a usable signing key

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies; failure means the process is hung.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Fetches the key set once. Returns 200 if at least one usable signing key
/// is published, 503 otherwise.
///
/// ## Security
///
/// Error messages are intentionally generic to avoid leaking infrastructure
/// details. Actual errors are logged server-side.
#[tracing::instrument(skip_all, name = "authorizer.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    match state.authorizer.key_provider().resolve_signing_keys().await {
        Ok(keys) if !keys.is_empty() => (
            StatusCode::OK,
            Json(ReadinessResponse {
                status: "ready",
                jwks: Some("healthy"),
                signing_keys: Some(keys.len()),
                error: None,
            }),
        ),
        Ok(_) => {
            tracing::warn!(target: "authorizer.http", "Readiness check failed: no usable signing keys published");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    jwks: Some("no_signing_keys"),
                    signing_keys: Some(0),
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
        Err(e) => {
            tracing::warn!(target: "authorizer.http", error = %e, "Readiness check failed: JWKS unavailable");
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    jwks: Some("unavailable"),
                    signing_keys: None,
                    error: Some("Service dependencies unavailable".to_string()),
                }),
            )
        }
    }
}
