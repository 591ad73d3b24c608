//! Health check handlers.
//!
//! - `/health`: Liveness probe - returns OK if the process is running
//! - `/ready`: Readiness probe - checks the identity provider's JWKS

use crate::models::ReadinessResponse;
use crate::routes::AppState;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use std::sync::Arc;

/// Liveness probe handler.
///
/// Does NOT check any dependencies.
pub async fn health_check() -> &'static str {
    "OK"
}

/// Readiness probe handler.
///
/// Ready once a key set is cached. When the cache is cold this fetches the
/// key set, which also warms it for the first real request. Returns 503 if
/// the fetch fails.
///
/// ## Security
///
/// Error messages are generic. Actual errors are logged server-side.
#[tracing::instrument(skip_all, name = "authz.health.readiness")]
pub async fn readiness_check(State(state): State<Arc<AppState>>) -> impl IntoResponse {
    if !state.jwks_client.is_warm().await {
        if let Err(e) = state.jwks_client.force_refresh().await {
            tracing::warn!(target: "authz.jwks", error = %e, "Readiness check failed: JWKS unavailable");
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadinessResponse {
                    status: "not_ready",
                    jwks: Some("unavailable"),
                    error: Some("Service dependencies unavailable"),
                }),
            );
        }
    }

    (
        StatusCode::OK,
        Json(ReadinessResponse {
            status: "ready",
            jwks: Some("available"),
            error: None,
        }),
    )
}
