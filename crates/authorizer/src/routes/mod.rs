//! HTTP routes for the authorizer.
//!
//! Defines the Axum router and application state.

use crate::auth::JwksClient;
use crate::config::{Config, REQUEST_TIMEOUT_SECONDS};
use crate::handlers;
use crate::middleware::http_metrics_middleware;
use crate::services::Authorizer;
use axum::{middleware, routing::get, Router};
use metrics_exporter_prometheus::PrometheusHandle;
use std::sync::Arc;
use std::time::Duration;
use tower_http::{timeout::TimeoutLayer, trace::TraceLayer};

/// Application state shared across all handlers.
pub struct AppState {
    /// Service configuration.
    pub config: Config,

    /// Authorization gate.
    pub authorizer: Arc<Authorizer>,

    /// JWKS client shared with the gate, used by readiness.
    pub jwks_client: Arc<JwksClient>,
}

impl AppState {
    /// Wire the JWKS client and gate from configuration.
    pub fn from_config(config: Config) -> Self {
        let jwks_client = Arc::new(
            JwksClient::new(config.jwks_url.clone())
                .with_cache_ttl(config.jwks_cache_ttl())
                .with_min_refresh_interval(config.jwks_min_refresh_interval())
                .with_fetch_timeout(config.jwks_fetch_timeout())
                .with_retry_backoff(config.jwks_retry_backoff()),
        );
        let authorizer = Arc::new(Authorizer::from_config(&config, Arc::clone(&jwks_client)));

        Self {
            config,
            authorizer,
            jwks_client,
        }
    }
}

/// Build the application routes.
///
/// Creates an Axum router with:
/// - `/v1/authorize` - POST authorizer event or GET with `Authorization` header
/// - `/health` - Liveness probe (simple "OK")
/// - `/ready` - Readiness probe (JWKS reachable)
/// - `/metrics` - Prometheus metrics endpoint
/// - TraceLayer for request logging
/// - HTTP metrics middleware
/// - `REQUEST_TIMEOUT_SECONDS` request timeout
pub fn build_routes(state: Arc<AppState>, metrics_handle: PrometheusHandle) -> Router {
    let app_routes = Router::new()
        .route(
            "/v1/authorize",
            get(handlers::authorize_header).post(handlers::authorize_event),
        )
        .route("/health", get(handlers::health_check))
        .route("/ready", get(handlers::readiness_check))
        .with_state(state);

    let metrics_routes = Router::new()
        .route("/metrics", get(handlers::metrics_handler))
        .with_state(metrics_handle);

    // Layer order (the last layer added runs first):
    // 1. TraceLayer - Log request details (innermost)
    // 2. TimeoutLayer - Timeout the request
    // 3. http_metrics_middleware - Record ALL responses (outermost)
    app_routes
        .merge(metrics_routes)
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::new(Duration::from_secs(REQUEST_TIMEOUT_SECONDS)))
        .layer(middleware::from_fn(http_metrics_middleware))
}
