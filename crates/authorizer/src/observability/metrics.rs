//! Metrics definitions for the authorizer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authz_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `method`: HTTP methods
//! - `endpoint`: 5 values (known routes plus `/other`)
//! - `effect`: 2 values (Allow, Deny)
//! - `reason`: bounded by `AuthError` variants plus `ok`
//! - `status`/`result`: bounded by code
//!
//! Principals and tokens are never used as labels.

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        .set_buckets_for_metric(
            Matcher::Prefix("authz_http_request".to_string()),
            &[
                0.001, 0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // Decisions are dominated by signature checks on a warm cache
        .set_buckets_for_metric(
            Matcher::Prefix("authz_decision".to_string()),
            &[
                0.0005, 0.001, 0.002, 0.005, 0.010, 0.025, 0.050, 0.100, 0.500, 1.000,
            ],
        )
        .map_err(|e| format!("Failed to set decision buckets: {e}"))?
        .set_buckets_for_metric(
            Matcher::Prefix("authz_jwks_fetch".to_string()),
            &[0.010, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `authz_http_requests_total`, `authz_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status`
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("authz_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status" => status
    )
    .record(duration.as_secs_f64());

    counter!("authz_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint,
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Unknown paths collapse to `/other` to bound cardinality.
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        "/v1/authorize" => "/v1/authorize",
        _ => "/other",
    }
}

// ============================================================================
// Decision Metrics
// ============================================================================

/// Record an authorization decision.
///
/// Metric: `authz_decisions_total`, `authz_decision_duration_seconds`
/// Labels: `effect`, `reason` (`ok` for Allow)
pub fn record_authorization(effect: &'static str, reason: &'static str, duration: Duration) {
    histogram!("authz_decision_duration_seconds", "effect" => effect)
        .record(duration.as_secs_f64());

    counter!("authz_decisions_total",
        "effect" => effect,
        "reason" => reason
    )
    .increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a single JWKS fetch attempt.
///
/// Metric: `authz_jwks_fetch_total`, `authz_jwks_fetch_duration_seconds`
/// Labels: `status` (success, error)
pub fn record_jwks_fetch(status: &'static str, duration: Duration) {
    histogram!("authz_jwks_fetch_duration_seconds", "status" => status)
        .record(duration.as_secs_f64());

    counter!("authz_jwks_fetch_total", "status" => status).increment(1);
}

/// Record a JWKS cache lookup.
///
/// Metric: `authz_jwks_cache_total`
/// Labels: `result` (hit, miss, unknown_kid)
pub fn record_jwks_cache(result: &'static str) {
    counter!("authz_jwks_cache_total", "result" => result).increment(1);
}
