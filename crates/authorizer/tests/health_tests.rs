//! Operational endpoint tests: liveness, readiness, metrics, routing.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use authorizer::config::Config;
use authorizer::routes::{build_routes, AppState};
use authorizer_test_utils::{
    jwks_fetch_count, jwks_url, mount_jwks, mount_jwks_failure, MockServer,
    TestAuthorizerServer, TestKeypair,
};
use axum::body::Body;
use axum::http::{Request, StatusCode};
use http_body_util::BodyExt;
use metrics_exporter_prometheus::PrometheusBuilder;
use std::collections::HashMap;
use std::sync::Arc;
use tower::ServiceExt;

fn router_for(jwks_url: &str) -> axum::Router {
    let vars = HashMap::from([
        ("JWKS_URL".to_string(), jwks_url.to_string()),
        ("JWKS_RETRY_BACKOFF_MS".to_string(), "10".to_string()),
    ]);
    let config = Config::from_vars(&vars).unwrap();
    let state = Arc::new(AppState::from_config(config));
    build_routes(state, PrometheusBuilder::new().build_recorder().handle())
}

async fn get(router: axum::Router, uri: &str) -> (StatusCode, String) {
    let response = router
        .oneshot(Request::get(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status();
    let body = response.into_body().collect().await.unwrap().to_bytes();
    (status, String::from_utf8(body.to_vec()).unwrap())
}

#[tokio::test]
async fn test_health_returns_ok() {
    let (status, body) = get(router_for("http://127.0.0.1:1/jwks"), "/health").await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, "OK");
}

#[tokio::test]
async fn test_ready_when_jwks_reachable() {
    let idp = MockServer::start().await;
    mount_jwks(&idp, &[&TestKeypair::primary()]).await;

    let (status, body) = get(router_for(&jwks_url(&idp)), "/ready").await;

    assert_eq!(status, StatusCode::OK);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "ready");
    assert_eq!(json["jwks"], "available");
}

#[tokio::test]
async fn test_not_ready_when_jwks_unavailable() {
    let idp = MockServer::start().await;
    mount_jwks_failure(&idp, 500).await;

    let (status, body) = get(router_for(&jwks_url(&idp)), "/ready").await;

    assert_eq!(status, StatusCode::SERVICE_UNAVAILABLE);
    let json: serde_json::Value = serde_json::from_str(&body).unwrap();
    assert_eq!(json["status"], "not_ready");
    assert_eq!(json["error"], "Service dependencies unavailable");
    // No infrastructure details in the response
    assert!(!body.contains("500"));
    assert!(!body.contains(&idp.uri()));
}

#[tokio::test]
async fn test_ready_warms_cache_once() -> Result<(), anyhow::Error> {
    let idp = MockServer::start().await;
    mount_jwks(&idp, &[&TestKeypair::primary()]).await;
    let server = TestAuthorizerServer::spawn(&jwks_url(&idp)).await?;
    let client = reqwest::Client::new();

    for _ in 0..3 {
        let response = client.get(format!("{}/ready", server.url())).send().await?;
        assert_eq!(response.status(), 200);
    }

    assert!(server.state().jwks_client.is_warm().await);
    assert_eq!(jwks_fetch_count(&idp).await, 1);
    Ok(())
}

#[tokio::test]
async fn test_metrics_endpoint_renders() {
    let (status, _body) = get(router_for("http://127.0.0.1:1/jwks"), "/metrics").await;
    assert_eq!(status, StatusCode::OK);
}

#[tokio::test]
async fn test_unknown_route_is_not_found() {
    let (status, _body) = get(router_for("http://127.0.0.1:1/jwks"), "/v2/authorize").await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_unsupported_method_is_rejected() {
    let router = router_for("http://127.0.0.1:1/jwks");
    let response = router
        .oneshot(
            Request::delete("/v1/authorize")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
}
