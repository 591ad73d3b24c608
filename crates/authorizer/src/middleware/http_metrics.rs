//! HTTP metrics middleware.
//!
//! Records every response, including framework-level rejections that never
//! reach a handler (404, 405, timeouts).

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records method, normalized path, status and duration.
///
/// Applied as the outermost layer.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    record_http_request(&method, &path, response.status().as_u16(), start.elapsed());

    response
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::{
        body::Body,
        http::{Request as HttpRequest, StatusCode},
        middleware,
        routing::get,
        Router,
    };
    use metrics_util::debugging::{DebugValue, DebuggingRecorder};
    use tower::ServiceExt;

    async fn handler_200() -> &'static str {
        "OK"
    }

    async fn handler_503() -> (StatusCode, &'static str) {
        (StatusCode::SERVICE_UNAVAILABLE, "not ready")
    }

    fn test_app() -> Router {
        Router::new()
            .route("/health", get(handler_200))
            .route("/ready", get(handler_503))
            .layer(middleware::from_fn(http_metrics_middleware))
    }

    async fn send(uri: &str) -> StatusCode {
        let request = HttpRequest::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .expect("request builder should succeed");

        let response = test_app()
            .oneshot(request)
            .await
            .expect("request should succeed");
        response.status()
    }

    /// Collect `(endpoint, status_code)` labels of the request counter.
    fn recorded_requests(recorder: &DebuggingRecorder) -> Vec<(String, String)> {
        recorder
            .snapshotter()
            .snapshot()
            .into_vec()
            .into_iter()
            .filter(|(key, _, _, value)| {
                key.key().name() == "authz_http_requests_total"
                    && matches!(value, DebugValue::Counter(_))
            })
            .map(|(key, _, _, _)| {
                let label = |name: &str| {
                    key.key()
                        .labels()
                        .find(|l| l.key() == name)
                        .map(|l| l.value().to_string())
                        .unwrap_or_default()
                };
                (label("endpoint"), label("status_code"))
            })
            .collect()
    }

    #[tokio::test]
    async fn test_middleware_records_success() {
        let recorder = DebuggingRecorder::new();
        let _guard = metrics::set_default_local_recorder(&recorder);

        assert_eq!(send("/health").await, StatusCode::OK);

        assert_eq!(
            recorded_requests(&recorder),
            vec![("/health".to_string(), "200".to_string())]
        );
    }

    #[tokio::test]
    async fn test_middleware_records_error() {
        let recorder = DebuggingRecorder::new();
        let _guard = metrics::set_default_local_recorder(&recorder);

        assert_eq!(send("/ready").await, StatusCode::SERVICE_UNAVAILABLE);

        assert_eq!(
            recorded_requests(&recorder),
            vec![("/ready".to_string(), "503".to_string())]
        );
    }

    #[tokio::test]
    async fn test_middleware_records_not_found_as_other() {
        let recorder = DebuggingRecorder::new();
        let _guard = metrics::set_default_local_recorder(&recorder);

        assert_eq!(send("/nonexistent/path").await, StatusCode::NOT_FOUND);

        assert_eq!(
            recorded_requests(&recorder),
            vec![("/other".to_string(), "404".to_string())]
        );
    }
}
