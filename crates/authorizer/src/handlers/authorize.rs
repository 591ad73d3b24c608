//! Authorization decision handlers.
//!
//! Both endpoints always answer 200 with a decision document. A Deny is a
//! decision for the routing layer to enforce, not a transport error, and the
//! reason for it is never echoed back.

use crate::models::{AuthorizeRequest, AuthorizerResponse};
use crate::routes::AppState;
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{header, HeaderMap};
use axum::Json;
use std::sync::Arc;

/// Handler for POST /v1/authorize
///
/// Accepts a token authorizer event:
/// ```json
/// { "type": "TOKEN", "authorizationToken": "Bearer ...", "methodArn": "..." }
/// ```
/// A body that is not such an event is treated as carrying no credential.
#[tracing::instrument(skip_all, name = "authz.handler.event")]
pub async fn authorize_event(
    State(state): State<Arc<AppState>>,
    body: Bytes,
) -> Json<AuthorizerResponse> {
    let request: AuthorizeRequest = serde_json::from_slice(&body).unwrap_or_else(|e| {
        tracing::debug!(target: "authz.gate", error = %e, "Unparseable authorizer event");
        AuthorizeRequest::default()
    });

    let header = request.authorization_token.unwrap_or_default();
    Json(state.authorizer.authorize(&header).await)
}

/// Handler for GET /v1/authorize
///
/// Decides on the request's own `Authorization` header.
#[tracing::instrument(skip_all, name = "authz.handler.header")]
pub async fn authorize_header(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<AuthorizerResponse> {
    let header = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .unwrap_or_default();

    Json(state.authorizer.authorize(header).await)
}
