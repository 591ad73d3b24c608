//! Mock identity-provider JWKS endpoint.
//!
//! Thin helpers over `wiremock` for publishing test keys.

use crate::keys::TestKeypair;
use serde_json::{json, Value};
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock identity provider serves its key set on.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// Full JWKS URL of `server`.
pub fn jwks_url(server: &MockServer) -> String {
    format!("{}{}", server.uri(), JWKS_PATH)
}

/// JWKS document publishing the public halves of `keys`.
pub fn jwks_document(keys: &[&TestKeypair]) -> Value {
    json!({
        "keys": keys.iter().map(|key| key.jwk_json()).collect::<Vec<_>>()
    })
}

/// Serve `keys` on [`JWKS_PATH`].
pub async fn mount_jwks(server: &MockServer, keys: &[&TestKeypair]) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
        .mount(server)
        .await;
}

/// Serve `keys` and verify on drop that exactly `times` fetches happened.
pub async fn mount_jwks_expecting(server: &MockServer, keys: &[&TestKeypair], times: u64) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(200).set_body_json(jwks_document(keys)))
        .expect(times)
        .mount(server)
        .await;
}

/// Answer every JWKS fetch with `status`.
pub async fn mount_jwks_failure(server: &MockServer, status: u16) {
    Mock::given(method("GET"))
        .and(path(JWKS_PATH))
        .respond_with(ResponseTemplate::new(status))
        .mount(server)
        .await;
}

/// Number of JWKS fetches `server` has received so far.
pub async fn jwks_fetch_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| {
            requests
                .iter()
                .filter(|request| request.url.path() == JWKS_PATH)
                .count()
        })
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_jwks_document_lists_keys() {
        let primary = TestKeypair::primary();
        let secondary = TestKeypair::secondary();

        let document = jwks_document(&[&primary, &secondary]);

        let keys = document["keys"].as_array().unwrap();
        assert_eq!(keys.len(), 2);
        assert_eq!(keys[0]["kid"], "test-key-01");
        assert_eq!(keys[1]["kid"], "test-key-02");
        assert_eq!(keys[0]["kty"], "RSA");
    }

    #[test]
    fn test_empty_jwks_document() {
        let document = jwks_document(&[]);
        assert_eq!(document, json!({"keys": []}));
    }
}
