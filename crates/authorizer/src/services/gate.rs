//! Authorization gate.
//!
//! Drives credential check -> decode -> verify and converts the outcome into
//! an access decision. The gate never fails: every error path becomes a Deny
//! decision, with the specific reason going only to the decision reporter.

use crate::auth::{Claims, JwksClient, JwtValidator};
use crate::config::Config;
use crate::errors::AuthError;
use crate::models::AuthorizerResponse;
use crate::observability::{DecisionEvent, DecisionReporter, TracingReporter};
use common::bearer::extract_bearer_token;
use common::jwt::decode_unverified;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::instrument;

/// Principal attached to every Deny decision.
pub const DENY_PRINCIPAL: &str = "user";

/// Turns credential headers into access decisions.
pub struct Authorizer {
    validator: JwtValidator,
    reporter: Arc<dyn DecisionReporter>,
}

impl Authorizer {
    /// Create a gate that verifies with `validator` and reports to `reporter`.
    pub fn new(validator: JwtValidator, reporter: Arc<dyn DecisionReporter>) -> Self {
        Self {
            validator,
            reporter,
        }
    }

    /// Build the gate from static configuration, reporting through `tracing`
    /// and Prometheus metrics.
    pub fn from_config(config: &Config, jwks_client: Arc<JwksClient>) -> Self {
        let validator = JwtValidator::new(
            jwks_client,
            config.jwt_algorithm,
            Duration::from_secs(config.jwt_clock_skew_seconds),
        )
        .with_issuer(config.jwt_issuer.clone())
        .with_audience(config.jwt_audience.clone());

        Self::new(validator, Arc::new(TracingReporter))
    }

    /// Decide whether the request carrying `header` may proceed.
    ///
    /// Always returns a well-formed decision; exactly one event is reported
    /// per call.
    #[instrument(skip_all, name = "authorize")]
    pub async fn authorize(&self, header: &str) -> AuthorizerResponse {
        let start = Instant::now();

        match self.evaluate(header).await {
            Ok(claims) => {
                let response = AuthorizerResponse::allow(claims.sub.as_str());
                self.reporter
                    .report(&DecisionEvent::allowed(claims.sub, start.elapsed()));
                response
            }
            Err(error) => {
                self.reporter
                    .report(&DecisionEvent::denied(error, start.elapsed()));
                AuthorizerResponse::deny(DENY_PRINCIPAL)
            }
        }
    }

    async fn evaluate(&self, header: &str) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(header)?;
        // Untrusted: only used to select the verification key
        let decoded = decode_unverified(token)?;
        self.validator.verify(token, &decoded).await
    }
}
