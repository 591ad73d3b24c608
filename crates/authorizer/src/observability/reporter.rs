//! Decision reporting.
//!
//! The gate hands every outcome to a [`DecisionReporter`]. Reporting is
//! synchronous and infallible so it cannot block or change a decision.

use crate::errors::AuthError;
use crate::models::Effect;
use crate::observability::metrics::record_authorization;
use std::time::Duration;

/// Structured record of one authorization decision.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecisionEvent {
    /// Allow or Deny.
    pub effect: Effect,

    /// Verified subject, only known on Allow.
    pub principal: Option<String>,

    /// Why the request was denied.
    pub error: Option<AuthError>,

    /// Time from receiving the header to the decision.
    pub duration: Duration,
}

impl DecisionEvent {
    /// Event for a verified token issued to `principal`.
    pub fn allowed(principal: String, duration: Duration) -> Self {
        Self {
            effect: Effect::Allow,
            principal: Some(principal),
            error: None,
            duration,
        }
    }

    /// Event for a request rejected with `error`.
    pub fn denied(error: AuthError, duration: Duration) -> Self {
        Self {
            effect: Effect::Deny,
            principal: None,
            error: Some(error),
            duration,
        }
    }

    /// Bounded reason label, `ok` for Allow.
    pub fn reason(&self) -> &'static str {
        self.error.as_ref().map_or("ok", AuthError::reason)
    }
}

/// Receives every decision the gate makes.
pub trait DecisionReporter: Send + Sync {
    fn report(&self, event: &DecisionEvent);
}

/// Reports decisions as `tracing` events and Prometheus metrics.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl DecisionReporter for TracingReporter {
    fn report(&self, event: &DecisionEvent) {
        record_authorization(event.effect.as_str(), event.reason(), event.duration);

        match &event.error {
            None => {
                tracing::info!(
                    target: "authz.gate",
                    effect = event.effect.as_str(),
                    duration = ?event.duration,
                    "Request allowed"
                );
                tracing::debug!(
                    target: "authz.gate",
                    principal = event.principal.as_deref().unwrap_or_default(),
                    "Allowed principal"
                );
            }
            Some(error) if error.is_transient() => {
                tracing::warn!(
                    target: "authz.gate",
                    effect = event.effect.as_str(),
                    reason = event.reason(),
                    error = %error,
                    "Request denied, key set unavailable"
                );
            }
            Some(error) => {
                tracing::info!(
                    target: "authz.gate",
                    effect = event.effect.as_str(),
                    reason = event.reason(),
                    error = %error,
                    "Request denied"
                );
            }
        }
    }
}
