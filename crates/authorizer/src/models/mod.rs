//! Authorizer models.
//!
//! Contains the decision document returned to the routing layer and the
//! request shapes accepted from it.

use serde::{Deserialize, Serialize};

/// Policy language version understood by the routing layer.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The single permission a decision grants or denies.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Decisions apply to every resource behind the routing layer.
pub const WILDCARD_RESOURCE: &str = "*";

/// Access decision outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    /// Returns the string representation of the effect.
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "Allow",
            Effect::Deny => "Deny",
        }
    }
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

/// Policy document attached to a decision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

impl PolicyDocument {
    /// Policy with a single wildcard invoke statement.
    pub fn invoke(effect: Effect) -> Self {
        Self {
            version: POLICY_VERSION.to_string(),
            statement: vec![Statement {
                action: INVOKE_ACTION.to_string(),
                effect,
                resource: WILDCARD_RESOURCE.to_string(),
            }],
        }
    }

    /// The effect of the (single) statement. An empty policy denies.
    pub fn effect(&self) -> Effect {
        self.statement
            .first()
            .map_or(Effect::Deny, |statement| statement.effect)
    }
}

/// Access decision returned for every authorization request.
///
/// Produced exactly once per request and never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerResponse {
    /// Verified subject on Allow, a fixed placeholder on Deny.
    pub principal_id: String,

    pub policy_document: PolicyDocument,
}

impl AuthorizerResponse {
    /// Allow decision for a verified principal.
    pub fn allow(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_document: PolicyDocument::invoke(Effect::Allow),
        }
    }

    /// Deny decision attributed to `principal_id`.
    pub fn deny(principal_id: impl Into<String>) -> Self {
        Self {
            principal_id: principal_id.into(),
            policy_document: PolicyDocument::invoke(Effect::Deny),
        }
    }

    pub fn effect(&self) -> Effect {
        self.policy_document.effect()
    }

    pub fn is_allowed(&self) -> bool {
        self.effect() == Effect::Allow
    }
}

/// Token authorizer event sent by the routing layer.
///
/// All fields are optional; a missing `authorizationToken` is treated as an
/// empty credential header.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizeRequest {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub event_type: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authorization_token: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method_arn: Option<String>,
}

/// Readiness check response.
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// Identity provider JWKS reachability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<&'static str>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<&'static str>,
}
