//! Authorizer error types.
//!
//! Every variant is terminal for the request and collapses to the same
//! caller-visible outcome: a Deny decision. The variant itself only reaches
//! the internal decision report, never the caller.

use common::bearer::CredentialError;
use common::jwt::JwtValidationError;
use thiserror::Error;

/// Reasons an authorization check can fail.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("No authentication header")]
    MissingCredential,

    #[error("Invalid authentication header")]
    InvalidCredentialShape,

    #[error("Token is malformed")]
    MalformedToken,

    #[error("Signing key not found in key set")]
    SigningKeyNotFound,

    #[error("Key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("Token algorithm is not allowed")]
    AlgorithmNotAllowed,

    #[error("Token signature is invalid")]
    SignatureInvalid,

    #[error("Token has expired")]
    TokenExpired,

    #[error("Token is not yet valid")]
    TokenNotYetValid,

    #[error("Token claims rejected: {0}")]
    InvalidClaims(String),
}

impl AuthError {
    /// Stable, bounded label for reports and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingCredential => "missing_credential",
            AuthError::InvalidCredentialShape => "invalid_credential_shape",
            AuthError::MalformedToken => "malformed_token",
            AuthError::SigningKeyNotFound => "signing_key_not_found",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::AlgorithmNotAllowed => "algorithm_not_allowed",
            AuthError::SignatureInvalid => "signature_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::InvalidClaims(_) => "invalid_claims",
        }
    }

    /// Whether the failure reflects infrastructure trouble rather than a bad
    /// credential.
    pub fn is_transient(&self) -> bool {
        matches!(self, AuthError::KeySetUnavailable(_))
    }
}

impl From<CredentialError> for AuthError {
    fn from(err: CredentialError) -> Self {
        match err {
            CredentialError::Missing => AuthError::MissingCredential,
            CredentialError::InvalidShape => AuthError::InvalidCredentialShape,
        }
    }
}

/// Oversized tokens and tokens without a `kid` cannot be verified, so they
/// are reported as malformed.
impl From<JwtValidationError> for AuthError {
    fn from(_: JwtValidationError) -> Self {
        AuthError::MalformedToken
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_reason_labels_are_unique() {
        let errors = [
            AuthError::MissingCredential,
            AuthError::InvalidCredentialShape,
            AuthError::MalformedToken,
            AuthError::SigningKeyNotFound,
            AuthError::KeySetUnavailable("down".to_string()),
            AuthError::AlgorithmNotAllowed,
            AuthError::SignatureInvalid,
            AuthError::TokenExpired,
            AuthError::TokenNotYetValid,
            AuthError::InvalidClaims("aud".to_string()),
        ];

        let mut labels: Vec<&str> = errors.iter().map(AuthError::reason).collect();
        labels.sort_unstable();
        labels.dedup();
        assert_eq!(labels.len(), errors.len());
    }

    #[test]
    fn test_only_key_set_unavailable_is_transient() {
        assert!(AuthError::KeySetUnavailable("timeout".to_string()).is_transient());
        assert!(!AuthError::SignatureInvalid.is_transient());
        assert!(!AuthError::SigningKeyNotFound.is_transient());
        assert!(!AuthError::TokenExpired.is_transient());
    }

    #[test]
    fn test_from_credential_error() {
        assert_eq!(
            AuthError::from(CredentialError::Missing),
            AuthError::MissingCredential
        );
        assert_eq!(
            AuthError::from(CredentialError::InvalidShape),
            AuthError::InvalidCredentialShape
        );
    }

    #[test]
    fn test_from_jwt_validation_error_is_malformed() {
        assert_eq!(
            AuthError::from(JwtValidationError::TokenTooLarge),
            AuthError::MalformedToken
        );
        assert_eq!(
            AuthError::from(JwtValidationError::MissingKid),
            AuthError::MalformedToken
        );
        assert_eq!(
            AuthError::from(JwtValidationError::MalformedToken),
            AuthError::MalformedToken
        );
    }

    #[test]
    fn test_error_display() {
        assert_eq!(
            AuthError::MissingCredential.to_string(),
            "No authentication header"
        );
        assert_eq!(
            AuthError::KeySetUnavailable("HTTP 503".to_string()).to_string(),
            "Key set unavailable: HTTP 503"
        );
    }
}
