//! JWT signature verification.
//!
//! Verifies tokens using RSA public keys fetched from the identity provider's
//! JWKS endpoint.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (via `common::jwt`)
//! - The declared `alg` must equal the single configured algorithm; the
//!   token never chooses how it is verified
//! - The selected key must be an RSA signing key that agrees with that algorithm
//! - `exp` is required, `nbf` is enforced when present
//! - The unverified payload is never read for decisions

use crate::auth::claims::Claims;
use crate::auth::jwks::{Jwk, JwksClient};
use crate::errors::AuthError;
use common::jwt::{decode_unverified, DecodedToken};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::str::FromStr;
use std::sync::Arc;
use std::time::Duration;
use tracing::instrument;

/// JWT validator using JWKS from the identity provider.
pub struct JwtValidator {
    /// JWKS client for fetching public keys.
    jwks_client: Arc<JwksClient>,

    /// The only algorithm accepted.
    algorithm: Algorithm,

    /// Leeway for exp/nbf validation.
    clock_skew: Duration,

    /// Required issuer, if any.
    issuer: Option<String>,

    /// Required audience, if any.
    audience: Option<String>,
}

impl JwtValidator {
    /// Create a new JWT validator.
    ///
    /// # Arguments
    ///
    /// * `jwks_client` - Client for fetching public keys
    /// * `algorithm` - The single accepted signing algorithm (RSA family)
    /// * `clock_skew` - Leeway for exp/nbf validation
    pub fn new(jwks_client: Arc<JwksClient>, algorithm: Algorithm, clock_skew: Duration) -> Self {
        Self {
            jwks_client,
            algorithm,
            clock_skew,
            issuer: None,
            audience: None,
        }
    }

    /// Require the `iss` claim to equal `issuer`.
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Require the `aud` claim to contain `audience`.
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    /// Decode and verify a token in one step.
    ///
    /// # Errors
    ///
    /// `MalformedToken` if decoding fails, otherwise any error from [`Self::verify`].
    pub async fn validate(&self, token: &str) -> Result<Claims, AuthError> {
        let decoded = decode_unverified(token)?;
        self.verify(token, &decoded).await
    }

    /// Verify a token whose header has already been decoded.
    ///
    /// # Security Checks
    ///
    /// 1. Declared algorithm must be the configured one
    /// 2. Key ID must be present and resolve to a published key
    /// 3. Key must be an RSA signing key compatible with the algorithm
    /// 4. Signature must verify
    /// 5. exp (required) and nbf (when present) checked against now
    /// 6. iss/aud checked when configured
    ///
    /// # Errors
    ///
    /// Returns the specific `AuthError`; every error means no trust is granted.
    #[instrument(skip_all)]
    pub async fn verify(&self, token: &str, decoded: &DecodedToken) -> Result<Claims, AuthError> {
        // 1. Cross-check the declared algorithm against the allow-list
        let declared = Algorithm::from_str(&decoded.header.alg).ok();
        if declared != Some(self.algorithm) {
            tracing::debug!(
                target: "authz.jwt",
                alg = %decoded.header.alg,
                "Token algorithm not allowed"
            );
            return Err(AuthError::AlgorithmNotAllowed);
        }

        // 2. Resolve the signing key
        let kid = decoded.kid().map_err(|e| {
            tracing::debug!(target: "authz.jwt", error = ?e, "Token kid extraction failed");
            AuthError::MalformedToken
        })?;
        let jwk = self.jwks_client.get_key(kid).await?;

        // 3-6. Convert key, verify signature and claims
        let claims = verify_token(token, &jwk, &self.validation())?;

        tracing::debug!(target: "authz.jwt", "Token validated successfully");
        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(self.algorithm);
        validation.leeway = self.clock_skew.as_secs();
        validation.validate_exp = true;
        validation.validate_nbf = true;

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
        }

        match &self.audience {
            Some(audience) => validation.set_audience(&[audience]),
            None => validation.validate_aud = false,
        }

        validation
    }
}

/// Build an RSA decoding key from a JWK, checking it fits `algorithm`.
///
/// # Errors
///
/// Returns `AuthError::SignatureInvalid` if the key is not an RSA signing
/// key for `algorithm` or its components do not decode.
pub fn decoding_key_from_jwk(jwk: &Jwk, algorithm: Algorithm) -> Result<DecodingKey, AuthError> {
    if jwk.kty != "RSA" {
        tracing::warn!(target: "authz.jwt", kty = %jwk.kty, "Unexpected JWK key type");
        return Err(AuthError::SignatureInvalid);
    }

    if let Some(key_use) = &jwk.key_use {
        if key_use != "sig" {
            tracing::warn!(target: "authz.jwt", key_use = %key_use, "JWK is not a signing key");
            return Err(AuthError::SignatureInvalid);
        }
    }

    if let Some(alg) = &jwk.alg {
        if Algorithm::from_str(alg).ok() != Some(algorithm) {
            tracing::warn!(target: "authz.jwt", alg = %alg, "Unexpected JWK algorithm");
            return Err(AuthError::SignatureInvalid);
        }
    }

    let (Some(n), Some(e)) = (jwk.n.as_deref(), jwk.e.as_deref()) else {
        tracing::error!(target: "authz.jwt", kid = %jwk.kid, "JWK missing RSA components");
        return Err(AuthError::SignatureInvalid);
    };

    DecodingKey::from_rsa_components(n, e).map_err(|e| {
        tracing::error!(target: "authz.jwt", error = %e, "Invalid RSA key encoding");
        AuthError::SignatureInvalid
    })
}

/// Verify JWT signature and time claims, and extract claims.
fn verify_token(token: &str, jwk: &Jwk, validation: &Validation) -> Result<Claims, AuthError> {
    let algorithm = validation
        .algorithms
        .first()
        .copied()
        .ok_or(AuthError::AlgorithmNotAllowed)?;
    let decoding_key = decoding_key_from_jwk(jwk, algorithm)?;

    let token_data = decode::<Claims>(token, &decoding_key, validation).map_err(|e| {
        tracing::debug!(target: "authz.jwt", error = %e, "Token verification failed");
        match e.kind() {
            ErrorKind::ExpiredSignature => AuthError::TokenExpired,
            ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
            ErrorKind::InvalidIssuer => AuthError::InvalidClaims("issuer mismatch".to_string()),
            ErrorKind::InvalidAudience => {
                AuthError::InvalidClaims("audience mismatch".to_string())
            }
            ErrorKind::MissingRequiredClaim(claim) => {
                AuthError::InvalidClaims(format!("missing {} claim", claim))
            }
            ErrorKind::InvalidAlgorithm => AuthError::AlgorithmNotAllowed,
            // Signature already verified; the payload lacks a required claim
            ErrorKind::Json(_) => AuthError::InvalidClaims("malformed claims".to_string()),
            _ => AuthError::SignatureInvalid,
        }
    })?;

    if token_data.claims.sub.is_empty() {
        tracing::debug!(target: "authz.jwt", "Token has empty subject");
        return Err(AuthError::InvalidClaims("empty subject".to_string()));
    }

    Ok(token_data.claims)
}
