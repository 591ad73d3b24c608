//! Unverified JWT decoding.
//!
//! This module splits a compact JWS (`header.payload.signature`) into its
//! parts and parses the header and payload JSON. It exists so that the
//! verifier can read the `kid` and `alg` needed to pick a verification key.
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - Nothing returned from here is trusted: the payload must never feed an
//!   access decision until the signature has been verified
//! - `alg` is kept as a raw string so `none` and unknown algorithms decode
//!   and are rejected by the verifier's allow-list, not by the parser
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::decode_unverified;
//!
//! let decoded = decode_unverified(token)?;
//! let key = jwks_client.get_key(decoded.kid()?).await?;
//! // ...verify the signature with `key` before trusting anything
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this are rejected BEFORE any base64 decoding or
/// cryptographic work. Identity-provider access tokens are typically
/// well under 2KB.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default leeway applied to `exp` and `nbf` checks.
///
/// Zero: a token that expired one second ago is rejected.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum allowed leeway for `exp`/`nbf` validation (10 minutes).
///
/// Prevents misconfiguration from silently extending token lifetimes.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while decoding a JWT without verifying it.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("Token exceeds maximum size")]
    TokenTooLarge,

    /// Token is not a three-segment base64url JSON structure.
    #[error("Token is malformed")]
    MalformedToken,

    /// Token header carries no usable `kid`.
    #[error("Token header has no key id")]
    MissingKid,
}

// =============================================================================
// Decoded Token Types
// =============================================================================

/// JOSE header fields the authorizer cares about.
///
/// Unknown header members are ignored.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TokenHeader {
    /// Declared signing algorithm, verbatim. Untrusted.
    pub alg: String,

    /// Key ID naming the published key that signed the token.
    #[serde(default)]
    pub kid: Option<String>,

    /// Media type, usually `JWT`.
    #[serde(default)]
    pub typ: Option<String>,
}

/// Claims read from a token whose signature has NOT been checked.
pub type UnverifiedClaims = serde_json::Map<String, serde_json::Value>;

/// A token split into its three parts. Produced by parsing only.
#[derive(Debug, Clone)]
pub struct DecodedToken {
    /// Parsed JOSE header.
    pub header: TokenHeader,

    /// Parsed payload. Untrusted until verified.
    pub claims: UnverifiedClaims,

    /// Raw signature bytes.
    pub signature: Vec<u8>,
}

impl DecodedToken {
    /// Key ID from the header, rejecting absent or empty values.
    ///
    /// # Errors
    ///
    /// Returns `JwtValidationError::MissingKid` when the header has no
    /// non-empty `kid`.
    pub fn kid(&self) -> Result<&str, JwtValidationError> {
        self.header
            .kid
            .as_deref()
            .filter(|kid| !kid.is_empty())
            .ok_or(JwtValidationError::MissingKid)
    }
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a compact JWT into header, claims and signature without verifying it.
///
/// # Errors
///
/// - `TokenTooLarge` - token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - wrong segment count, empty segment, bad base64url,
///   header or payload not a JSON object, header without a string `alg`
pub fn decode_unverified(token: &str) -> Result<DecodedToken, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    let mut parts = token.split('.');
    let (Some(header_part), Some(payload_part), Some(signature_part), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtValidationError::MalformedToken);
    };

    let header_bytes = decode_segment(header_part, "header")?;
    let payload_bytes = decode_segment(payload_part, "payload")?;
    let signature = decode_segment(signature_part, "signature")?;

    let header: TokenHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtValidationError::MalformedToken
    })?;

    let claims: UnverifiedClaims = serde_json::from_slice(&payload_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT payload JSON");
        JwtValidationError::MalformedToken
    })?;

    Ok(DecodedToken {
        header,
        claims,
        signature,
    })
}

fn decode_segment(segment: &str, name: &'static str) -> Result<Vec<u8>, JwtValidationError> {
    if segment.is_empty() {
        tracing::debug!(target: "common.jwt", segment = name, "Token rejected: empty segment");
        return Err(JwtValidationError::MalformedToken);
    }

    URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = name, error = %e, "Failed to decode JWT base64");
        JwtValidationError::MalformedToken
    })
}

// =============================================================================
// Tests
// =============================================================================
