//! Credential header parsing.
//!
//! The routing layer hands the authorizer the raw value of the
//! `Authorization` header. The only accepted scheme is `Bearer`, matched
//! case-insensitively, followed by a single space and the token.

use thiserror::Error;

/// Scheme prefix, including the separating space.
const BEARER_PREFIX: &str = "bearer ";

/// Errors produced while parsing the credential header.
#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum CredentialError {
    /// The header is absent or blank.
    #[error("No authentication header")]
    Missing,

    /// The header does not use the `Bearer` scheme.
    #[error("Invalid authentication header")]
    InvalidShape,
}

/// Extract the encoded token from a `Bearer <token>` header value.
///
/// The returned slice is everything after the scheme prefix, verbatim. It
/// may be empty (`"Bearer "`); rejecting an empty token is the decoder's job.
///
/// # Errors
///
/// - `CredentialError::Missing` - header is empty or whitespace only
/// - `CredentialError::InvalidShape` - header is not prefixed with `bearer `
///   (case-insensitive)
pub fn extract_bearer_token(header: &str) -> Result<&str, CredentialError> {
    if header.trim().is_empty() {
        return Err(CredentialError::Missing);
    }

    // `get` keeps this panic-free when byte 7 is not a char boundary
    let scheme = header
        .get(..BEARER_PREFIX.len())
        .ok_or(CredentialError::InvalidShape)?;
    if !scheme.eq_ignore_ascii_case(BEARER_PREFIX) {
        tracing::debug!(target: "common.bearer", "Credential header is not a bearer credential");
        return Err(CredentialError::InvalidShape);
    }

    header
        .get(BEARER_PREFIX.len()..)
        .ok_or(CredentialError::InvalidShape)
}
