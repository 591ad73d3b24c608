//! Token verification.
//!
//! Resolves the identity provider's signing keys and verifies bearer tokens
//! against them.
//!
//! # Components
//!
//! - `jwks` - JWKS client with caching and single-flight refresh
//! - `jwt` - JWT validator (algorithm allow-list, signature, time claims)
//! - `claims` - Claims extracted from verified tokens

pub mod claims;
pub mod jwks;
pub mod jwt;

pub use claims::Claims;
pub use jwks::{Jwk, JwkSet, JwksClient};
pub use jwt::JwtValidator;
