//! Token primitives shared by the authorizer and its test utilities.
//!
//! Everything in this crate is pure and synchronous: no network access,
//! no cryptography, no trust decisions.

#![warn(clippy::pedantic)]

/// Module for parsing the `Authorization: Bearer <token>` credential header
pub mod bearer;

/// Module for unverified JWT decoding, size limits and clock skew constants
pub mod jwt;
