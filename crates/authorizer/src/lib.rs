//! Token Authorizer Service Library
//!
//! A stateless gate that turns an inbound bearer token into an Allow/Deny
//! decision for a request-routing layer:
//!
//! - Bearer credential shape checks
//! - Unverified decode to find the signing key id
//! - Signing-key resolution from the identity provider's JWKS (cached)
//! - RSA signature and time-claim verification
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> services/gate.rs -> auth/{jwt,jwks}.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - JWKS client, JWT validator, claims
//! - `config` - Service configuration from environment
//! - `errors` - Authorization failure taxonomy
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - Decision document and request types
//! - `observability` - Metrics and decision reporting
//! - `routes` - Axum router setup
//! - `services` - Authorization gate

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;
pub mod services;
