//! # Authorizer Test Utilities
//!
//! Shared test utilities for the token authorizer.
//!
//! This crate provides:
//! - Fixed RSA signing keys with matching JWKs (`TestKeypair`)
//! - Claims builders and hostile-token helpers
//! - Mock identity-provider JWKS endpoints (`wiremock`)
//! - Server test harness (`TestAuthorizerServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authorizer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> anyhow::Result<()> {
//!     let keypair = TestKeypair::primary();
//!     let idp = MockServer::start().await;
//!     mount_jwks(&idp, &[&keypair]).await;
//!
//!     let server = TestAuthorizerServer::spawn(&jwks_url(&idp)).await?;
//!     let token = keypair.sign(&TestTokenBuilder::new().for_user("alice").build());
//!     // GET {server.url()}/v1/authorize with "Bearer {token}"
//!     Ok(())
//! }
//! ```

pub mod keys;
pub mod mock_jwks;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use keys::*;
pub use mock_jwks::*;
pub use server_harness::*;
pub use token_builders::*;
pub use wiremock::MockServer;
