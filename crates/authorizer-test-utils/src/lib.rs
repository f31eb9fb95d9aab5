//! # Authorizer Test Utilities
//!
//! Shared test utilities for the to-do service authorizer.
//!
//! This crate provides:
//! - Fixed RSA fixtures (keypairs, certificates, JWK shapes)
//! - Test token builders (TestTokenBuilder)
//! - A mock identity-provider JWKS endpoint (MockJwksServer)
//! - Server test harness (TestAuthorizerServer for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use authorizer_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() {
//!     let jwks = MockJwksServer::with_keys(vec![TestSigningKey::primary().jwk_x5c()]).await;
//!     let server = TestAuthorizerServer::spawn(&jwks.jwks_url()).await?;
//!
//!     let header = TestTokenBuilder::new().for_user("auth0|alice").bearer();
//!     // GET {server.url()}/v1/authorize with Authorization: {header}
//! }
//! ```

pub mod crypto_fixtures;
pub mod jwks_mock;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use jwks_mock::*;
pub use server_harness::*;
pub use token_builders::*;
