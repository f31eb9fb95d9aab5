//! Token authentication against the identity provider's published keys.
//!
//! # Components
//!
//! - `pem` - PEM armoring of JWKS key material
//! - `jwks` - key-set fetch and signing-key filtering
//! - `jwt` - RS256 signature and claim verification
//! - `claims` - claims of a verified token

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod pem;

pub use claims::Claims;
pub use jwks::{JwksResolver, SigningKey, SigningKeyProvider, SigningKeys};
pub use jwt::TokenVerifier;
