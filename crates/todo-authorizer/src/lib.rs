//! To-do Service Authorizer Library
//!
//! Bearer-token authorizer that sits in front of the to-do API. Each call
//! verifies an RS256 identity token against the identity provider's
//! published JWKS and answers with an allow or deny policy document.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> authorizer.rs -> auth/{jwks,jwt,pem}.rs
//! ```
//!
//! # Modules
//!
//! - `auth` - key-set resolution, PEM conversion, token verification
//! - `authorizer` - the allow/deny decision pipeline
//! - `config` - service configuration from environment
//! - `errors` - authorization failure kinds
//! - `handlers` - HTTP request handlers
//! - `middleware` - HTTP metrics middleware
//! - `models` - decision and event wire types
//! - `observability` - Prometheus metrics
//! - `routes` - Axum router setup

pub mod auth;
pub mod authorizer;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod routes;

pub use authorizer::Authorizer;
pub use errors::AuthError;
pub use models::AuthorizationDecision;
