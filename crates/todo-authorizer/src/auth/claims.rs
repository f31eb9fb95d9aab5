//! JWT claims structure.
//!
//! Contains the claims extracted from verified tokens. The `sub` field is
//! redacted in Debug output to prevent exposure in logs.

use common::jwt::TimeClaims;
use serde::{Deserialize, Serialize};
use std::fmt;

/// `aud` is either a single string or an array of strings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Audience {
    Single(String),
    Many(Vec<String>),
}

/// Claims of a verified identity token.
///
/// The `sub` field identifies the end user and becomes the principal of an
/// allow decision. A custom Debug implementation redacts it.
#[derive(Clone, Serialize, Deserialize)]
pub struct Claims {
    /// Subject (user identifier) - redacted in Debug output.
    pub sub: String,

    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Issued-at timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iat: Option<i64>,

    /// Not-before timestamp (Unix epoch seconds).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nbf: Option<i64>,

    /// Intended audience(s).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aud: Option<Audience>,

    /// Issuer.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iss: Option<String>,
}

/// Custom Debug implementation that redacts the `sub` field.
impl fmt::Debug for Claims {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Claims")
            .field("sub", &"[REDACTED]")
            .field("exp", &self.exp)
            .field("iat", &self.iat)
            .field("nbf", &self.nbf)
            .field("aud", &self.aud)
            .field("iss", &self.iss)
            .finish()
    }
}

impl Claims {
    /// The registered time-bound claims.
    pub fn time_claims(&self) -> TimeClaims {
        TimeClaims {
            exp: self.exp,
            nbf: self.nbf,
            iat: self.iat,
        }
    }
}
