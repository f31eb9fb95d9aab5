//! Authorizer error types.
//!
//! Every variant is handled inside [`crate::authorizer::Authorizer`] and
//! collapsed into a deny decision. Messages are for server-side logs only and
//! never reach the gateway.

use common::jwt::JwtValidationError;
use thiserror::Error;

/// Reasons an authorization attempt can fail.
///
/// [`AuthError::kind`] gives a bounded label for logs and metrics.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum AuthError {
    #[error("Missing or malformed Authorization header: {0}")]
    MissingOrMalformedHeader(String),

    #[error("Malformed token: {0}")]
    MalformedToken(String),

    #[error("Unsupported token algorithm: {0}")]
    UnsupportedAlgorithm(String),

    #[error("Signing key set unavailable: {0}")]
    KeySetUnavailable(String),

    #[error("Unable to find a signing key that matches '{0}'")]
    SigningKeyNotFound(String),

    #[error("Token signature invalid: {0}")]
    SignatureInvalid(String),

    #[error("Token expired")]
    TokenExpired,

    #[error("Token not yet valid")]
    TokenNotYetValid,

    #[error("Token claims rejected: {0}")]
    ClaimsRejected(String),
}

impl AuthError {
    /// Bounded, stable label for this failure (metrics label / log field).
    pub fn kind(&self) -> &'static str {
        match self {
            AuthError::MissingOrMalformedHeader(_) => "missing_or_malformed_header",
            AuthError::MalformedToken(_) => "malformed_token",
            AuthError::UnsupportedAlgorithm(_) => "unsupported_algorithm",
            AuthError::KeySetUnavailable(_) => "key_set_unavailable",
            AuthError::SigningKeyNotFound(_) => "signing_key_not_found",
            AuthError::SignatureInvalid(_) => "signature_invalid",
            AuthError::TokenExpired => "token_expired",
            AuthError::TokenNotYetValid => "token_not_yet_valid",
            AuthError::ClaimsRejected(_) => "claims_rejected",
        }
    }
}

impl From<JwtValidationError> for AuthError {
    fn from(err: JwtValidationError) -> Self {
        match err {
            JwtValidationError::TokenTooLarge => {
                AuthError::MalformedToken("token exceeds maximum size".to_string())
            }
            JwtValidationError::MalformedToken => {
                AuthError::MalformedToken("token is not a compact JWS".to_string())
            }
            JwtValidationError::MissingKid => {
                AuthError::MalformedToken("token header has no kid".to_string())
            }
            JwtValidationError::Expired => AuthError::TokenExpired,
            JwtValidationError::NotYetValid | JwtValidationError::IatTooFarInFuture => {
                AuthError::TokenNotYetValid
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_labels_are_distinct() {
        let errors = [
            AuthError::MissingOrMalformedHeader(String::new()),
            AuthError::MalformedToken(String::new()),
            AuthError::UnsupportedAlgorithm(String::new()),
            AuthError::KeySetUnavailable(String::new()),
            AuthError::SigningKeyNotFound(String::new()),
            AuthError::SignatureInvalid(String::new()),
            AuthError::TokenExpired,
            AuthError::TokenNotYetValid,
            AuthError::ClaimsRejected(String::new()),
        ];

        let mut kinds: Vec<&str> = errors.iter().map(AuthError::kind).collect();
        kinds.sort_unstable();
        kinds.dedup();
        assert_eq!(kinds.len(), errors.len());
    }

    #[test]
    fn test_structural_errors_map_to_malformed_token() {
        for err in [
            JwtValidationError::TokenTooLarge,
            JwtValidationError::MalformedToken,
            JwtValidationError::MissingKid,
        ] {
            assert_eq!(AuthError::from(err).kind(), "malformed_token");
        }
    }

    #[test]
    fn test_time_errors_keep_their_kind() {
        assert_eq!(
            AuthError::from(JwtValidationError::Expired),
            AuthError::TokenExpired
        );
        assert_eq!(
            AuthError::from(JwtValidationError::NotYetValid),
            AuthError::TokenNotYetValid
        );
        assert_eq!(
            AuthError::from(JwtValidationError::IatTooFarInFuture),
            AuthError::TokenNotYetValid
        );
    }

    #[test]
    fn test_signing_key_not_found_message_names_kid() {
        let err = AuthError::SigningKeyNotFound("B".to_string());
        assert_eq!(
            err.to_string(),
            "Unable to find a signing key that matches 'B'"
        );
    }
}
