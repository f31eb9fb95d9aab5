//! RS256 signature and claim verification.
//!
//! # Security
//!
//! - Only RS256 is accepted; the caller has already rejected any other `alg`
//! - The signature is checked before any claim is trusted
//! - `exp`/`nbf`/`iat` are checked here with an explicit clock skew instead
//!   of the library's default leeway
//! - `aud`/`iss` are checked only when configured

use crate::auth::claims::Claims;
use crate::errors::AuthError;
use common::jwt::{validate_time_claims_at, DEFAULT_CLOCK_SKEW};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use std::time::Duration;

/// Verifies a compact token against a PEM public key.
#[derive(Debug, Clone)]
pub struct TokenVerifier {
    /// Clock skew tolerance for time-bound claims.
    clock_skew: Duration,

    /// Expected `aud`, if any.
    audience: Option<String>,

    /// Expected `iss`, if any.
    issuer: Option<String>,
}

impl Default for TokenVerifier {
    fn default() -> Self {
        Self::new(DEFAULT_CLOCK_SKEW)
    }
}

impl TokenVerifier {
    pub fn new(clock_skew: Duration) -> Self {
        Self {
            clock_skew,
            audience: None,
            issuer: None,
        }
    }

    /// Require `aud` to contain `audience`.
    pub fn with_audience(mut self, audience: Option<String>) -> Self {
        self.audience = audience;
        self
    }

    /// Require `iss` to equal `issuer`.
    pub fn with_issuer(mut self, issuer: Option<String>) -> Self {
        self.issuer = issuer;
        self
    }

    /// Verify against the current wall clock.
    ///
    /// # Errors
    ///
    /// See [`TokenVerifier::verify_at`].
    pub fn verify(&self, token: &str, public_key_pem: &str) -> Result<Claims, AuthError> {
        self.verify_at(token, public_key_pem, chrono::Utc::now().timestamp())
    }

    /// Verify the signature with `public_key_pem`, then the claims at `now`.
    ///
    /// # Errors
    ///
    /// - `SignatureInvalid` - the key is unusable or the signature does not match
    /// - `TokenExpired` - `now >= exp + clock_skew`
    /// - `TokenNotYetValid` - `nbf` or `iat` lies beyond the skew window
    /// - `ClaimsRejected` - claims missing, mistyped, or failing `aud`/`iss`
    pub fn verify_at(
        &self,
        token: &str,
        public_key_pem: &str,
        now: i64,
    ) -> Result<Claims, AuthError> {
        let decoding_key = DecodingKey::from_rsa_pem(public_key_pem.as_bytes()).map_err(|e| {
            tracing::warn!(target: "authorizer.jwt", error = %e, "Signing key is not a usable RSA public key");
            AuthError::SignatureInvalid("signing key is not a usable RSA public key".to_string())
        })?;

        let token_data =
            decode::<Claims>(token, &decoding_key, &self.validation()).map_err(|e| {
                tracing::debug!(target: "authorizer.jwt", error = %e, "Token verification failed");
                map_verification_error(e.kind())
            })?;
        let claims = token_data.claims;

        validate_time_claims_at(&claims.time_claims(), self.clock_skew, now)?;

        if claims.sub.trim().is_empty() {
            tracing::debug!(target: "authorizer.jwt", "Token has empty subject");
            return Err(AuthError::ClaimsRejected("sub is empty".to_string()));
        }

        tracing::debug!(target: "authorizer.jwt", "Token verified successfully");
        Ok(claims)
    }

    fn validation(&self) -> Validation {
        let mut validation = Validation::new(Algorithm::RS256);
        // Time claims are checked by validate_time_claims_at
        validation.validate_exp = false;
        validation.validate_nbf = false;
        validation.leeway = 0;

        match &self.audience {
            Some(audience) => {
                validation.set_audience(&[audience]);
                validation.required_spec_claims.insert("aud".to_string());
            }
            None => validation.validate_aud = false,
        }

        if let Some(issuer) = &self.issuer {
            validation.set_issuer(&[issuer]);
            validation.required_spec_claims.insert("iss".to_string());
        }

        validation
    }
}

fn map_verification_error(kind: &ErrorKind) -> AuthError {
    match kind {
        ErrorKind::ExpiredSignature => AuthError::TokenExpired,
        ErrorKind::ImmatureSignature => AuthError::TokenNotYetValid,
        ErrorKind::Json(_)
        | ErrorKind::Utf8(_)
        | ErrorKind::MissingRequiredClaim(_)
        | ErrorKind::InvalidAudience
        | ErrorKind::InvalidIssuer => {
            AuthError::ClaimsRejected("token claims failed validation".to_string())
        }
        _ => AuthError::SignatureInvalid("token signature could not be verified".to_string()),
    }
}
