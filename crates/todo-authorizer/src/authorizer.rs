//! Authorization decisions for bearer tokens.
//!
//! [`Authorizer::authorize`] is the boundary the gateway calls. It never
//! fails: every [`AuthError`] is logged and counted, then collapsed into a
//! deny decision that carries no detail about why.
//!
//! # Pipeline
//!
//! 1. Extract the token from `Bearer <token>`
//! 2. Decode the header unverified; `alg` must be RS256
//! 3. Resolve the signing keys and look up the header's `kid`
//! 4. Verify signature and claims
//! 5. Allow with `principalId = sub`, or deny

use crate::auth::claims::Claims;
use crate::auth::jwks::{JwksResolver, SigningKeyProvider};
use crate::auth::jwt::TokenVerifier;
use crate::config::Config;
use crate::errors::AuthError;
use crate::models::AuthorizationDecision;
use crate::observability::metrics::record_decision;
use common::jwt::decode_unverified;
use std::sync::Arc;
use tracing::instrument;

/// The only signing algorithm accepted.
pub const EXPECTED_ALGORITHM: &str = "RS256";

/// Authorization scheme prefix, matched case-insensitively.
const BEARER_PREFIX: &str = "bearer ";

/// Pull the compact token out of an `Authorization` header value.
///
/// # Errors
///
/// Returns `AuthError::MissingOrMalformedHeader` if the header is absent, does
/// not use the bearer scheme, or carries an empty or whitespace-split token.
pub fn extract_bearer_token(header: Option<&str>) -> Result<&str, AuthError> {
    let header = header
        .ok_or_else(|| AuthError::MissingOrMalformedHeader("no authorization header".to_string()))?;

    let has_prefix = header
        .get(..BEARER_PREFIX.len())
        .is_some_and(|prefix| prefix.eq_ignore_ascii_case(BEARER_PREFIX));
    if !has_prefix {
        return Err(AuthError::MissingOrMalformedHeader(
            "authorization header is not a bearer credential".to_string(),
        ));
    }

    let token = header.get(BEARER_PREFIX.len()..).unwrap_or_default().trim();
    if token.is_empty() || token.contains(char::is_whitespace) {
        return Err(AuthError::MissingOrMalformedHeader(
            "bearer token is empty or malformed".to_string(),
        ));
    }

    Ok(token)
}

/// Turns an `Authorization` header into an allow/deny decision.
pub struct Authorizer {
    key_provider: Arc<dyn SigningKeyProvider>,
    verifier: TokenVerifier,
}

impl Authorizer {
    pub fn new(key_provider: Arc<dyn SigningKeyProvider>, verifier: TokenVerifier) -> Self {
        Self {
            key_provider,
            verifier,
        }
    }

    /// Build the production authorizer: HTTP key-set resolver plus verifier
    /// settings from `config`.
    pub fn from_config(config: &Config) -> Self {
        let resolver = JwksResolver::new(config.jwks_url.clone(), config.jwks_fetch_timeout());
        let verifier = TokenVerifier::new(config.clock_skew())
            .with_audience(config.audience.clone())
            .with_issuer(config.issuer.clone());

        Self::new(Arc::new(resolver), verifier)
    }

    /// The key provider this authorizer resolves signing keys from.
    pub fn key_provider(&self) -> Arc<dyn SigningKeyProvider> {
        Arc::clone(&self.key_provider)
    }

    /// Decide against the current wall clock.
    pub async fn authorize(&self, header: Option<&str>) -> AuthorizationDecision {
        self.authorize_at(header, chrono::Utc::now().timestamp())
            .await
    }

    /// Decide with `now` as the verification time.
    #[instrument(skip_all, name = "authorizer.decision")]
    pub async fn authorize_at(&self, header: Option<&str>, now: i64) -> AuthorizationDecision {
        match self.try_authorize_at(header, now).await {
            Ok(claims) => {
                tracing::info!(target: "authorizer.decision", effect = "allow", "Authorization allowed");
                record_decision("allow", "none");
                AuthorizationDecision::allow(claims.sub)
            }
            Err(e) => {
                match &e {
                    AuthError::KeySetUnavailable(_) => {
                        tracing::warn!(target: "authorizer.decision", effect = "deny", reason = e.kind(), error = %e, "Authorization denied");
                    }
                    _ => {
                        tracing::info!(target: "authorizer.decision", effect = "deny", reason = e.kind(), error = %e, "Authorization denied");
                    }
                }
                record_decision("deny", e.kind());
                AuthorizationDecision::deny()
            }
        }
    }

    /// Run the pipeline against the current wall clock, keeping the failure.
    ///
    /// # Errors
    ///
    /// See [`Authorizer::try_authorize_at`].
    pub async fn try_authorize(&self, header: Option<&str>) -> Result<Claims, AuthError> {
        self.try_authorize_at(header, chrono::Utc::now().timestamp())
            .await
    }

    /// Run the pipeline with `now` as the verification time.
    ///
    /// # Errors
    ///
    /// - `MissingOrMalformedHeader` - no usable bearer credential
    /// - `MalformedToken` - not a decodable compact JWS, or an RS256 header
    ///   without a `kid`
    /// - `UnsupportedAlgorithm` - header `alg` is not RS256 (no key fetch happens)
    /// - `KeySetUnavailable` - the key set could not be fetched
    /// - `SigningKeyNotFound` - no usable key matches the header `kid`
    /// - `SignatureInvalid`, `TokenExpired`, `TokenNotYetValid`, `ClaimsRejected`
    ///   - from verification
    pub async fn try_authorize_at(
        &self,
        header: Option<&str>,
        now: i64,
    ) -> Result<Claims, AuthError> {
        let token = extract_bearer_token(header)?;

        let header = decode_unverified(token)?.header;
        if header.alg != EXPECTED_ALGORITHM {
            return Err(AuthError::UnsupportedAlgorithm(header.alg));
        }
        let kid = header.require_kid()?;

        let signing_keys = self.key_provider.resolve_signing_keys().await?;
        let signing_key = signing_keys
            .get(kid)
            .ok_or_else(|| AuthError::SigningKeyNotFound(kid.to_string()))?;

        self.verifier
            .verify_at(token, &signing_key.public_key_pem, now)
    }
}
