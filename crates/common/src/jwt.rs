//! JWT utilities shared across the to-do service crates.
//!
//! This module provides the structural half of bearer-token handling:
//! - Size limits for DoS prevention
//! - Clock skew constants for time-claim validation
//! - Unverified decoding of the compact serialization (header + payload)
//! - `exp` / `nbf` / `iat` validation against an explicit clock
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - [`decode_unverified`] never checks the signature; its output is only fit
//!   for choosing a verification key
//! - Generic error messages prevent information leakage
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{decode_unverified, validate_time_claims_at, TimeClaims, DEFAULT_CLOCK_SKEW};
//!
//! // Learn the declared algorithm and key before fetching any key material
//! let unverified = decode_unverified(token)?;
//! let kid = unverified.header.require_kid()?;
//!
//! // After signature verification, validate the time window
//! validate_time_claims_at(&TimeClaims { exp, nbf, iat }, DEFAULT_CLOCK_SKEW, now)?;
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use serde_json::{Map, Value};
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// JWTs larger than this size are rejected BEFORE any base64 decoding or
/// cryptographic work. Identity-provider tokens carrying an RS256 signature
/// and a handful of profile claims are typically 800-1500 bytes.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default clock skew tolerance applied to `exp`, `nbf` and `iat`.
///
/// Zero: a token is rejected the second its `exp` is reached.
pub const DEFAULT_CLOCK_SKEW: Duration = Duration::from_secs(0);

/// Maximum allowed clock skew tolerance (10 minutes).
///
/// Prevents misconfiguration that would keep expired tokens alive.
pub const MAX_CLOCK_SKEW: Duration = Duration::from_secs(600);

/// Number of dot-separated segments in a compact JWS.
const COMPACT_SEGMENTS: usize = 3;

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur during structural or time-based JWT validation.
///
/// Note: Error messages are intentionally generic to prevent information leakage.
/// Detailed information is logged at debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtValidationError {
    /// Token size exceeds maximum allowed.
    #[error("The access token is invalid or expired")]
    TokenTooLarge,

    /// Token format is invalid (not a valid JWT structure).
    #[error("The access token is invalid or expired")]
    MalformedToken,

    /// Token is missing required `kid` header.
    #[error("The access token is invalid or expired")]
    MissingKid,

    /// Token `exp` claim has been reached.
    #[error("The access token is invalid or expired")]
    Expired,

    /// Token `nbf` claim is still in the future.
    #[error("The access token is invalid or expired")]
    NotYetValid,

    /// Token `iat` claim is in the future.
    #[error("The access token is invalid or expired")]
    IatTooFarInFuture,
}

// =============================================================================
// Types
// =============================================================================

/// JOSE header fields needed to pick a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Declared signing algorithm, verbatim (e.g. `"RS256"`, `"none"`).
    pub alg: String,

    /// Key ID; `None` when absent, empty, or not a string.
    pub kid: Option<String>,

    /// Optional media type (usually `"JWT"`).
    pub typ: Option<String>,
}

impl TokenHeader {
    /// The key ID, required before any key lookup.
    ///
    /// # Errors
    ///
    /// Returns `MissingKid` if the header carries no usable `kid`.
    pub fn require_kid(&self) -> Result<&str, JwtValidationError> {
        self.kid.as_deref().ok_or_else(|| {
            tracing::debug!(target: "common.jwt", "Token rejected: header has no kid");
            JwtValidationError::MissingKid
        })
    }
}

/// A compact token split into its decoded header and payload.
///
/// Nothing here has been authenticated.
#[derive(Debug, Clone)]
pub struct UnverifiedToken {
    pub header: TokenHeader,
    pub payload: Map<String, Value>,
}

/// The time-bound registered claims.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeClaims {
    /// Expiration timestamp (Unix epoch seconds).
    pub exp: i64,

    /// Not-before timestamp (Unix epoch seconds).
    pub nbf: Option<i64>,

    /// Issued-at timestamp (Unix epoch seconds).
    pub iat: Option<i64>,
}

// =============================================================================
// Functions
// =============================================================================

/// Decode a compact JWT into header and payload without verifying the signature.
///
/// This is used to learn which signing key and algorithm a token claims before
/// any key material is fetched.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing (denial-of-service prevention)
/// - This function does NOT validate the token signature
/// - The token MUST still be verified after fetching the key
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds `MAX_JWT_SIZE_BYTES`
/// - `MalformedToken` - Not three segments, empty header/payload, bad base64url,
///   header/payload not a JSON object, or `alg` missing
///
/// A missing `kid` is not an error here so callers can reject the algorithm
/// first; see [`TokenHeader::require_kid`].
pub fn decode_unverified(token: &str) -> Result<UnverifiedToken, JwtValidationError> {
    // Check token size first (DoS prevention)
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtValidationError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != COMPACT_SEGMENTS {
        tracing::debug!(
            target: "common.jwt",
            parts = parts.len(),
            "Token rejected: invalid JWT format"
        );
        return Err(JwtValidationError::MalformedToken);
    }

    let header_part = parts.first().ok_or(JwtValidationError::MalformedToken)?;
    let payload_part = parts.get(1).ok_or(JwtValidationError::MalformedToken)?;

    let header = decode_json_object(header_part, "header")?;
    let payload = decode_json_object(payload_part, "payload")?;

    let alg = header
        .get("alg")
        .and_then(Value::as_str)
        .map(ToString::to_string)
        .ok_or_else(|| {
            tracing::debug!(target: "common.jwt", "Token rejected: header has no alg");
            JwtValidationError::MalformedToken
        })?;

    // Empty and non-string kids count as absent
    let kid = header
        .get("kid")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string);

    let typ = header
        .get("typ")
        .and_then(Value::as_str)
        .map(ToString::to_string);

    Ok(UnverifiedToken {
        header: TokenHeader { alg, kid, typ },
        payload,
    })
}

/// Decode one base64url segment that must hold a JSON object.
fn decode_json_object(
    segment: &str,
    segment_name: &'static str,
) -> Result<Map<String, Value>, JwtValidationError> {
    if segment.is_empty() {
        tracing::debug!(target: "common.jwt", segment = segment_name, "Empty JWT segment");
        return Err(JwtValidationError::MalformedToken);
    }

    let bytes = URL_SAFE_NO_PAD.decode(segment).map_err(|e| {
        tracing::debug!(target: "common.jwt", segment = segment_name, error = %e, "Failed to decode JWT base64");
        JwtValidationError::MalformedToken
    })?;

    match serde_json::from_slice::<Value>(&bytes) {
        Ok(Value::Object(map)) => Ok(map),
        Ok(_) => {
            tracing::debug!(target: "common.jwt", segment = segment_name, "JWT segment is not a JSON object");
            Err(JwtValidationError::MalformedToken)
        }
        Err(e) => {
            tracing::debug!(target: "common.jwt", segment = segment_name, error = %e, "Failed to parse JWT JSON");
            Err(JwtValidationError::MalformedToken)
        }
    }
}

/// Deterministic time-claim validation against an explicit `now` timestamp.
///
/// The token is valid for `nbf - skew <= now < exp + skew`, and `iat` may be at
/// most `skew` seconds ahead of `now`.
///
/// # Errors
///
/// - `Expired` - `now >= exp + clock_skew`
/// - `NotYetValid` - `now < nbf - clock_skew`
/// - `IatTooFarInFuture` - `iat > now + clock_skew`
pub fn validate_time_claims_at(
    claims: &TimeClaims,
    clock_skew: Duration,
    now: i64,
) -> Result<(), JwtValidationError> {
    let skew = i64::try_from(clock_skew.as_secs()).unwrap_or(i64::MAX);

    if now >= claims.exp.saturating_add(skew) {
        tracing::debug!(
            target: "common.jwt",
            exp = claims.exp,
            now = now,
            clock_skew_secs = skew,
            "Token rejected: expired"
        );
        return Err(JwtValidationError::Expired);
    }

    if let Some(nbf) = claims.nbf {
        if now < nbf.saturating_sub(skew) {
            tracing::debug!(
                target: "common.jwt",
                nbf = nbf,
                now = now,
                clock_skew_secs = skew,
                "Token rejected: not yet valid"
            );
            return Err(JwtValidationError::NotYetValid);
        }
    }

    if let Some(iat) = claims.iat {
        let max_iat = now.saturating_add(skew);
        if iat > max_iat {
            tracing::debug!(
                target: "common.jwt",
                iat = iat,
                now = now,
                max_allowed = max_iat,
                clock_skew_secs = skew,
                "Token rejected: iat in the future"
            );
            return Err(JwtValidationError::IatTooFarInFuture);
        }
    }

    Ok(())
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token_with(header: &str, payload: &str) -> String {
        format!(
            "{}.{}.signature",
            URL_SAFE_NO_PAD.encode(header),
            URL_SAFE_NO_PAD.encode(payload)
        )
    }

    const PAYLOAD: &str = r#"{"sub":"auth0|alice","exp":1700003600}"#;

    // -------------------------------------------------------------------------
    // Constants Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_default_clock_skew_is_zero() {
        assert_eq!(DEFAULT_CLOCK_SKEW, Duration::ZERO);
    }

    #[test]
    fn test_max_clock_skew_is_10_minutes() {
        assert_eq!(MAX_CLOCK_SKEW, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // decode_unverified Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_decode_valid_token() {
        let token = token_with(r#"{"alg":"RS256","typ":"JWT","kid":"key-01"}"#, PAYLOAD);

        let decoded = decode_unverified(&token).unwrap();

        assert_eq!(decoded.header.alg, "RS256");
        assert_eq!(decoded.header.kid.as_deref(), Some("key-01"));
        assert_eq!(decoded.header.require_kid(), Ok("key-01"));
        assert_eq!(decoded.header.typ.as_deref(), Some("JWT"));
        assert_eq!(
            decoded.payload.get("sub").and_then(Value::as_str),
            Some("auth0|alice")
        );
    }

    #[test]
    fn test_decode_keeps_unexpected_algorithm_verbatim() {
        // Algorithm policy is the caller's job; decoding must not reject it
        let token = token_with(r#"{"alg":"none","kid":"key-01"}"#, PAYLOAD);
        let decoded = decode_unverified(&token).unwrap();
        assert_eq!(decoded.header.alg, "none");
    }

    #[test]
    fn test_decode_allows_empty_signature_segment() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"none","kid":"key-01"}"#);
        let payload = URL_SAFE_NO_PAD.encode(PAYLOAD);
        let token = format!("{header}.{payload}.");

        assert!(decode_unverified(&token).is_ok());
    }

    #[test]
    fn test_decode_wrong_segment_count() {
        for token in ["", "single", "only.two", "one.two.three.four"] {
            assert_eq!(
                decode_unverified(token).unwrap_err(),
                JwtValidationError::MalformedToken,
                "token {token:?} should be malformed"
            );
        }
    }

    #[test]
    fn test_decode_empty_header_or_payload() {
        let payload = URL_SAFE_NO_PAD.encode(PAYLOAD);
        assert_eq!(
            decode_unverified(&format!(".{payload}.sig")).unwrap_err(),
            JwtValidationError::MalformedToken
        );

        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"k"}"#);
        assert_eq!(
            decode_unverified(&format!("{header}..sig")).unwrap_err(),
            JwtValidationError::MalformedToken
        );
    }

    #[test]
    fn test_decode_invalid_base64() {
        assert_eq!(
            decode_unverified("!!!invalid!!!.payload.signature").unwrap_err(),
            JwtValidationError::MalformedToken
        );
    }

    #[test]
    fn test_decode_header_not_json() {
        let header = URL_SAFE_NO_PAD.encode("not-json");
        let payload = URL_SAFE_NO_PAD.encode(PAYLOAD);
        assert_eq!(
            decode_unverified(&format!("{header}.{payload}.sig")).unwrap_err(),
            JwtValidationError::MalformedToken
        );
    }

    #[test]
    fn test_decode_payload_must_be_object() {
        let token = token_with(r#"{"alg":"RS256","kid":"k"}"#, r#"["not","an","object"]"#);
        assert_eq!(
            decode_unverified(&token).unwrap_err(),
            JwtValidationError::MalformedToken
        );
    }

    #[test]
    fn test_decode_missing_alg() {
        let token = token_with(r#"{"kid":"k"}"#, PAYLOAD);
        assert_eq!(
            decode_unverified(&token).unwrap_err(),
            JwtValidationError::MalformedToken
        );
    }

    #[test]
    fn test_decode_missing_empty_or_non_string_kid() {
        for header in [
            r#"{"alg":"RS256"}"#,
            r#"{"alg":"RS256","kid":""}"#,
            r#"{"alg":"RS256","kid":12345}"#,
            r#"{"alg":"RS256","kid":null}"#,
        ] {
            let token = token_with(header, PAYLOAD);
            let decoded = decode_unverified(&token).unwrap();
            assert!(decoded.header.kid.is_none(), "header {header} has no usable kid");
            assert_eq!(
                decoded.header.require_kid(),
                Err(JwtValidationError::MissingKid)
            );
        }
    }

    #[test]
    fn test_decode_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(
            decode_unverified(&oversized).unwrap_err(),
            JwtValidationError::TokenTooLarge
        );
    }

    #[test]
    fn test_decode_at_size_limit() {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"key"}"#);
        let payload = URL_SAFE_NO_PAD.encode(PAYLOAD);
        let sig_len = MAX_JWT_SIZE_BYTES - header.len() - payload.len() - 2;
        let token = format!("{header}.{payload}.{}", "b".repeat(sig_len));
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);

        let decoded = decode_unverified(&token).unwrap();
        assert_eq!(decoded.header.kid.as_deref(), Some("key"));
    }

    // -------------------------------------------------------------------------
    // validate_time_claims Tests
    // -------------------------------------------------------------------------

    const NOW: i64 = 1_700_000_000;

    fn window(exp: i64, nbf: Option<i64>, iat: Option<i64>) -> TimeClaims {
        TimeClaims { exp, nbf, iat }
    }

    #[test]
    fn test_time_claims_inside_window() {
        let claims = window(NOW + 3600, Some(NOW - 10), Some(NOW - 10));
        assert!(validate_time_claims_at(&claims, DEFAULT_CLOCK_SKEW, NOW).is_ok());
    }

    #[test]
    fn test_time_claims_expiry_boundary() {
        // One second before exp is the last accepted instant
        let claims = window(NOW + 1, None, None);
        assert!(validate_time_claims_at(&claims, DEFAULT_CLOCK_SKEW, NOW).is_ok());

        // now == exp is already expired
        let claims = window(NOW, None, None);
        assert_eq!(
            validate_time_claims_at(&claims, DEFAULT_CLOCK_SKEW, NOW),
            Err(JwtValidationError::Expired)
        );
    }

    #[test]
    fn test_time_claims_expiry_with_skew() {
        let claims = window(NOW - 30, None, None);
        assert!(validate_time_claims_at(&claims, Duration::from_secs(60), NOW).is_ok());
        assert_eq!(
            validate_time_claims_at(&claims, Duration::from_secs(30), NOW),
            Err(JwtValidationError::Expired)
        );
    }

    #[test]
    fn test_time_claims_not_before_boundary() {
        let claims = window(NOW + 3600, Some(NOW), None);
        assert!(validate_time_claims_at(&claims, DEFAULT_CLOCK_SKEW, NOW).is_ok());

        let claims = window(NOW + 3600, Some(NOW + 1), None);
        assert_eq!(
            validate_time_claims_at(&claims, DEFAULT_CLOCK_SKEW, NOW),
            Err(JwtValidationError::NotYetValid)
        );
    }

    #[test]
    fn test_time_claims_iat_boundary() {
        let claims = window(NOW + 3600, None, Some(NOW));
        assert!(validate_time_claims_at(&claims, DEFAULT_CLOCK_SKEW, NOW).is_ok());

        let claims = window(NOW + 3600, None, Some(NOW + 1));
        assert_eq!(
            validate_time_claims_at(&claims, DEFAULT_CLOCK_SKEW, NOW),
            Err(JwtValidationError::IatTooFarInFuture)
        );

        // Within tolerance
        assert!(validate_time_claims_at(&claims, Duration::from_secs(1), NOW).is_ok());
    }

    #[test]
    fn test_time_claims_extreme_values_do_not_overflow() {
        let claims = window(i64::MAX, Some(i64::MIN), None);
        assert!(validate_time_claims_at(&claims, MAX_CLOCK_SKEW, NOW).is_ok());
    }
}
