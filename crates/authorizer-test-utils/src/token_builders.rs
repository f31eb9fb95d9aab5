//! Builder patterns for test tokens
//!
//! Provides a fluent API for minting signed RS256 identity tokens, plus
//! escape hatches for the malformed shapes the authorizer must reject.

use crate::crypto_fixtures::TestSigningKey;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use base64::Engine;
use chrono::{Duration, Utc};
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use serde_json::{json, Map, Value};

/// Builder for signed test tokens
///
/// # Example
/// ```rust,ignore
/// let token = TestTokenBuilder::new()
///     .for_user("auth0|alice")
///     .expires_in(3600)
///     .sign();
/// ```
pub struct TestTokenBuilder {
    signing_key: TestSigningKey,
    kid: Option<String>,
    alg: Option<String>,
    claims: Map<String, Value>,
}

impl TestTokenBuilder {
    /// Create a new builder signing with the primary fixture key, valid for an hour.
    pub fn new() -> Self {
        let now = Utc::now();
        let mut claims = Map::new();
        claims.insert("sub".to_string(), json!("auth0|test-user"));
        claims.insert("iat".to_string(), json!(now.timestamp()));
        claims.insert(
            "exp".to_string(),
            json!((now + Duration::seconds(3600)).timestamp()),
        );

        let signing_key = TestSigningKey::primary();
        Self {
            kid: Some(signing_key.kid.to_string()),
            signing_key,
            alg: None,
            claims,
        }
    }

    /// Sign with a different fixture key (kid follows unless overridden).
    pub fn signed_with(mut self, key: TestSigningKey) -> Self {
        self.kid = Some(key.kid.to_string());
        self.signing_key = key;
        self
    }

    /// Set the subject
    pub fn for_user(self, subject: &str) -> Self {
        self.with_claim("sub", json!(subject))
    }

    /// Set expiration in seconds from now (negative for already expired)
    pub fn expires_in(self, seconds: i64) -> Self {
        self.with_claim("exp", json!((Utc::now() + Duration::seconds(seconds)).timestamp()))
    }

    /// Set an absolute expiration timestamp
    pub fn expires_at(self, timestamp: i64) -> Self {
        self.with_claim("exp", json!(timestamp))
    }

    /// Set issued-at timestamp
    pub fn issued_at(self, timestamp: i64) -> Self {
        self.with_claim("iat", json!(timestamp))
    }

    /// Set not-before timestamp
    pub fn not_before(self, timestamp: i64) -> Self {
        self.with_claim("nbf", json!(timestamp))
    }

    pub fn with_audience(self, audience: &str) -> Self {
        self.with_claim("aud", json!(audience))
    }

    pub fn with_issuer(self, issuer: &str) -> Self {
        self.with_claim("iss", json!(issuer))
    }

    /// Set an arbitrary claim
    pub fn with_claim(mut self, name: &str, value: Value) -> Self {
        self.claims.insert(name.to_string(), value);
        self
    }

    /// Remove a claim entirely
    pub fn without_claim(mut self, name: &str) -> Self {
        self.claims.remove(name);
        self
    }

    /// Override the `kid` header (the signature still uses the builder's key)
    pub fn with_kid(mut self, kid: &str) -> Self {
        self.kid = Some(kid.to_string());
        self
    }

    /// Omit the `kid` header
    pub fn without_kid(mut self) -> Self {
        self.kid = None;
        self
    }

    /// Claim a different `alg` in the header.
    ///
    /// The signature segment is still an RS256 signature, so the token is
    /// only useful for testing algorithm rejection.
    pub fn with_alg(mut self, alg: &str) -> Self {
        self.alg = Some(alg.to_string());
        self
    }

    /// The claims as a JSON value
    pub fn claims(&self) -> Value {
        Value::Object(self.claims.clone())
    }

    /// Produce the compact token.
    pub fn sign(self) -> String {
        let claims = Value::Object(self.claims);

        match self.alg {
            None => {
                let mut header = Header::new(Algorithm::RS256);
                header.kid = self.kid;
                let key = EncodingKey::from_rsa_pem(self.signing_key.private_key_pem.as_bytes())
                    .expect("fixture private key is valid PEM");
                encode(&header, &claims, &key).expect("signing with fixture key succeeds")
            }
            Some(alg) => {
                // Hand-assembled so any alg string can be declared
                let mut header = json!({ "alg": alg, "typ": "JWT" });
                if let Some(kid) = self.kid {
                    header["kid"] = json!(kid);
                }
                let signed = TestTokenBuilder {
                    signing_key: self.signing_key,
                    kid: None,
                    alg: None,
                    claims: Map::new(),
                }
                .sign();
                let signature = signed.rsplit('.').next().unwrap_or_default();
                format!(
                    "{}.{}.{}",
                    encode_segment(&header),
                    encode_segment(&claims),
                    signature
                )
            }
        }
    }

    /// Produce `Bearer <token>`.
    pub fn bearer(self) -> String {
        format!("Bearer {}", self.sign())
    }
}

impl Default for TestTokenBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Base64url-encode a JSON value as a token segment.
pub fn encode_segment(value: &Value) -> String {
    URL_SAFE_NO_PAD.encode(value.to_string().as_bytes())
}

/// Replace the payload segment while keeping the original header and signature.
pub fn tamper_payload(token: &str, payload: &Value) -> String {
    let parts: Vec<&str> = token.split('.').collect();
    assert_eq!(parts.len(), 3, "expected a compact JWS");
    format!("{}.{}.{}", parts[0], encode_segment(payload), parts[2])
}
