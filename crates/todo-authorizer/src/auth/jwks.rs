//! Signing-key resolution from the identity provider's JWKS document.
//!
//! The JWKS (JSON Web Key Set) is fetched fresh on every call so a rotated key
//! is effective on the very next authorization. There is no cache and no
//! retry; a failed fetch is a deny.
//!
//! # Filtering
//!
//! An entry is usable only if `use == "sig"`, `kty == "RSA"`, `kid` is
//! non-empty, and it carries key material (`x5c` or both `n` and `e`).
//! Order is preserved and the first usable entry for a kid wins. Entries are
//! parsed one at a time, so a malformed entry is dropped without taking the
//! rest of the key set with it.

use crate::auth::pem::{certificate_to_pem, rsa_components_to_pem, PemError};
use crate::errors::AuthError;
use crate::observability::metrics::record_jwks_fetch;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};
use tracing::instrument;

/// Default HTTP timeout for a JWKS fetch.
pub const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(10);

/// Required `use` value for verification keys.
pub const SIGNATURE_KEY_USE: &str = "sig";

/// Required `kty` value (only RS256 is accepted).
pub const RSA_KEY_TYPE: &str = "RSA";

/// JSON Web Key as published in the key set.
///
/// Every member is optional on the wire; [`Jwk::is_usable_signing_key`]
/// decides whether the entry can be used.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Jwk {
    /// Key use (must be "sig").
    #[serde(default, rename = "use", skip_serializing_if = "Option::is_none")]
    pub key_use: Option<String>,

    /// Key type (must be "RSA").
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kty: Option<String>,

    /// Key ID referenced by token headers.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kid: Option<String>,

    /// Certificate chain; the first element is the signing certificate.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub x5c: Option<Vec<String>>,

    /// RSA modulus (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub n: Option<String>,

    /// RSA public exponent (base64url).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub e: Option<String>,

    /// Declared algorithm, informational only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub alg: Option<String>,
}

impl Jwk {
    /// Usability invariant for verification keys.
    pub fn is_usable_signing_key(&self) -> bool {
        let present = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.is_empty());

        self.key_use.as_deref() == Some(SIGNATURE_KEY_USE)
            && self.kty.as_deref() == Some(RSA_KEY_TYPE)
            && present(&self.kid)
            && (self.x5c.as_ref().is_some_and(|chain| !chain.is_empty())
                || (present(&self.n) && present(&self.e)))
    }

    /// PEM public key for this entry.
    ///
    /// The certificate chain wins over `n`/`e` when both are present.
    fn public_key_pem(&self) -> Result<String, PemError> {
        if let Some(cert) = self.x5c.as_ref().and_then(|chain| chain.first()) {
            return Ok(certificate_to_pem(cert));
        }
        match (self.n.as_deref(), self.e.as_deref()) {
            (Some(n), Some(e)) => rsa_components_to_pem(n, e),
            (None, _) => Err(PemError::EmptyComponent("modulus")),
            (_, None) => Err(PemError::EmptyComponent("exponent")),
        }
    }
}

/// The key-set document: `{ "keys": [ ... ] }`.
///
/// Entries stay as raw JSON until [`SigningKeys::from_document`] parses them.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct JwksDocument {
    pub keys: Vec<serde_json::Value>,
}

/// A usable key, ready for signature verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningKey {
    pub kid: String,
    pub public_key_pem: String,
}

/// Ordered `kid -> SigningKey` mapping with first-match semantics.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SigningKeys {
    keys: Vec<SigningKey>,
}

impl SigningKeys {
    /// Filter a key-set document down to usable, convertible keys.
    ///
    /// Entries that are not a JWK object, or that pass the usability check
    /// but whose key material cannot be converted, are rejected with a
    /// warning and do not shadow later entries with the same kid.
    pub fn from_document(document: &JwksDocument) -> Self {
        let mut keys: Vec<SigningKey> = Vec::new();

        let parsed = document
            .keys
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| match Jwk::deserialize(entry) {
                Ok(jwk) => Some(jwk),
                Err(e) => {
                    tracing::warn!(target: "authorizer.jwks", index, error = %e, "Skipping malformed JWKS entry");
                    None
                }
            });

        for jwk in parsed.filter(Jwk::is_usable_signing_key) {
            let Some(kid) = jwk.kid.as_deref() else {
                continue;
            };

            if keys.iter().any(|k| k.kid == kid) {
                tracing::debug!(target: "authorizer.jwks", kid = %kid, "Duplicate kid ignored, first entry wins");
                continue;
            }

            match jwk.public_key_pem() {
                Ok(public_key_pem) => keys.push(SigningKey {
                    kid: kid.to_string(),
                    public_key_pem,
                }),
                Err(e) => {
                    tracing::warn!(target: "authorizer.jwks", kid = %kid, error = %e, "Rejecting signing key with unusable key material");
                }
            }
        }

        Self { keys }
    }

    /// First key whose kid matches.
    pub fn get(&self, kid: &str) -> Option<&SigningKey> {
        self.keys.iter().find(|k| k.kid == kid)
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Source of the current signing keys.
///
/// The production implementation is [`JwksResolver`]; tests substitute fixed
/// key sets.
#[async_trait]
pub trait SigningKeyProvider: Send + Sync {
    /// Resolve the current `kid -> PEM` mapping.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::KeySetUnavailable` if the key set cannot be obtained.
    async fn resolve_signing_keys(&self) -> Result<SigningKeys, AuthError>;
}

/// Fetches the key set over HTTP on every call.
pub struct JwksResolver {
    /// URL to the JWKS endpoint.
    jwks_url: String,

    /// HTTP client for fetching JWKS.
    http_client: reqwest::Client,
}

impl JwksResolver {
    /// Create a resolver for `jwks_url` with the given fetch timeout.
    pub fn new(jwks_url: String, fetch_timeout: Duration) -> Self {
        let http_client = reqwest::Client::builder()
            .timeout(fetch_timeout)
            .build()
            .unwrap_or_else(|e| {
                tracing::warn!(target: "authorizer.jwks", error = %e, "Failed to build HTTP client with custom config, using defaults");
                reqwest::Client::new()
            });

        Self {
            jwks_url,
            http_client,
        }
    }

    /// Fetch and parse the key-set document.
    async fn fetch_document(&self) -> Result<JwksDocument, AuthError> {
        tracing::debug!(target: "authorizer.jwks", url = %self.jwks_url, "Fetching JWKS");

        let response = self
            .http_client
            .get(&self.jwks_url)
            .send()
            .await
            .map_err(|e| {
                tracing::error!(target: "authorizer.jwks", error = %e, "Failed to fetch JWKS");
                AuthError::KeySetUnavailable("JWKS request failed".to_string())
            })?;

        if !response.status().is_success() {
            tracing::error!(
                target: "authorizer.jwks",
                status = %response.status(),
                "JWKS endpoint returned error"
            );
            return Err(AuthError::KeySetUnavailable(format!(
                "JWKS endpoint returned {}",
                response.status().as_u16()
            )));
        }

        response.json::<JwksDocument>().await.map_err(|e| {
            tracing::error!(target: "authorizer.jwks", error = %e, "Failed to parse JWKS response");
            AuthError::KeySetUnavailable("JWKS response is not a key set".to_string())
        })
    }
}

#[async_trait]
impl SigningKeyProvider for JwksResolver {
    #[instrument(skip_all, name = "authorizer.jwks.resolve")]
    async fn resolve_signing_keys(&self) -> Result<SigningKeys, AuthError> {
        let start = Instant::now();
        let result = self.fetch_document().await;
        record_jwks_fetch(if result.is_ok() { "success" } else { "error" }, start.elapsed());

        let document = result?;
        let keys = SigningKeys::from_document(&document);

        tracing::debug!(
            target: "authorizer.jwks",
            published = document.keys.len(),
            usable = keys.len(),
            "JWKS resolved"
        );

        Ok(keys)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const CERT_A: &str = "MIIDMTCCAhmgAwIBAgIUfs9qAAAA";
    const CERT_B: &str = "MIIDMTCCAhmgAwIBAgIUfs9qBBBB";

    fn document(keys: Vec<Jwk>) -> JwksDocument {
        JwksDocument {
            keys: keys
                .iter()
                .map(|jwk| serde_json::to_value(jwk).unwrap())
                .collect(),
        }
    }

    fn rsa_sig(kid: &str, cert: &str) -> Jwk {
        Jwk {
            key_use: Some("sig".to_string()),
            kty: Some("RSA".to_string()),
            kid: Some(kid.to_string()),
            x5c: Some(vec![cert.to_string()]),
            ..Jwk::default()
        }
    }

    #[test]
    fn test_jwk_deserialization() {
        let json = r#"{
            "alg": "RS256",
            "kty": "RSA",
            "use": "sig",
            "n": "nE_qJiLH",
            "e": "AQAB",
            "kid": "NjVBRjY5MDlCMUIwNzU4RTA2QzZFMDQ4QzQ2MDAyQjVDNjk1RTM2Qg",
            "x5t": "NjVBRjY5MDlCMUIwNzU4RTA2QzZFMDQ4QzQ2MDAyQjVDNjk1RTM2Qg",
            "x5c": ["MIIDBTCCAe2gAwIBAgIJ"]
        }"#;

        let jwk: Jwk = serde_json::from_str(json).unwrap();

        assert_eq!(jwk.key_use.as_deref(), Some("sig"));
        assert_eq!(jwk.kty.as_deref(), Some("RSA"));
        assert_eq!(jwk.alg.as_deref(), Some("RS256"));
        assert_eq!(jwk.x5c.as_ref().unwrap().len(), 1);
        assert!(jwk.is_usable_signing_key());
    }

    #[test]
    fn test_jwk_deserialization_minimal() {
        let jwk: Jwk = serde_json::from_str(r#"{"kty":"RSA"}"#).unwrap();
        assert!(jwk.kid.is_none());
        assert!(jwk.key_use.is_none());
        assert!(!jwk.is_usable_signing_key());
    }

    #[test]
    fn test_usability_requires_every_field() {
        assert!(rsa_sig("A", CERT_A).is_usable_signing_key());

        let missing_kid = Jwk {
            kid: None,
            ..rsa_sig("A", CERT_A)
        };
        let empty_kid = rsa_sig("", CERT_A);
        let encryption = Jwk {
            key_use: Some("enc".to_string()),
            ..rsa_sig("A", CERT_A)
        };
        let missing_use = Jwk {
            key_use: None,
            ..rsa_sig("A", CERT_A)
        };
        let elliptic = Jwk {
            kty: Some("EC".to_string()),
            ..rsa_sig("A", CERT_A)
        };
        let no_material = Jwk {
            x5c: Some(vec![]),
            ..rsa_sig("A", CERT_A)
        };
        let half_components = Jwk {
            x5c: None,
            n: Some("nE_qJiLH".to_string()),
            ..rsa_sig("A", CERT_A)
        };

        for jwk in [
            missing_kid,
            empty_kid,
            encryption,
            missing_use,
            elliptic,
            no_material,
            half_components,
        ] {
            assert!(!jwk.is_usable_signing_key(), "{jwk:?} should be unusable");
        }
    }

    #[test]
    fn test_components_only_entry_is_usable() {
        let jwk = Jwk {
            x5c: None,
            n: Some("nE_qJiLH".to_string()),
            e: Some("AQAB".to_string()),
            ..rsa_sig("A", CERT_A)
        };
        assert!(jwk.is_usable_signing_key());
    }

    #[test]
    fn test_filter_drops_entry_without_kid() {
        let document = document(vec![
            rsa_sig("A", CERT_A),
            Jwk {
                kid: None,
                ..rsa_sig("B", CERT_B)
            },
        ]);

        let keys = SigningKeys::from_document(&document);
        assert_eq!(keys.len(), 1);
        assert!(keys.get("A").is_some());
    }

    #[test]
    fn test_filter_drops_encryption_key() {
        let document = document(vec![
            rsa_sig("A", CERT_A),
            Jwk {
                key_use: Some("enc".to_string()),
                ..rsa_sig("B", CERT_B)
            },
        ]);

        let keys = SigningKeys::from_document(&document);
        assert_eq!(keys.len(), 1);
        assert!(keys.get("A").is_some());
        assert!(keys.get("B").is_none());
    }

    #[test]
    fn test_first_usable_occurrence_wins() {
        let document = document(vec![
            Jwk {
                key_use: Some("enc".to_string()),
                ..rsa_sig("A", "IGNORED")
            },
            rsa_sig("A", CERT_A),
            rsa_sig("A", CERT_B),
        ]);

        let keys = SigningKeys::from_document(&document);
        assert_eq!(keys.len(), 1);
        assert_eq!(
            keys.get("A").unwrap().public_key_pem,
            certificate_to_pem(CERT_A)
        );
    }

    #[test]
    fn test_certificate_preferred_over_components() {
        let jwk = Jwk {
            n: Some("nE_qJiLH".to_string()),
            e: Some("AQAB".to_string()),
            ..rsa_sig("A", CERT_A)
        };
        let keys = SigningKeys::from_document(&document(vec![jwk]));
        assert!(keys
            .get("A")
            .unwrap()
            .public_key_pem
            .starts_with("-----BEGIN CERTIFICATE-----"));
    }

    #[test]
    fn test_unconvertible_components_are_rejected_not_shadowing() {
        let broken = Jwk {
            x5c: None,
            n: Some("!!!".to_string()),
            e: Some("AQAB".to_string()),
            ..rsa_sig("A", CERT_A)
        };
        let document = document(vec![broken, rsa_sig("A", CERT_B)]);

        let keys = SigningKeys::from_document(&document);
        assert_eq!(keys.len(), 1);
        assert_eq!(
            keys.get("A").unwrap().public_key_pem,
            certificate_to_pem(CERT_B)
        );
    }

    #[test]
    fn test_mistyped_entry_does_not_affect_other_keys() {
        let document: JwksDocument = serde_json::from_value(serde_json::json!({
            "keys": [
                {"kid": "A", "use": "sig", "kty": "RSA", "x5c": [CERT_A]},
                {"kid": 42, "use": "sig", "kty": "RSA", "x5c": ["AAAA"]},
                {"kid": "C", "use": "sig", "kty": "RSA", "x5c": "not-a-chain"},
                "not-an-object",
                {"kid": "B", "use": "sig", "kty": "RSA", "x5c": [CERT_B]}
            ]
        }))
        .unwrap();

        let keys = SigningKeys::from_document(&document);
        assert_eq!(keys.len(), 2);
        assert!(keys.get("A").is_some());
        assert!(keys.get("B").is_some());
        assert!(keys.get("C").is_none());
    }

    #[tokio::test]
    async fn test_resolver_fetches_and_filters() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/.well-known/jwks.json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [
                    {"kid": "A", "use": "sig", "kty": "RSA", "x5c": [CERT_A]},
                    {"kid": "B", "use": "enc", "kty": "RSA", "x5c": [CERT_B]}
                ]
            })))
            .mount(&mock_server)
            .await;

        let resolver = JwksResolver::new(
            format!("{}/.well-known/jwks.json", mock_server.uri()),
            DEFAULT_FETCH_TIMEOUT,
        );

        let keys = resolver.resolve_signing_keys().await.unwrap();
        assert_eq!(keys.len(), 1);
        assert!(keys.get("A").is_some());
    }

    #[tokio::test]
    async fn test_resolver_fetches_on_every_call() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/jwks"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "keys": [{"kid": "A", "use": "sig", "kty": "RSA", "x5c": [CERT_A]}]
            })))
            .expect(3)
            .mount(&mock_server)
            .await;

        let resolver = JwksResolver::new(format!("{}/jwks", mock_server.uri()), DEFAULT_FETCH_TIMEOUT);
        for _ in 0..3 {
            resolver.resolve_signing_keys().await.unwrap();
        }
        // MockServer verifies the expectation on drop
    }

    #[tokio::test]
    async fn test_resolver_error_status_is_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&mock_server)
            .await;

        let resolver = JwksResolver::new(format!("{}/jwks", mock_server.uri()), DEFAULT_FETCH_TIMEOUT);
        let err = resolver.resolve_signing_keys().await.unwrap_err();
        assert_eq!(err.kind(), "key_set_unavailable");
    }

    #[tokio::test]
    async fn test_resolver_malformed_body_is_unavailable() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>not json</html>"))
            .mount(&mock_server)
            .await;

        let resolver = JwksResolver::new(format!("{}/jwks", mock_server.uri()), DEFAULT_FETCH_TIMEOUT);
        let err = resolver.resolve_signing_keys().await.unwrap_err();
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    }

    #[tokio::test]
    async fn test_resolver_unreachable_endpoint_is_unavailable() {
        // Port 9 (discard) on localhost is not expected to be listening
        let resolver = JwksResolver::new(
            "http://127.0.0.1:9/jwks".to_string(),
            Duration::from_secs(2),
        );
        let err = resolver.resolve_signing_keys().await.unwrap_err();
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    }

    #[tokio::test]
    async fn test_resolver_slow_endpoint_times_out() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"keys": []}))
                    .set_delay(Duration::from_secs(3)),
            )
            .mount(&mock_server)
            .await;

        let resolver = JwksResolver::new(
            format!("{}/jwks", mock_server.uri()),
            Duration::from_millis(200),
        );
        let err = resolver.resolve_signing_keys().await.unwrap_err();
        assert!(matches!(err, AuthError::KeySetUnavailable(_)));
    }
}
