//! Mock identity-provider JWKS endpoint
//!
//! Wraps a wiremock server that serves a key-set document at
//! `/.well-known/jwks.json`, with helpers for the failure modes the
//! authorizer must turn into a deny.

use serde_json::Value;
use std::time::Duration;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Path the mock publishes the key set under.
pub const JWKS_PATH: &str = "/.well-known/jwks.json";

/// A running mock JWKS endpoint.
///
/// # Example
/// ```rust,ignore
/// let jwks = MockJwksServer::start().await;
/// jwks.serve_keys(vec![TestSigningKey::primary().jwk_x5c()]).await;
/// let resolver = JwksResolver::new(jwks.jwks_url(), Duration::from_secs(5));
/// ```
pub struct MockJwksServer {
    server: MockServer,
}

impl MockJwksServer {
    /// Start an endpoint with nothing mounted (requests get 404).
    pub async fn start() -> Self {
        Self {
            server: MockServer::start().await,
        }
    }

    /// Start an endpoint already serving `keys`.
    pub async fn with_keys(keys: Vec<Value>) -> Self {
        let mock = Self::start().await;
        mock.serve_keys(keys).await;
        mock
    }

    /// Full URL of the key-set document.
    pub fn jwks_url(&self) -> String {
        format!("{}{}", self.server.uri(), JWKS_PATH)
    }

    /// Serve a key set containing `keys`, replacing anything mounted before.
    pub async fn serve_keys(&self, keys: Vec<Value>) {
        self.serve_document(crate::crypto_fixtures::jwks_document(keys))
            .await;
    }

    /// Serve an arbitrary JSON body, replacing anything mounted before.
    pub async fn serve_document(&self, document: Value) {
        self.replace(ResponseTemplate::new(200).set_body_json(document))
            .await;
    }

    /// Respond with `status` and an empty body.
    pub async fn fail_with_status(&self, status: u16) {
        self.replace(ResponseTemplate::new(status)).await;
    }

    /// Respond 200 with a body that is not JSON.
    pub async fn serve_garbage(&self) {
        self.replace(
            ResponseTemplate::new(200)
                .insert_header("content-type", "text/html")
                .set_body_string("<html>maintenance</html>"),
        )
        .await;
    }

    /// Serve `keys` only after `delay`.
    pub async fn serve_keys_slowly(&self, keys: Vec<Value>, delay: Duration) {
        self.replace(
            ResponseTemplate::new(200)
                .set_body_json(crate::crypto_fixtures::jwks_document(keys))
                .set_delay(delay),
        )
        .await;
    }

    /// Number of key-set requests received so far.
    pub async fn request_count(&self) -> usize {
        self.server
            .received_requests()
            .await
            .map(|requests| requests.iter().filter(|r| r.url.path() == JWKS_PATH).count())
            .unwrap_or(0)
    }

    async fn replace(&self, response: ResponseTemplate) {
        self.server.reset().await;
        Mock::given(method("GET"))
            .and(path(JWKS_PATH))
            .respond_with(response)
            .mount(&self.server)
            .await;
    }
}
