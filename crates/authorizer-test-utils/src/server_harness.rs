//! Test server harness for E2E testing
//!
//! Provides `TestAuthorizerServer` for spawning real authorizer instances in tests.

use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, OnceLock};
use todo_authorizer::config::Config;
use todo_authorizer::observability::metrics::init_metrics_recorder;
use todo_authorizer::routes::{self, AppState};
use tokio::task::JoinHandle;

/// Global metrics handle shared by every test server in the process.
static TEST_METRICS_HANDLE: OnceLock<PrometheusHandle> = OnceLock::new();

/// Handle to the process-wide recorder, installing it on first use.
///
/// If another recorder is already installed, a standalone (uninstalled)
/// recorder's handle is returned instead.
pub fn test_metrics_handle() -> PrometheusHandle {
    TEST_METRICS_HANDLE
        .get_or_init(|| {
            init_metrics_recorder()
                .unwrap_or_else(|_| PrometheusBuilder::new().build_recorder().handle())
        })
        .clone()
}

/// Test harness for spawning the authorizer in E2E tests.
///
/// # Example
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_health() -> Result<()> {
///     let jwks = MockJwksServer::start().await;
///     let server = TestAuthorizerServer::spawn(&jwks.jwks_url()).await?;
///
///     let response = reqwest::get(format!("{}/health", server.url())).await?;
///     assert_eq!(response.status(), 200);
///     Ok(())
/// }
/// ```
pub struct TestAuthorizerServer {
    addr: SocketAddr,
    config: Config,
    _handle: JoinHandle<()>,
}

impl TestAuthorizerServer {
    /// Spawn a server that resolves keys from `jwks_url`.
    ///
    /// The server binds to a random port on 127.0.0.1 and serves in the
    /// background until dropped.
    pub async fn spawn(jwks_url: &str) -> Result<Self, anyhow::Error> {
        Self::spawn_with_vars(jwks_url, HashMap::new()).await
    }

    /// Spawn with additional environment-style configuration
    /// (e.g. `AUTH_AUDIENCE`, `JWT_CLOCK_SKEW_SECONDS`).
    pub async fn spawn_with_vars(
        jwks_url: &str,
        extra_vars: HashMap<String, String>,
    ) -> Result<Self, anyhow::Error> {
        let mut vars = HashMap::from([
            ("JWKS_URL".to_string(), jwks_url.to_string()),
            ("BIND_ADDRESS".to_string(), "127.0.0.1:0".to_string()),
            ("JWKS_FETCH_TIMEOUT_SECONDS".to_string(), "2".to_string()),
        ]);
        vars.extend(extra_vars);

        let config = Config::from_vars(&vars)
            .map_err(|e| anyhow::anyhow!("Failed to create config: {}", e))?;

        let state = Arc::new(AppState::from_config(config.clone()));
        let app = routes::build_routes(state, test_metrics_handle());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .map_err(|e| anyhow::anyhow!("Failed to bind test server: {}", e))?;

        let addr = listener
            .local_addr()
            .map_err(|e| anyhow::anyhow!("Failed to get local address: {}", e))?;

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                eprintln!("Test server error: {}", e);
            }
        });

        Ok(Self {
            addr,
            config,
            _handle: handle,
        })
    }

    /// Get the base URL of the test server.
    pub fn url(&self) -> String {
        format!("http://{}", self.addr)
    }

    /// URL of the authorization endpoint.
    pub fn authorize_url(&self) -> String {
        format!("{}/v1/authorize", self.url())
    }

    /// Get the socket address.
    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// Get reference to the server configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }
}

impl Drop for TestAuthorizerServer {
    fn drop(&mut self) {
        self._handle.abort();
    }
}
