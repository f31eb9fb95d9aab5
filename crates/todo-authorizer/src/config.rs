//! Authorizer configuration.
//!
//! Configuration is loaded from environment variables. The JWKS endpoint is
//! the only required value; it is handed to the key-set resolver explicitly
//! rather than read from ambient state at request time.

use common::jwt::{DEFAULT_CLOCK_SKEW, MAX_CLOCK_SKEW};
use std::collections::HashMap;
use std::env;
use std::time::Duration;
use thiserror::Error;

/// Default server bind address.
pub const DEFAULT_BIND_ADDRESS: &str = "0.0.0.0:8080";

/// Default JWKS fetch timeout in seconds.
pub const DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 10;

/// Upper bound for the JWKS fetch timeout.
pub const MAX_JWKS_FETCH_TIMEOUT_SECONDS: u64 = 60;

/// Log output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

/// Authorizer configuration.
///
/// Loaded from environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// URL of the identity provider's JWKS document.
    pub jwks_url: String,

    /// Server bind address (default: "0.0.0.0:8080").
    pub bind_address: String,

    /// Clock skew tolerance in seconds for `exp`/`nbf`/`iat` validation.
    pub jwt_clock_skew_seconds: u64,

    /// Timeout for a single JWKS fetch.
    pub jwks_fetch_timeout_seconds: u64,

    /// Expected `aud` claim. Unchecked when unset.
    pub audience: Option<String>,

    /// Expected `iss` claim. Unchecked when unset.
    pub issuer: Option<String>,

    /// Log output format (`LOG_FORMAT=text|json`).
    pub log_format: LogFormat,
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("Invalid JWKS URL: {0}")]
    InvalidJwksUrl(String),

    #[error("Invalid JWT clock skew configuration: {0}")]
    InvalidJwtClockSkew(String),

    #[error("Invalid JWKS fetch timeout configuration: {0}")]
    InvalidJwksFetchTimeout(String),

    #[error("Invalid log format: {0}")]
    InvalidLogFormat(String),
}

impl Config {
    /// Load configuration from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_vars(&env::vars().collect())
    }

    /// Load configuration from a HashMap (for testing).
    pub fn from_vars(vars: &HashMap<String, String>) -> Result<Self, ConfigError> {
        let jwks_url = vars
            .get("JWKS_URL")
            .ok_or_else(|| ConfigError::MissingEnvVar("JWKS_URL".to_string()))?
            .trim()
            .to_string();

        if !(jwks_url.starts_with("https://") || jwks_url.starts_with("http://")) {
            return Err(ConfigError::InvalidJwksUrl(format!(
                "JWKS_URL must be an http(s) URL, got '{}'",
                jwks_url
            )));
        }

        let bind_address = vars
            .get("BIND_ADDRESS")
            .cloned()
            .unwrap_or_else(|| DEFAULT_BIND_ADDRESS.to_string());

        // Parse JWT clock skew tolerance with validation
        let jwt_clock_skew_seconds = if let Some(value_str) = vars.get("JWT_CLOCK_SKEW_SECONDS") {
            let value: u64 = value_str.parse().map_err(|e| {
                ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must be a non-negative integer, got '{}': {}",
                    value_str, e
                ))
            })?;

            if value > MAX_CLOCK_SKEW.as_secs() {
                return Err(ConfigError::InvalidJwtClockSkew(format!(
                    "JWT_CLOCK_SKEW_SECONDS must not exceed {} seconds, got {}",
                    MAX_CLOCK_SKEW.as_secs(),
                    value
                )));
            }

            value
        } else {
            DEFAULT_CLOCK_SKEW.as_secs()
        };

        let jwks_fetch_timeout_seconds =
            if let Some(value_str) = vars.get("JWKS_FETCH_TIMEOUT_SECONDS") {
                let value: u64 = value_str.parse().map_err(|e| {
                    ConfigError::InvalidJwksFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be a valid positive integer, got '{}': {}",
                        value_str, e
                    ))
                })?;

                if value == 0 || value > MAX_JWKS_FETCH_TIMEOUT_SECONDS {
                    return Err(ConfigError::InvalidJwksFetchTimeout(format!(
                        "JWKS_FETCH_TIMEOUT_SECONDS must be between 1 and {}, got {}",
                        MAX_JWKS_FETCH_TIMEOUT_SECONDS, value
                    )));
                }

                value
            } else {
                DEFAULT_JWKS_FETCH_TIMEOUT_SECONDS
            };

        let audience = non_empty(vars, "AUTH_AUDIENCE");
        let issuer = non_empty(vars, "AUTH_ISSUER");

        let log_format = match vars.get("LOG_FORMAT").map(|s| s.to_ascii_lowercase()) {
            None => LogFormat::default(),
            Some(s) if s == "text" => LogFormat::Text,
            Some(s) if s == "json" => LogFormat::Json,
            Some(other) => {
                return Err(ConfigError::InvalidLogFormat(format!(
                    "LOG_FORMAT must be 'text' or 'json', got '{}'",
                    other
                )))
            }
        };

        Ok(Config {
            jwks_url,
            bind_address,
            jwt_clock_skew_seconds,
            jwks_fetch_timeout_seconds,
            audience,
            issuer,
            log_format,
        })
    }

    /// Clock skew tolerance as a `Duration`.
    pub fn clock_skew(&self) -> Duration {
        Duration::from_secs(self.jwt_clock_skew_seconds)
    }

    /// JWKS fetch timeout as a `Duration`.
    pub fn jwks_fetch_timeout(&self) -> Duration {
        Duration::from_secs(self.jwks_fetch_timeout_seconds)
    }
}

fn non_empty(vars: &HashMap<String, String>, key: &str) -> Option<String> {
    vars.get(key)
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}
