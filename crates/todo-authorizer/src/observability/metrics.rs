//! Metrics definitions for the authorizer.
//!
//! All metrics follow Prometheus naming conventions:
//! - `authorizer_` prefix
//! - `_total` suffix for counters
//! - `_seconds` suffix for duration histograms
//!
//! # Cardinality
//!
//! Labels are bounded to prevent cardinality explosion:
//! - `effect`: 2 values (allow, deny)
//! - `reason`: bounded by `AuthError::kind()` plus "none"
//! - `method`: 7 values max (GET, POST, PATCH, DELETE, PUT, HEAD, OPTIONS)
//! - `endpoint`: 5 values (known paths plus "/other")
//! - `status`: success/error/timeout

use metrics::{counter, histogram};
use metrics_exporter_prometheus::{Matcher, PrometheusBuilder, PrometheusHandle};
use std::time::Duration;

/// Initialize Prometheus metrics recorder and return the handle
/// for serving metrics via HTTP.
///
/// Must be called before any metrics are recorded.
///
/// # Errors
///
/// Returns error if Prometheus recorder fails to install (e.g., already installed).
pub fn init_metrics_recorder() -> Result<PrometheusHandle, String> {
    PrometheusBuilder::new()
        // Authorization sits in front of every API call; keep it fast
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_http_request".to_string()),
            &[
                0.005, 0.010, 0.025, 0.050, 0.100, 0.200, 0.300, 0.500, 1.000, 2.000,
            ],
        )
        .map_err(|e| format!("Failed to set HTTP request buckets: {e}"))?
        // JWKS fetch is bounded by the client timeout (max 60s)
        .set_buckets_for_metric(
            Matcher::Prefix("authorizer_jwks_fetch".to_string()),
            &[
                0.010, 0.025, 0.050, 0.100, 0.250, 0.500, 1.000, 2.500, 5.000, 10.000,
            ],
        )
        .map_err(|e| format!("Failed to set JWKS fetch buckets: {e}"))?
        .install_recorder()
        .map_err(|e| format!("Failed to install Prometheus recorder: {e}"))
}

// ============================================================================
// Decision Metrics
// ============================================================================

/// Record an authorization decision.
///
/// Metric: `authorizer_decisions_total`
/// Labels: `effect`, `reason`
///
/// `reason` is "none" for allow decisions and the `AuthError::kind()` label
/// otherwise.
pub fn record_decision(effect: &str, reason: &str) {
    counter!("authorizer_decisions_total",
        "effect" => effect.to_string(),
        "reason" => reason.to_string()
    )
    .increment(1);
}

// ============================================================================
// JWKS Metrics
// ============================================================================

/// Record a key-set fetch.
///
/// Metric: `authorizer_jwks_fetch_duration_seconds`, `authorizer_jwks_fetch_total`
/// Labels: `status`
///
/// Status: "success", "error"
pub fn record_jwks_fetch(status: &str, duration: Duration) {
    histogram!("authorizer_jwks_fetch_duration_seconds",
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_jwks_fetch_total",
        "status" => status.to_string()
    )
    .increment(1);
}

// ============================================================================
// HTTP Request Metrics
// ============================================================================

/// Record HTTP request completion
///
/// Metric: `authorizer_http_requests_total`, `authorizer_http_request_duration_seconds`
/// Labels: `method`, `endpoint`, `status` / `status_code`
///
/// This captures ALL HTTP responses including framework-level errors like
/// 404, 405 and 408.
pub fn record_http_request(method: &str, endpoint: &str, status_code: u16, duration: Duration) {
    let normalized_endpoint = normalize_endpoint(endpoint);
    let status = categorize_status_code(status_code);

    histogram!("authorizer_http_request_duration_seconds",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.to_string(),
        "status" => status.to_string()
    )
    .record(duration.as_secs_f64());

    counter!("authorizer_http_requests_total",
        "method" => method.to_string(),
        "endpoint" => normalized_endpoint.to_string(),
        "status_code" => status_code.to_string()
    )
    .increment(1);
}

/// Categorize HTTP status code into success/error/timeout
fn categorize_status_code(status_code: u16) -> &'static str {
    match status_code {
        200..=299 => "success",
        408 | 504 => "timeout",
        _ => "error",
    }
}

/// Normalize endpoint path to prevent label cardinality explosion.
///
/// Unknown paths collapse to "/other".
fn normalize_endpoint(path: &str) -> &'static str {
    match path {
        "/v1/authorize" => "/v1/authorize",
        "/health" => "/health",
        "/ready" => "/ready",
        "/metrics" => "/metrics",
        _ => "/other",
    }
}
