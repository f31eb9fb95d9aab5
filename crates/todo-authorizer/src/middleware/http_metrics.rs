//! HTTP metrics middleware for capturing all request/response metrics
//!
//! Captures metrics for ALL HTTP responses, including framework-level
//! rejections that happen before a handler runs (unknown route, wrong
//! method, request timeout).

use axum::{extract::Request, middleware::Next, response::Response};
use std::time::Instant;

use crate::observability::metrics::record_http_request;

/// Middleware that records HTTP request metrics for all responses
///
/// Applied as the outermost layer to capture all responses.
pub async fn http_metrics_middleware(request: Request, next: Next) -> Response {
    let start = Instant::now();
    let method = request.method().to_string();
    let path = request.uri().path().to_string();

    let response = next.run(request).await;

    let status_code = response.status().as_u16();
    record_http_request(&method, &path, status_code, start.elapsed());

    tracing::debug!(
        target: "authorizer.http",
        method = %method,
        path = %path,
        status = status_code,
        "Request completed"
    );

    response
}
