//! Authorization endpoint handlers.
//!
//! Both endpoints answer 200 with a decision document, allow or deny. A
//! request that cannot be understood is a deny, never an HTTP error, so the
//! gateway always receives a policy it can apply.

use crate::models::{AuthorizationDecision, AuthorizerRequest};
use crate::routes::AppState;
use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::{header::AUTHORIZATION, HeaderMap};
use axum::Json;
use std::sync::Arc;

/// Handler for POST /v1/authorize
///
/// Accepts a token-authorizer event:
/// `{"type": "TOKEN", "authorizationToken": "Bearer ...", "methodArn": "..."}`.
#[tracing::instrument(skip_all, name = "authorizer.http.authorize_event")]
pub async fn authorize_event(
    State(state): State<Arc<AppState>>,
    event: Result<Json<AuthorizerRequest>, JsonRejection>,
) -> Json<AuthorizationDecision> {
    let Json(event) = match event {
        Ok(event) => event,
        Err(rejection) => {
            tracing::debug!(target: "authorizer.http", error = %rejection, "Unreadable authorizer event");
            return Json(state.authorizer.authorize(None).await);
        }
    };

    tracing::debug!(
        target: "authorizer.http",
        event_type = event.event_type.as_deref().unwrap_or("unknown"),
        method_arn = event.method_arn.as_deref().unwrap_or(""),
        "Authorizer event received"
    );

    Json(
        state
            .authorizer
            .authorize(event.authorization_token.as_deref())
            .await,
    )
}

/// Handler for GET /v1/authorize
///
/// Reads the request's own `Authorization` header. A header that is not
/// visible ASCII is treated as missing.
#[tracing::instrument(skip_all, name = "authorizer.http.authorize_header")]
pub async fn authorize_header(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
) -> Json<AuthorizationDecision> {
    let header = headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok());

    Json(state.authorizer.authorize(header).await)
}
