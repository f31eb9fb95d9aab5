//! Authorizer models.
//!
//! Wire types exchanged with the invoking gateway and the probe endpoints.

use serde::{Deserialize, Serialize};

/// Policy language version understood by the gateway.
pub const POLICY_VERSION: &str = "2012-10-17";

/// The only action an authorizer policy grants or denies.
pub const INVOKE_ACTION: &str = "execute-api:Invoke";

/// Resource scope of every policy statement.
pub const ANY_RESOURCE: &str = "*";

/// Principal asserted by a deny decision.
pub const DENY_PRINCIPAL: &str = "user";

/// Statement effect.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Effect {
    Allow,
    Deny,
}

impl Effect {
    pub fn as_str(&self) -> &'static str {
        match self {
            Effect::Allow => "allow",
            Effect::Deny => "deny",
        }
    }
}

/// One policy statement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Statement {
    pub action: String,
    pub effect: Effect,
    pub resource: String,
}

/// Policy document returned to the gateway.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct PolicyDocument {
    pub version: String,
    pub statement: Vec<Statement>,
}

/// Authorization decision: who the caller is and what they may invoke.
///
/// Serializes as
/// `{"principalId": ..., "policyDocument": {"Version": ..., "Statement": [...]}}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizationDecision {
    pub principal_id: String,
    pub policy_document: PolicyDocument,
}

impl AuthorizationDecision {
    fn with_effect(principal_id: String, effect: Effect) -> Self {
        Self {
            principal_id,
            policy_document: PolicyDocument {
                version: POLICY_VERSION.to_string(),
                statement: vec![Statement {
                    action: INVOKE_ACTION.to_string(),
                    effect,
                    resource: ANY_RESOURCE.to_string(),
                }],
            },
        }
    }

    /// Allow decision for a verified subject.
    pub fn allow(subject: impl Into<String>) -> Self {
        Self::with_effect(subject.into(), Effect::Allow)
    }

    /// Deny decision for the generic principal.
    pub fn deny() -> Self {
        Self::with_effect(DENY_PRINCIPAL.to_string(), Effect::Deny)
    }

    /// Effect of the (single) statement.
    pub fn effect(&self) -> Effect {
        self.policy_document
            .statement
            .first()
            .map_or(Effect::Deny, |s| s.effect)
    }

    pub fn is_allowed(&self) -> bool {
        self.effect() == Effect::Allow
    }
}

/// Token authorizer event delivered by the gateway.
///
/// Only `authorizationToken` is read; `methodArn` is logged for correlation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthorizerRequest {
    #[serde(rename = "type", default)]
    pub event_type: Option<String>,

    #[serde(default)]
    pub authorization_token: Option<String>,

    #[serde(default)]
    pub method_arn: Option<String>,
}

/// Readiness check response.
///
/// Returned by the `/ready` endpoint (readiness probe).
#[derive(Debug, Clone, Serialize)]
pub struct ReadinessResponse {
    /// Service readiness status ("ready" or "not_ready").
    pub status: &'static str,

    /// JWKS endpoint reachability.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub jwks: Option<&'static str>,

    /// Number of usable signing keys published.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub signing_keys: Option<usize>,

    /// Error message (generic, no infrastructure details).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}
