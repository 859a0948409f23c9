//! Wire contract for the authorization service.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use parapet_risk::{AccessPatternEvent, RiskProfile};

/// Transport-level failures.
///
/// Every variant resolves to a fail-closed denial at the decision site;
/// none of them propagate to consumers of the engine.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ApiError {
    #[error("network error: {0}")]
    Network(String),

    #[error("API error ({0}): {1}")]
    Api(u16, String),

    #[error("parse error: {0}")]
    Parse(String),
}

/// Body of `POST /permission-check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionCheckRequest {
    pub resource: String,
    pub action: String,
    /// Free-form context forwarded to the server-side risk model.
    #[serde(default)]
    pub context: serde_json::Value,
}

impl PermissionCheckRequest {
    pub fn new(resource: impl Into<String>, action: impl Into<String>) -> Self {
        Self {
            resource: resource.into(),
            action: action.into(),
            context: serde_json::Value::Null,
        }
    }

    pub fn with_context(mut self, context: serde_json::Value) -> Self {
        self.context = context;
        self
    }
}

/// Response of `POST /permission-check`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionCheckResponse {
    pub allowed: bool,
    #[serde(default)]
    pub ai_analysis: Option<AiAnalysis>,
}

/// Server-side risk analysis attached to a permission check.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AiAnalysis {
    pub risk_score: f64,
    #[serde(default)]
    pub anomalies: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Response of `POST /refresh-permissions`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PermissionRefreshResponse {
    /// Full replacement for the granted-permission list.
    #[serde(default)]
    pub permissions: Vec<String>,

    /// Predicted risk per resource, replacing earlier predictions.
    #[serde(default)]
    pub ai_predictions: HashMap<String, f64>,

    /// Fresh risk profile, when the server recomputed one.
    #[serde(default)]
    pub risk_profile: Option<RiskProfile>,
}

/// Response of `POST /token/refresh`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TokenRefreshResponse {
    pub access: String,
    /// Present when the server rotates refresh credentials.
    #[serde(default)]
    pub refresh: Option<String>,
}

/// The authorization service endpoints the engine depends on.
///
/// `token` arguments are raw bearer tokens; callers own session state and
/// decide which token is current. Implementations must not retry: retry
/// policy (there is none for telemetry, one attempt for refresh) belongs
/// to the engine.
#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// `POST /permission-check`.
    async fn check_permission(
        &self,
        token: &str,
        request: &PermissionCheckRequest,
    ) -> Result<PermissionCheckResponse, ApiError>;

    /// `POST /refresh-permissions`.
    async fn refresh_permissions(&self, token: &str)
    -> Result<PermissionRefreshResponse, ApiError>;

    /// `POST /log-access-pattern`. The response body is ignored; a non-2xx
    /// status still surfaces as an error so the caller can count the loss.
    async fn log_access_pattern(
        &self,
        token: &str,
        event: &AccessPatternEvent,
    ) -> Result<(), ApiError>;

    /// `POST /token/refresh`. Authenticated by the refresh credential
    /// itself, not a bearer header.
    async fn refresh_token(&self, refresh: &str) -> Result<TokenRefreshResponse, ApiError>;

    /// `POST /logout`. Best-effort server-side invalidation.
    async fn logout(&self, token: &str, refresh: &str) -> Result<(), ApiError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_request_serializes_with_null_context_by_default() {
        let request = PermissionCheckRequest::new("reports", "view");
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["resource"], "reports");
        assert_eq!(json["action"], "view");
        assert!(json["context"].is_null());
    }

    #[test]
    fn check_response_tolerates_a_missing_analysis_block() {
        let response: PermissionCheckResponse =
            serde_json::from_str(r#"{"allowed": true}"#).unwrap();
        assert!(response.allowed);
        assert!(response.ai_analysis.is_none());
    }

    #[test]
    fn refresh_response_defaults_every_section() {
        let response: PermissionRefreshResponse = serde_json::from_str("{}").unwrap();
        assert!(response.permissions.is_empty());
        assert!(response.ai_predictions.is_empty());
        assert!(response.risk_profile.is_none());
    }

    #[test]
    fn token_refresh_response_keeps_an_unrotated_refresh_absent() {
        let response: TokenRefreshResponse =
            serde_json::from_str(r#"{"access": "tok"}"#).unwrap();
        assert_eq!(response.access, "tok");
        assert!(response.refresh.is_none());
    }
}
