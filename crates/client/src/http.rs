//! reqwest-backed [`AuthApi`] implementation.

use serde::Serialize;
use serde::de::DeserializeOwned;

use parapet_risk::AccessPatternEvent;

use crate::api::{
    ApiError, AuthApi, PermissionCheckRequest, PermissionCheckResponse,
    PermissionRefreshResponse, TokenRefreshResponse,
};

/// JSON-over-HTTPS client for the authorization service.
///
/// One call per operation, no retries, no request timeout beyond what the
/// transport imposes; the engine treats a slow endpoint as a pending
/// decision, not a failed one.
#[derive(Debug, Clone)]
pub struct HttpAuthApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpAuthApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self {
            base_url,
            client: reqwest::Client::new(),
        }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn post_json<T, B>(&self, path: &str, token: Option<&str>, body: &B) -> Result<T, ApiError>
    where
        T: DeserializeOwned,
        B: Serialize + ?Sized,
    {
        let resp = self.post_raw(path, token, body).await?;
        resp.json::<T>()
            .await
            .map_err(|e| ApiError::Parse(format!("failed to parse {path} response: {e}")))
    }

    /// POST and check the status, discarding whatever body came back.
    async fn post_discard<B>(&self, path: &str, token: Option<&str>, body: &B) -> Result<(), ApiError>
    where
        B: Serialize + ?Sized,
    {
        self.post_raw(path, token, body).await.map(|_| ())
    }

    async fn post_raw<B>(
        &self,
        path: &str,
        token: Option<&str>,
        body: &B,
    ) -> Result<reqwest::Response, ApiError>
    where
        B: Serialize + ?Sized,
    {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self.client.post(&url).json(body);

        if let Some(token) = token {
            req = req.bearer_auth(token);
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Network(e.to_string()))?;

        if resp.status().is_success() {
            Ok(resp)
        } else {
            let status = resp.status().as_u16();
            let error_text = resp.text().await.unwrap_or_default();
            tracing::warn!("POST {path} failed with status {status}");
            Err(ApiError::Api(status, error_text))
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpAuthApi {
    async fn check_permission(
        &self,
        token: &str,
        request: &PermissionCheckRequest,
    ) -> Result<PermissionCheckResponse, ApiError> {
        self.post_json("/permission-check", Some(token), request).await
    }

    async fn refresh_permissions(
        &self,
        token: &str,
    ) -> Result<PermissionRefreshResponse, ApiError> {
        self.post_json("/refresh-permissions", Some(token), &serde_json::json!({})).await
    }

    async fn log_access_pattern(
        &self,
        token: &str,
        event: &AccessPatternEvent,
    ) -> Result<(), ApiError> {
        self.post_discard("/log-access-pattern", Some(token), event).await
    }

    async fn refresh_token(&self, refresh: &str) -> Result<TokenRefreshResponse, ApiError> {
        self.post_json(
            "/token/refresh",
            None,
            &serde_json::json!({ "refresh": refresh }),
        )
        .await
    }

    async fn logout(&self, token: &str, refresh: &str) -> Result<(), ApiError> {
        self.post_discard("/logout", Some(token), &serde_json::json!({ "refresh": refresh }))
            .await
    }
}
