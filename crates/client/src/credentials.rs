//! Durable storage for the session's credential pair.

/// The access/refresh token pair as persisted between runs.
///
/// Either half may be absent: a first run has neither, and a server that
/// does not rotate refresh credentials leaves the old one in place.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StoredCredentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl StoredCredentials {
    pub fn new(
        access_token: impl Into<Option<String>>,
        refresh_token: impl Into<Option<String>>,
    ) -> Self {
        Self {
            access_token: access_token.into(),
            refresh_token: refresh_token.into(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Key-value persistence for [`StoredCredentials`].
///
/// Failures surface as `anyhow::Error`; the engine degrades them to "no
/// persisted session" rather than refusing to start. `clear` removes both
/// entries together.
#[async_trait::async_trait]
pub trait CredentialStore: Send + Sync {
    async fn load(&self) -> anyhow::Result<StoredCredentials>;

    async fn store(&self, credentials: &StoredCredentials) -> anyhow::Result<()>;

    async fn clear(&self) -> anyhow::Result<()>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_credentials_are_empty() {
        assert!(StoredCredentials::default().is_empty());
    }

    #[test]
    fn a_lone_refresh_token_is_not_empty() {
        let creds = StoredCredentials::new(None, Some("refresh".to_string()));
        assert!(!creds.is_empty());
    }
}
