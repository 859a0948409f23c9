//! In-memory [`CredentialStore`] for tests and ephemeral sessions.

use tokio::sync::Mutex;

use crate::credentials::{CredentialStore, StoredCredentials};

#[derive(Debug, Default)]
pub struct InMemoryCredentialStore {
    inner: Mutex<StoredCredentials>,
}

impl InMemoryCredentialStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-seeded store, for tests that start from a persisted session.
    pub fn with_credentials(credentials: StoredCredentials) -> Self {
        Self {
            inner: Mutex::new(credentials),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn load(&self) -> anyhow::Result<StoredCredentials> {
        Ok(self.inner.lock().await.clone())
    }

    async fn store(&self, credentials: &StoredCredentials) -> anyhow::Result<()> {
        *self.inner.lock().await = credentials.clone();
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        *self.inner.lock().await = StoredCredentials::default();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn round_trips_the_credential_pair() {
        let store = InMemoryCredentialStore::new();
        let creds = StoredCredentials::new(Some("a".to_string()), Some("r".to_string()));

        store.store(&creds).await.unwrap();
        assert_eq!(store.load().await.unwrap(), creds);
    }

    #[tokio::test]
    async fn clear_empties_both_entries() {
        let store = InMemoryCredentialStore::with_credentials(StoredCredentials::new(
            Some("a".to_string()),
            Some("r".to_string()),
        ));

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }
}
