//! SQLite-backed [`CredentialStore`].

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use chrono::Utc;
use sqlx::sqlite::SqliteConnectOptions;
use sqlx::{Row, SqlitePool};
use tokio::sync::Mutex;

use crate::credentials::{CredentialStore, StoredCredentials};

const ACCESS_TOKEN_KEY: &str = "access_token";
const REFRESH_TOKEN_KEY: &str = "refresh_token";

/// Durable credential storage in a small key-value table.
///
/// The pool is initialized lazily on first use so constructing the store
/// never touches the filesystem; cloning shares the pool.
#[derive(Debug, Clone)]
pub struct SqliteCredentialStore {
    pool: Arc<Mutex<Option<SqlitePool>>>,
    db_path: PathBuf,
}

impl SqliteCredentialStore {
    /// Store at the default OS data location
    /// (`{app_data_dir}/parapet/credentials.db`).
    pub fn new() -> anyhow::Result<Self> {
        Ok(Self::at_path(credentials_db_path()?))
    }

    /// Store at an explicit path.
    pub fn at_path(db_path: impl Into<PathBuf>) -> Self {
        Self {
            pool: Arc::new(Mutex::new(None)),
            db_path: db_path.into(),
        }
    }

    async fn ensure_initialized(&self) -> anyhow::Result<()> {
        let mut pool_guard = self.pool.lock().await;
        if pool_guard.is_some() {
            return Ok(());
        }

        if let Some(parent) = self.db_path.parent() {
            std::fs::create_dir_all(parent)
                .with_context(|| format!("failed to create credential directory at {:?}", parent))?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&self.db_path)
            .create_if_missing(true);

        let pool = SqlitePool::connect_with(options)
            .await
            .with_context(|| format!("failed to open credential database at {:?}", self.db_path))?;

        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS credentials (
                key        TEXT PRIMARY KEY,
                value      TEXT NOT NULL,
                updated_at TEXT NOT NULL
            )
            "#,
        )
        .execute(&pool)
        .await
        .context("failed to create credentials table")?;

        *pool_guard = Some(pool);
        Ok(())
    }

    async fn get_pool(&self) -> anyhow::Result<SqlitePool> {
        self.ensure_initialized().await?;
        let pool_guard = self.pool.lock().await;
        pool_guard
            .clone()
            .context("credential pool missing after initialization")
    }

    async fn put(&self, pool: &SqlitePool, key: &str, value: Option<&str>) -> anyhow::Result<()> {
        match value {
            Some(value) => {
                sqlx::query(
                    r#"
                    INSERT INTO credentials (key, value, updated_at)
                    VALUES (?1, ?2, ?3)
                    ON CONFLICT(key) DO UPDATE SET
                        value = excluded.value,
                        updated_at = excluded.updated_at
                    "#,
                )
                .bind(key)
                .bind(value)
                .bind(Utc::now().to_rfc3339())
                .execute(pool)
                .await
                .with_context(|| format!("failed to upsert credential '{key}'"))?;
            }
            None => {
                sqlx::query("DELETE FROM credentials WHERE key = ?1")
                    .bind(key)
                    .execute(pool)
                    .await
                    .with_context(|| format!("failed to delete credential '{key}'"))?;
            }
        }
        Ok(())
    }

    async fn get(&self, pool: &SqlitePool, key: &str) -> anyhow::Result<Option<String>> {
        let row = sqlx::query("SELECT value FROM credentials WHERE key = ?1")
            .bind(key)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("failed to fetch credential '{key}'"))?;

        match row {
            Some(row) => Ok(Some(row.try_get("value")?)),
            None => Ok(None),
        }
    }
}

#[async_trait::async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn load(&self) -> anyhow::Result<StoredCredentials> {
        let pool = self.get_pool().await?;
        Ok(StoredCredentials {
            access_token: self.get(&pool, ACCESS_TOKEN_KEY).await?,
            refresh_token: self.get(&pool, REFRESH_TOKEN_KEY).await?,
        })
    }

    async fn store(&self, credentials: &StoredCredentials) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;
        self.put(&pool, ACCESS_TOKEN_KEY, credentials.access_token.as_deref())
            .await?;
        self.put(&pool, REFRESH_TOKEN_KEY, credentials.refresh_token.as_deref())
            .await?;
        Ok(())
    }

    async fn clear(&self) -> anyhow::Result<()> {
        let pool = self.get_pool().await?;
        sqlx::query("DELETE FROM credentials")
            .execute(&pool)
            .await
            .context("failed to clear credentials")?;
        Ok(())
    }
}

/// Resolve `{app_data_dir}/parapet/credentials.db`.
fn credentials_db_path() -> anyhow::Result<PathBuf> {
    let base = dirs::data_dir()
        .or_else(|| {
            dirs::home_dir().map(|mut h| {
                h.push(".local");
                h.push("share");
                h
            })
        })
        .context("failed to resolve OS app data directory - tried data_dir() and home_dir()/.local/share")?;

    let mut path = base;
    path.push("parapet");
    path.push("credentials.db");
    Ok(path)
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_store() -> (tempfile::TempDir, SqliteCredentialStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = SqliteCredentialStore::at_path(dir.path().join("credentials.db"));
        (dir, store)
    }

    #[tokio::test]
    async fn a_fresh_database_loads_empty_credentials() {
        let (_dir, store) = temp_store();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn store_then_load_round_trips_the_pair() {
        let (_dir, store) = temp_store();
        let creds =
            StoredCredentials::new(Some("access-1".to_string()), Some("refresh-1".to_string()));

        store.store(&creds).await.unwrap();
        assert_eq!(store.load().await.unwrap(), creds);
    }

    #[tokio::test]
    async fn storing_a_missing_half_deletes_the_old_entry() {
        let (_dir, store) = temp_store();
        store
            .store(&StoredCredentials::new(
                Some("access-1".to_string()),
                Some("refresh-1".to_string()),
            ))
            .await
            .unwrap();

        store
            .store(&StoredCredentials::new(Some("access-2".to_string()), None))
            .await
            .unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("access-2"));
        assert!(loaded.refresh_token.is_none());
    }

    #[tokio::test]
    async fn clear_removes_both_entries() {
        let (_dir, store) = temp_store();
        store
            .store(&StoredCredentials::new(
                Some("access".to_string()),
                Some("refresh".to_string()),
            ))
            .await
            .unwrap();

        store.clear().await.unwrap();
        assert!(store.load().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn credentials_survive_reopening_the_database() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("credentials.db");

        let first = SqliteCredentialStore::at_path(&path);
        first
            .store(&StoredCredentials::new(
                Some("access".to_string()),
                Some("refresh".to_string()),
            ))
            .await
            .unwrap();
        drop(first);

        let second = SqliteCredentialStore::at_path(&path);
        let loaded = second.load().await.unwrap();
        assert_eq!(loaded.access_token.as_deref(), Some("access"));
        assert_eq!(loaded.refresh_token.as_deref(), Some("refresh"));
    }
}
