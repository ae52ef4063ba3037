//! SQLite credential store.
//!
//! Implements `CredentialStore` from `prpsmith-core`. Keys are encrypted with
//! the vault before they reach the database and decrypted on load; the
//! database only ever sees ciphertext.

use std::collections::BTreeMap;
use std::path::Path;

use chrono::{DateTime, Utc};
use sqlx::Row;
use tracing::{debug, warn};

use prpsmith_core::repository::credential::CredentialStore;
use prpsmith_types::credential::{CredentialRecord, StoredCredential};
use prpsmith_types::error::RepositoryError;

use super::pool::{DatabasePool, database_url};
use crate::crypto::vault::VaultCrypto;

/// File name of the vault key inside the data directory.
pub const KEY_FILE: &str = "credentials.key";

pub struct SqliteCredentialStore {
    pool: DatabasePool,
    vault: VaultCrypto,
}

impl SqliteCredentialStore {
    pub fn new(pool: DatabasePool, vault: VaultCrypto) -> Self {
        Self { pool, vault }
    }

    /// Open (or create) the database and key file in `data_dir`.
    ///
    /// Idempotent: a second call on the same directory reuses both.
    pub async fn initialize(data_dir: &Path) -> Result<Self, RepositoryError> {
        tokio::fs::create_dir_all(data_dir)
            .await
            .map_err(|e| RepositoryError::Connection(format!("{}: {e}", data_dir.display())))?;

        let pool = DatabasePool::new(&database_url(data_dir))
            .await
            .map_err(|e| RepositoryError::Connection(e.to_string()))?;

        let vault = VaultCrypto::from_key_file(&data_dir.join(KEY_FILE))
            .map_err(|e| RepositoryError::Crypto(e.to_string()))?;

        debug!(path = %data_dir.display(), "credential store ready");
        Ok(Self::new(pool, vault))
    }

    fn encrypt(&self, api_key: &str) -> Result<Vec<u8>, RepositoryError> {
        if api_key.is_empty() {
            return Ok(Vec::new());
        }
        self.vault
            .encrypt(api_key.as_bytes())
            .map_err(|e| RepositoryError::Crypto(e.to_string()))
    }

    /// Decrypt one secret. Failures are logged and read as "no key".
    fn decrypt(&self, provider: &str, secret: &[u8]) -> String {
        if secret.is_empty() {
            return String::new();
        }
        match self.vault.decrypt(secret) {
            Ok(plaintext) => String::from_utf8(plaintext).unwrap_or_else(|_| {
                warn!(provider, "stored key is not valid UTF-8, ignoring");
                String::new()
            }),
            Err(e) => {
                warn!(provider, error = %e, "failed to decrypt stored key, ignoring");
                String::new()
            }
        }
    }
}

fn parse_datetime(s: &str) -> Result<DateTime<Utc>, RepositoryError> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Query(format!("invalid datetime: {e}")))
}

fn query_err(e: sqlx::Error) -> RepositoryError {
    RepositoryError::Query(e.to_string())
}

impl CredentialStore for SqliteCredentialStore {
    async fn save(
        &self,
        credentials: &BTreeMap<String, StoredCredential>,
    ) -> Result<(), RepositoryError> {
        // Encrypt everything up front so a crypto failure writes nothing.
        let mut rows = Vec::with_capacity(credentials.len());
        for (provider, credential) in credentials {
            let secret = self.encrypt(credential.api_key.expose())?;
            rows.push((provider, secret, credential.model()));
        }

        let now = Utc::now().to_rfc3339();
        let mut tx = self.pool.writer.begin().await.map_err(query_err)?;
        for (provider, secret, model) in &rows {
            sqlx::query(
                "INSERT INTO api_keys (provider, secret, model, updated_at)
                 VALUES (?, ?, ?, ?)
                 ON CONFLICT(provider) DO UPDATE SET
                    secret = excluded.secret,
                    model = excluded.model,
                    updated_at = excluded.updated_at",
            )
            .bind(provider.as_str())
            .bind(secret)
            .bind(*model)
            .bind(&now)
            .execute(&mut *tx)
            .await
            .map_err(query_err)?;
        }
        tx.commit().await.map_err(query_err)?;

        debug!(count = rows.len(), "saved credentials");
        Ok(())
    }

    async fn load(&self) -> Result<BTreeMap<String, StoredCredential>, RepositoryError> {
        let rows = sqlx::query("SELECT provider, secret, model FROM api_keys ORDER BY provider")
            .fetch_all(&self.pool.reader)
            .await
            .map_err(query_err)?;

        let mut credentials = BTreeMap::new();
        for row in &rows {
            let provider: String = row.try_get("provider").map_err(query_err)?;
            let secret: Vec<u8> = row.try_get("secret").map_err(query_err)?;
            let model: Option<String> = row.try_get("model").map_err(query_err)?;

            let api_key = self.decrypt(&provider, &secret);
            credentials.insert(provider, StoredCredential::new(api_key, model));
        }
        Ok(credentials)
    }

    async fn records(&self) -> Result<Vec<CredentialRecord>, RepositoryError> {
        let rows = sqlx::query(
            "SELECT provider, secret, model, updated_at FROM api_keys ORDER BY provider",
        )
        .fetch_all(&self.pool.reader)
        .await
        .map_err(query_err)?;

        rows.iter()
            .map(|row| -> Result<CredentialRecord, RepositoryError> {
                let updated_at: String = row.try_get("updated_at").map_err(query_err)?;
                Ok(CredentialRecord {
                    provider: row.try_get("provider").map_err(query_err)?,
                    encrypted_secret: row.try_get("secret").map_err(query_err)?,
                    model: row.try_get("model").map_err(query_err)?,
                    updated_at: parse_datetime(&updated_at)?,
                })
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn creds(entries: &[(&str, &str, Option<&str>)]) -> BTreeMap<String, StoredCredential> {
        entries
            .iter()
            .map(|(p, k, m)| (p.to_string(), StoredCredential::new(*k, m.map(str::to_string))))
            .collect()
    }

    #[tokio::test]
    async fn test_save_then_load_returns_same_values() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteCredentialStore::initialize(tmp.path()).await.unwrap();

        let input = creds(&[("openai", "sk-test", Some("gpt-4o"))]);
        store.save(&input).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded, input);
        assert_eq!(loaded["openai"].api_key(), Some("sk-test"));
        assert_eq!(loaded["openai"].model(), Some("gpt-4o"));
    }

    #[tokio::test]
    async fn test_secrets_are_encrypted_at_rest() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteCredentialStore::initialize(tmp.path()).await.unwrap();
        store
            .save(&creds(&[("anthropic", "sk-ant-plaintext", None)]))
            .await
            .unwrap();

        let records = store.records().await.unwrap();
        assert_eq!(records.len(), 1);
        let raw = &records[0].encrypted_secret;
        assert!(raw.len() > 12);
        assert!(!raw.windows(16).any(|w| w == b"sk-ant-plaintext"));
    }

    #[tokio::test]
    async fn test_empty_key_stored_as_empty_ciphertext() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteCredentialStore::initialize(tmp.path()).await.unwrap();
        store
            .save(&creds(&[("gemini", "", Some("gemini-2.5-pro"))]))
            .await
            .unwrap();

        let records = store.records().await.unwrap();
        assert!(records[0].encrypted_secret.is_empty());
        let loaded = store.load().await.unwrap();
        assert_eq!(loaded["gemini"].api_key(), None);
        assert_eq!(loaded["gemini"].model(), Some("gemini-2.5-pro"));
    }

    #[tokio::test]
    async fn test_save_leaves_other_providers_untouched() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteCredentialStore::initialize(tmp.path()).await.unwrap();
        store
            .save(&creds(&[
                ("openai", "sk-one", Some("gpt-4o")),
                ("deepseek", "ds-one", None),
            ]))
            .await
            .unwrap();

        // A provider's record is replaced wholesale: the model goes too.
        store.save(&creds(&[("openai", "sk-two", None)])).await.unwrap();

        let loaded = store.load().await.unwrap();
        assert_eq!(loaded["openai"], StoredCredential::new("sk-two", None));
        assert_eq!(loaded["deepseek"].api_key(), Some("ds-one"));
    }

    #[tokio::test]
    async fn test_wrong_key_yields_empty_string_without_hiding_others() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteCredentialStore::initialize(tmp.path()).await.unwrap();
        store
            .save(&creds(&[("openai", "sk-old-vault", Some("gpt-4o"))]))
            .await
            .unwrap();

        let rotated = SqliteCredentialStore::new(store.pool.clone(), VaultCrypto::new(&[7u8; 32]));
        rotated
            .save(&creds(&[("gemini", "g-new-vault", None)]))
            .await
            .unwrap();

        let loaded = rotated.load().await.unwrap();
        assert_eq!(loaded["openai"].api_key(), None);
        assert_eq!(loaded["openai"].model(), Some("gpt-4o"));
        assert_eq!(loaded["gemini"].api_key(), Some("g-new-vault"));
    }

    #[tokio::test]
    async fn test_initialize_is_idempotent() {
        let tmp = TempDir::new().unwrap();
        {
            let store = SqliteCredentialStore::initialize(tmp.path()).await.unwrap();
            store
                .save(&creds(&[("openrouter", "or-key", None)]))
                .await
                .unwrap();
        }

        let reopened = SqliteCredentialStore::initialize(tmp.path()).await.unwrap();
        let loaded = reopened.load().await.unwrap();
        assert_eq!(loaded["openrouter"].api_key(), Some("or-key"));
        assert!(tmp.path().join(KEY_FILE).exists());
    }

    #[tokio::test]
    async fn test_records_carry_timestamps() {
        let tmp = TempDir::new().unwrap();
        let store = SqliteCredentialStore::initialize(tmp.path()).await.unwrap();
        let before = Utc::now() - chrono::Duration::seconds(1);
        store
            .save(&creds(&[("openai", "a", None), ("anthropic", "b", None)]))
            .await
            .unwrap();

        let records = store.records().await.unwrap();
        let providers: Vec<&str> = records.iter().map(|r| r.provider.as_str()).collect();
        assert_eq!(providers, vec!["anthropic", "openai"]);
        assert!(records.iter().all(|r| r.updated_at >= before));
    }
}
