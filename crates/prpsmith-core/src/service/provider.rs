//! Provider credential service.
//!
//! Ties the credential store to the registry and the client factory: every
//! write is followed by a sync, and a sync invalidates the cached clients of
//! providers whose key or model changed.

use std::collections::BTreeMap;
use std::sync::Arc;

use tracing::info;

use prpsmith_types::credential::{CredentialSummary, StoredCredential, mask_secret};
use prpsmith_types::error::RepositoryError;
use prpsmith_types::provider::ProviderId;

use crate::llm::factory::ClientFactory;
use crate::repository::credential::CredentialStore;

pub struct ProviderService<S: CredentialStore> {
    store: S,
    factory: Arc<ClientFactory>,
}

impl<S: CredentialStore> ProviderService<S> {
    pub fn new(store: S, factory: Arc<ClientFactory>) -> Self {
        Self { store, factory }
    }

    pub fn factory(&self) -> &Arc<ClientFactory> {
        &self.factory
    }

    /// Reload the store into the registry and drop stale cached clients.
    ///
    /// The registry lock is not held while the store is read.
    pub async fn sync(&self) -> Result<Vec<ProviderId>, RepositoryError> {
        let snapshot = self.store.load().await?;
        let changed = self
            .factory
            .registry()
            .write()
            .await
            .sync_from_store(&snapshot);
        self.factory.invalidate(&changed);
        if !changed.is_empty() {
            info!(providers = ?changed, "provider credentials synchronized");
        }
        Ok(changed)
    }

    /// Persist `credentials` wholesale per provider, then sync.
    pub async fn save_credentials(
        &self,
        credentials: &BTreeMap<ProviderId, StoredCredential>,
    ) -> Result<Vec<ProviderId>, RepositoryError> {
        let by_name: BTreeMap<String, StoredCredential> = credentials
            .iter()
            .map(|(id, cred)| (id.as_str().to_string(), cred.clone()))
            .collect();
        self.store.save(&by_name).await?;
        self.sync().await
    }

    /// Change the key and/or model of one provider, keeping whichever field
    /// is not given.
    pub async fn update_credential(
        &self,
        provider: ProviderId,
        api_key: Option<&str>,
        model: Option<&str>,
    ) -> Result<Vec<ProviderId>, RepositoryError> {
        let current = self
            .store
            .load()
            .await?
            .remove(provider.as_str())
            .unwrap_or_default();

        let updated = StoredCredential::new(
            api_key.unwrap_or(current.api_key.expose()),
            model.map(str::to_string).or(current.model),
        );
        self.save_credentials(&BTreeMap::from([(provider, updated)]))
            .await
    }

    /// Remove the stored key and model of one provider.
    pub async fn clear_credential(
        &self,
        provider: ProviderId,
    ) -> Result<Vec<ProviderId>, RepositoryError> {
        self.save_credentials(&BTreeMap::from([(provider, StoredCredential::default())]))
            .await
    }

    /// Stored credentials with masked keys, ordered by provider.
    pub async fn list_credentials(&self) -> Result<Vec<CredentialSummary>, RepositoryError> {
        let decrypted = self.store.load().await?;
        let records = self.store.records().await?;
        Ok(records
            .into_iter()
            .map(|record| {
                let stored = decrypted.get(&record.provider);
                CredentialSummary {
                    masked_key: stored
                        .and_then(StoredCredential::api_key)
                        .map(mask_secret)
                        .unwrap_or_default(),
                    model: record.model,
                    provider: record.provider,
                    updated_at: record.updated_at,
                }
            })
            .collect())
    }
}
