//! LLM client factory.
//!
//! Single point of construction and reuse for provider adapters. Adapters are
//! built through a name-to-constructor table and cached per provider; a cached
//! client is reused while the fingerprint of its resolved configuration is
//! unchanged and rebuilt when it differs.

use std::collections::BTreeMap;
use std::sync::Arc;

use dashmap::DashMap;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tracing::{debug, warn};

use prpsmith_types::error::ClientError;
use prpsmith_types::llm::LlmError;
use prpsmith_types::provider::{
    ProviderConfig, ProviderFamily, ProviderId, ProviderStatus, SessionOverrides,
};

use super::box_provider::BoxLlmProvider;
use super::client::LlmClient;
use super::mock::MockProvider;
use super::registry::ProviderRegistry;

/// Builds an adapter for one provider from its resolved configuration.
///
/// Must not perform network I/O.
pub type ProviderConstructor =
    Arc<dyn Fn(ProviderId, &ProviderConfig) -> Result<BoxLlmProvider, LlmError> + Send + Sync>;

/// Constructor lookup table, keyed by provider.
pub type ConstructorTable = BTreeMap<ProviderId, ProviderConstructor>;

struct CachedClient {
    fingerprint: String,
    client: Arc<LlmClient>,
}

/// Creates and caches [`LlmClient`]s.
///
/// The cache is a `DashMap`, so lookups and inserts from concurrent requests
/// never block each other for longer than a shard lock. Two concurrent misses
/// for the same provider may both construct; the last insert wins.
pub struct ClientFactory {
    registry: Arc<RwLock<ProviderRegistry>>,
    constructors: ConstructorTable,
    cache: DashMap<ProviderId, CachedClient>,
}

impl ClientFactory {
    pub fn new(registry: Arc<RwLock<ProviderRegistry>>, constructors: ConstructorTable) -> Self {
        Self {
            registry,
            constructors,
            cache: DashMap::new(),
        }
    }

    pub fn registry(&self) -> &Arc<RwLock<ProviderRegistry>> {
        &self.registry
    }

    /// Return the client for `name`, constructing it on first use.
    ///
    /// Fails with `UnknownProvider` for names outside the registered set and
    /// with `MissingCredential` when the resolved key is empty; both happen
    /// before any adapter is constructed.
    pub async fn create_client(
        &self,
        name: &str,
        session: &SessionOverrides,
    ) -> Result<Arc<LlmClient>, ClientError> {
        let id: ProviderId = name.parse()?;
        self.client_for(id, session).await
    }

    /// Client for the session's provider, or the registry default.
    pub async fn default_client(
        &self,
        session: &SessionOverrides,
    ) -> Result<Arc<LlmClient>, ClientError> {
        let id = match session.provider() {
            Some(id) => id,
            None => self.registry.read().await.default_provider(),
        };
        self.client_for(id, session).await
    }

    /// Typed form of [`create_client`](Self::create_client).
    pub async fn client_for(
        &self,
        id: ProviderId,
        session: &SessionOverrides,
    ) -> Result<Arc<LlmClient>, ClientError> {
        let config = self.resolve_config(id, session).await?;
        let fingerprint = fingerprint(&config);

        if let Some(cached) = self.cache.get(&id) {
            if cached.fingerprint == fingerprint {
                debug!(provider = %id, "using cached client");
                return Ok(Arc::clone(&cached.client));
            }
        }

        let client = Arc::new(self.construct(id, config)?);
        debug!(provider = %id, model = client.model(), "constructed client");
        self.cache.insert(
            id,
            CachedClient {
                fingerprint,
                client: Arc::clone(&client),
            },
        );
        Ok(client)
    }

    /// Report the status of every provider, in registration order, followed
    /// by `mock`. Never fails.
    pub async fn get_available_providers(
        &self,
        session: &SessionOverrides,
    ) -> Vec<(ProviderId, ProviderStatus)> {
        let mut statuses = Vec::with_capacity(ProviderId::ALL.len());
        for id in ProviderId::ALL {
            let status = match self.resolve_config(id, session).await {
                Ok(config) => match self.construct(id, config) {
                    Ok(_) => ProviderStatus::Available,
                    Err(e) => ProviderStatus::Error(e.to_string()),
                },
                Err(ClientError::MissingCredential { .. }) => ProviderStatus::MissingApiKey,
                Err(e) => ProviderStatus::Error(e.to_string()),
            };
            statuses.push((id, status));
        }
        statuses
    }

    /// True iff `name` resolves to a provider with a usable key. Errors are
    /// reported as `false`.
    pub async fn validate_provider(&self, name: &str, session: &SessionOverrides) -> bool {
        match name.parse::<ProviderId>() {
            Ok(id) => self.resolve_config(id, session).await.is_ok(),
            Err(_) => false,
        }
    }

    /// Drop cached clients for `providers`.
    pub fn invalidate(&self, providers: &[ProviderId]) {
        for id in providers {
            if self.cache.remove(id).is_some() {
                debug!(provider = %id, "invalidated cached client");
            }
        }
    }

    pub fn clear(&self) {
        self.cache.clear();
    }

    /// Number of cached clients.
    pub fn cached(&self) -> usize {
        self.cache.len()
    }

    async fn resolve_config(
        &self,
        id: ProviderId,
        session: &SessionOverrides,
    ) -> Result<ProviderConfig, ClientError> {
        if id == ProviderId::Mock {
            return Ok(ProviderConfig::mock());
        }

        let config = self
            .registry
            .read()
            .await
            .resolve(id, session)
            .ok_or_else(|| ClientError::UnknownProvider {
                name: id.to_string(),
                valid: ProviderId::valid_names(),
            })?;

        if !config.has_api_key() {
            return Err(ClientError::MissingCredential { provider: id });
        }
        Ok(config)
    }

    fn construct(&self, id: ProviderId, config: ProviderConfig) -> Result<LlmClient, ClientError> {
        let provider = match id.family() {
            ProviderFamily::Mock => BoxLlmProvider::new(MockProvider::new(config.default_model.clone())),
            _ => {
                let constructor = self.constructors.get(&id).ok_or_else(|| {
                    ClientError::ProviderConstruction {
                        provider: id,
                        source: LlmError::InvalidRequest(format!("no adapter registered for {id}")),
                    }
                })?;
                constructor(id, &config).map_err(|source| {
                    warn!(provider = %id, error = %source, "failed to construct provider");
                    ClientError::ProviderConstruction {
                        provider: id,
                        source,
                    }
                })?
            }
        };
        Ok(LlmClient::new(id, config, provider))
    }
}

impl std::fmt::Debug for ClientFactory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClientFactory")
            .field("constructors", &self.constructors.keys().collect::<Vec<_>>())
            .field("cached", &self.cache.len())
            .finish()
    }
}

/// SHA-256 over the settings an adapter is built from. The key never leaves
/// this function in clear.
fn fingerprint(config: &ProviderConfig) -> String {
    let mut hasher = Sha256::new();
    hasher.update(config.api_key().unwrap_or_default().as_bytes());
    hasher.update([0]);
    hasher.update(config.default_model.as_bytes());
    hasher.update([0]);
    hasher.update(config.base_url.as_deref().unwrap_or_default().as_bytes());
    hasher.update(config.max_tokens.to_le_bytes());
    format!("{:x}", hasher.finalize())
}
