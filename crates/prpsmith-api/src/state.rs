//! Application state wiring all services together.
//!
//! AppState pins the core services to the concrete infra implementations:
//! the registry reads the environment layered over `config.toml`, the
//! factory uses the HTTP adapter table and credentials live in SQLite.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use tokio::sync::RwLock;

use prpsmith_core::generation::form_filler::FormFiller;
use prpsmith_core::generation::prp::PrpGenerator;
use prpsmith_core::llm::factory::ClientFactory;
use prpsmith_core::llm::registry::ProviderRegistry;
use prpsmith_core::service::provider::ProviderService;
use prpsmith_infra::config::env_lookup;
use prpsmith_infra::llm::default_constructors;
use prpsmith_infra::sqlite::credential::SqliteCredentialStore;
use prpsmith_types::config::AppConfig;

pub type ConcreteProviderService = ProviderService<SqliteCredentialStore>;

pub struct AppState {
    pub data_dir: PathBuf,
    pub config: AppConfig,
    pub factory: Arc<ClientFactory>,
    pub provider_service: ConcreteProviderService,
}

impl AppState {
    /// Open the credential store under `data_dir` and sync it into a
    /// registry built from `config` and the environment.
    pub async fn with_config(data_dir: PathBuf, config: AppConfig) -> anyhow::Result<Self> {
        let registry = ProviderRegistry::build_defaults(env_lookup(&config));
        let factory = Arc::new(ClientFactory::new(
            Arc::new(RwLock::new(registry)),
            default_constructors(),
        ));

        let store = SqliteCredentialStore::initialize(&data_dir)
            .await
            .with_context(|| format!("failed to open credential store in {}", data_dir.display()))?;
        let provider_service = ProviderService::new(store, Arc::clone(&factory));
        provider_service
            .sync()
            .await
            .context("failed to load stored credentials")?;

        for warning in factory.registry().read().await.validate() {
            tracing::warn!("{warning}");
        }

        Ok(Self {
            data_dir,
            config,
            factory,
            provider_service,
        })
    }

    pub fn form_filler(&self) -> FormFiller {
        FormFiller::new(Arc::clone(&self.factory))
    }

    pub fn prp_generator(&self) -> PrpGenerator {
        PrpGenerator::new(Arc::clone(&self.factory))
    }
}
