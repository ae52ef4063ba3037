//! Provider configuration registry.
//!
//! Produces the authoritative [`ProviderConfig`] for every registered
//! provider. Values start from a flat variable source (the process
//! environment layered over `config.toml`), and keys and model overrides
//! are then synchronized from the credential store.
//!
//! Key precedence for a request is session override, then stored key, then
//! environment key, applied per provider.

use std::collections::BTreeMap;

use tracing::{debug, info, warn};

use prpsmith_types::credential::{Redacted, StoredCredential};
use prpsmith_types::provider::{
    ProviderConfig, ProviderId, ProviderInfo, ProviderStatus, ProviderSummary, SessionOverrides,
};

/// Token ceiling when `MAX_TOKENS_PER_REQUEST` is unset.
pub const DEFAULT_MAX_TOKENS: u32 = 8192;

/// Pick the effective API key: session override, then stored, then
/// environment. Empty or blank values count as absent.
pub fn resolve_api_key<'a>(
    session: Option<&'a str>,
    stored: Option<&'a str>,
    env: Option<&'a str>,
) -> Option<&'a str> {
    [session, stored, env]
        .into_iter()
        .flatten()
        .find(|key| !key.trim().is_empty())
}

#[derive(Debug, Clone)]
struct ProviderEntry {
    /// Effective config: stored values over environment values.
    config: ProviderConfig,
    env_api_key: Option<Redacted>,
    stored_api_key: Option<Redacted>,
    env_model: String,
}

impl ProviderEntry {
    fn effective_key(&self, session: Option<&str>) -> Option<String> {
        resolve_api_key(
            session,
            self.stored_api_key.as_ref().map(|k| k.expose()),
            self.env_api_key.as_ref().map(|k| k.expose()),
        )
        .map(str::to_string)
    }
}

/// In-memory table of per-provider settings.
///
/// Constructed explicitly and passed around; tests build independent
/// registries from their own variable maps.
#[derive(Debug, Clone)]
pub struct ProviderRegistry {
    entries: BTreeMap<ProviderId, ProviderEntry>,
    default_provider: ProviderId,
    relaxed: bool,
}

impl ProviderRegistry {
    /// Build one entry per registered provider from `lookup`.
    ///
    /// `lookup` maps variable names (`OPENAI_API_KEY`, `GEMINI_RPM`, ...) to
    /// values. A provider whose key variable is unset gets `api_key = None`.
    pub fn build_defaults<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| {
            lookup(key)
                .map(|v| v.trim().to_string())
                .filter(|v| !v.is_empty())
        };

        let max_tokens = parse_number(&get, "MAX_TOKENS_PER_REQUEST", DEFAULT_MAX_TOKENS);

        let mut entries = BTreeMap::new();
        for id in ProviderId::REGISTERED {
            let env_api_key = id.api_key_var().and_then(&get).map(Redacted::new);
            let env_model = id
                .model_var()
                .and_then(&get)
                .unwrap_or_else(|| id.fallback_model().to_string());
            let rpm_limit = match id.rpm_var() {
                Some(var) => parse_number(&get, var, id.fallback_rpm()),
                None => id.fallback_rpm(),
            };
            let base_url = id
                .base_url_var()
                .and_then(&get)
                .or_else(|| id.default_base_url().map(str::to_string));

            let config = ProviderConfig {
                name: id.display_name().to_string(),
                api_key: env_api_key.clone(),
                default_model: env_model.clone(),
                rpm_limit,
                max_tokens,
                base_url,
            };

            entries.insert(
                id,
                ProviderEntry {
                    config,
                    env_api_key,
                    stored_api_key: None,
                    env_model,
                },
            );
        }

        let default_provider = match get("DEFAULT_LLM_PROVIDER") {
            Some(name) => name.parse::<ProviderId>().unwrap_or_else(|e| {
                warn!(error = %e, "ignoring DEFAULT_LLM_PROVIDER, using openai");
                ProviderId::OpenAi
            }),
            None => ProviderId::OpenAi,
        };

        let relaxed = get("TEST_MODE").is_some_and(|v| v.eq_ignore_ascii_case("true") || v == "1");

        Self {
            entries,
            default_provider,
            relaxed,
        }
    }

    pub fn default_provider(&self) -> ProviderId {
        self.default_provider
    }

    pub fn set_default_provider(&mut self, provider: ProviderId) {
        self.default_provider = provider;
    }

    /// Relaxed (test) mode: `list_available` returns every provider.
    pub fn is_relaxed(&self) -> bool {
        self.relaxed
    }

    /// Effective config of a registered provider, without session overrides.
    pub fn get(&self, provider: ProviderId) -> Option<&ProviderConfig> {
        self.entries.get(&provider).map(|e| &e.config)
    }

    /// Registered providers in registration order.
    pub fn configs(&self) -> impl Iterator<Item = (ProviderId, &ProviderConfig)> {
        self.entries.iter().map(|(id, e)| (*id, &e.config))
    }

    /// Whether `provider` can be used without a session override.
    pub fn has_api_key(&self, provider: ProviderId) -> bool {
        match provider {
            ProviderId::Mock => true,
            id => self.get(id).is_some_and(ProviderConfig::has_api_key),
        }
    }

    /// Config for one request, with the session's override key applied.
    ///
    /// Returns `None` for providers that are not registered (the mock).
    pub fn resolve(&self, provider: ProviderId, session: &SessionOverrides) -> Option<ProviderConfig> {
        let entry = self.entries.get(&provider)?;
        let mut config = entry.config.clone();
        config.api_key = entry
            .effective_key(session.api_key(provider))
            .map(Redacted::new);
        Some(config)
    }

    /// Apply a decrypted store snapshot.
    ///
    /// For every registered provider the stored key replaces the environment
    /// key when non-empty, and a stored model replaces the environment model.
    /// Afterwards a default provider without a key is moved to the first
    /// registered provider that has one.
    ///
    /// Returns the providers whose effective key or model changed.
    pub fn sync_from_store(&mut self, snapshot: &BTreeMap<String, StoredCredential>) -> Vec<ProviderId> {
        for name in snapshot.keys() {
            if name.parse::<ProviderId>().map_or(true, |id| !self.entries.contains_key(&id)) {
                debug!(provider = %name, "ignoring stored credential for unregistered provider");
            }
        }

        let mut changed = Vec::new();

        for (id, entry) in self.entries.iter_mut() {
            let stored = snapshot.get(id.as_str());

            entry.stored_api_key = stored
                .and_then(StoredCredential::api_key)
                .map(Redacted::new);

            let model = stored
                .and_then(StoredCredential::model)
                .map(str::to_string)
                .unwrap_or_else(|| entry.env_model.clone());

            let api_key = entry.effective_key(None).map(Redacted::new);

            let key_changed = entry.config.api_key.as_ref().map(Redacted::expose)
                != api_key.as_ref().map(Redacted::expose);
            let model_changed = entry.config.default_model != model;

            entry.config.api_key = api_key;
            entry.config.default_model = model;

            if key_changed || model_changed {
                changed.push(*id);
            }
        }

        if !self.has_api_key(self.default_provider) {
            match ProviderId::REGISTERED
                .into_iter()
                .find(|id| self.has_api_key(*id))
            {
                Some(next) => {
                    info!(from = %self.default_provider, to = %next, "default provider has no key, switching");
                    self.default_provider = next;
                }
                None => warn!("no provider has an API key configured"),
            }
        }

        changed
    }

    /// Providers with an API key, or every provider in relaxed mode.
    pub fn list_available(&self) -> BTreeMap<ProviderId, ProviderConfig> {
        self.entries
            .iter()
            .filter(|(_, e)| self.relaxed || e.config.has_api_key())
            .map(|(id, e)| (*id, e.config.clone()))
            .collect()
    }

    /// Overview for settings screens.
    pub fn provider_info(&self) -> ProviderInfo {
        let providers: Vec<ProviderSummary> = self
            .configs()
            .map(|(id, config)| ProviderSummary {
                id,
                name: config.name.clone(),
                model: config.default_model.clone(),
                rpm_limit: config.rpm_limit,
                max_tokens: config.max_tokens,
                has_api_key: config.has_api_key(),
                status: if config.has_api_key() {
                    ProviderStatus::Available
                } else {
                    ProviderStatus::MissingApiKey
                },
            })
            .collect();

        ProviderInfo {
            total_providers: providers.len(),
            available_providers: providers.iter().filter(|p| p.has_api_key).count(),
            default_provider: self.default_provider,
            providers,
        }
    }

    /// Configuration warnings. Never fails: a registry with no usable
    /// provider is a degraded state, not an error.
    pub fn validate(&self) -> Vec<String> {
        let mut warnings = Vec::new();
        if !ProviderId::REGISTERED.iter().any(|id| self.has_api_key(*id)) {
            warnings.push("no provider has an API key; set one with `prpsmith key set`".to_string());
        } else if !self.has_api_key(self.default_provider) {
            warnings.push(format!(
                "default provider '{}' has no API key",
                self.default_provider
            ));
        }
        warnings
    }
}

fn parse_number<F>(get: &F, key: &str, default: u32) -> u32
where
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, default, "invalid number, using default");
            default
        }),
        None => default,
    }
}
