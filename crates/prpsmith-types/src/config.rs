//! File configuration types for prpsmith.
//!
//! `AppConfig` represents the `config.toml` in the data directory. Every
//! field is optional; environment variables take priority over the file.
//! API keys are never read from this file.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::provider::ProviderId;

/// Top-level configuration loaded from `~/.prpsmith/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Provider used when the session does not pick one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub default_provider: Option<String>,

    /// Relaxed mode: list providers even when they lack a key.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub test_mode: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_tokens_per_request: Option<u32>,

    #[serde(default)]
    pub log_format: LogFormat,

    /// Per-provider settings keyed by provider wire name.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub providers: BTreeMap<String, ProviderOverrides>,
}

/// `[providers.<id>]` table.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderOverrides {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub model: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rpm_limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub base_url: Option<String>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

impl AppConfig {
    /// Resolve a configuration variable by its environment name.
    ///
    /// Used as the fallback behind the process environment so that the
    /// registry sees one flat `name -> value` source.
    pub fn lookup(&self, key: &str) -> Option<String> {
        match key {
            "DEFAULT_LLM_PROVIDER" => return self.default_provider.clone(),
            "TEST_MODE" => return self.test_mode.map(|b| b.to_string()),
            "MAX_TOKENS_PER_REQUEST" => return self.max_tokens_per_request.map(|n| n.to_string()),
            _ => {}
        }

        ProviderId::REGISTERED.iter().find_map(|id| {
            let overrides = self.providers.get(id.as_str())?;
            if id.model_var() == Some(key) {
                overrides.model.clone()
            } else if id.rpm_var() == Some(key) {
                overrides.rpm_limit.map(|n| n.to_string())
            } else if id.base_url_var() == Some(key) {
                overrides.base_url.clone()
            } else {
                None
            }
        })
    }
}
