//! LLM provider implementations.
//!
//! Concrete implementations of the [`LlmProvider`](prpsmith_core::llm::provider::LlmProvider)
//! trait, plus [`default_constructors`], the table the client factory uses to
//! turn a resolved [`ProviderConfig`] into a live provider.

pub mod anthropic;
pub mod openai_compat;

use std::sync::Arc;

use secrecy::SecretString;

use prpsmith_core::llm::box_provider::BoxLlmProvider;
use prpsmith_core::llm::factory::{ConstructorTable, ProviderConstructor};
use prpsmith_types::llm::LlmError;
use prpsmith_types::provider::{ProviderConfig, ProviderFamily, ProviderId};

use self::anthropic::AnthropicProvider;
use self::openai_compat::OpenAiCompatibleProvider;

/// Construct an OpenAI-compatible provider (OpenAI, Gemini, OpenRouter, DeepSeek).
pub fn create_openai_compatible(
    id: ProviderId,
    config: &ProviderConfig,
) -> Result<BoxLlmProvider, LlmError> {
    let oai = openai_compat::config::for_provider(id, config)?;
    Ok(BoxLlmProvider::new(OpenAiCompatibleProvider::new(oai)?))
}

/// Construct the Anthropic provider.
pub fn create_anthropic(
    id: ProviderId,
    config: &ProviderConfig,
) -> Result<BoxLlmProvider, LlmError> {
    let key = config
        .api_key()
        .ok_or_else(|| LlmError::MissingApiKey(id.to_string()))?;
    let provider = AnthropicProvider::new(
        SecretString::from(key.to_string()),
        config.default_model.clone(),
        config.base_url.as_deref(),
    )?;
    Ok(BoxLlmProvider::new(provider))
}

/// Constructor for every registered provider, keyed by id.
///
/// `mock` is absent: the factory serves it without a constructor.
pub fn default_constructors() -> ConstructorTable {
    let openai_compatible: ProviderConstructor = Arc::new(create_openai_compatible);
    let anthropic: ProviderConstructor = Arc::new(create_anthropic);

    ProviderId::REGISTERED
        .into_iter()
        .filter_map(|id| match id.family() {
            ProviderFamily::OpenAiCompatible => Some((id, Arc::clone(&openai_compatible))),
            ProviderFamily::Anthropic => Some((id, Arc::clone(&anthropic))),
            ProviderFamily::Mock => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use prpsmith_types::credential::Redacted;

    fn config_for(id: ProviderId, key: &str) -> ProviderConfig {
        ProviderConfig {
            name: id.display_name().to_string(),
            api_key: Some(Redacted::new(key)),
            default_model: id.fallback_model().to_string(),
            rpm_limit: id.fallback_rpm(),
            max_tokens: 4096,
            base_url: id.default_base_url().map(str::to_string),
        }
    }

    #[test]
    fn test_every_registered_provider_has_a_constructor() {
        let table = default_constructors();
        assert_eq!(table.len(), ProviderId::REGISTERED.len());
        assert!(!table.contains_key(&ProviderId::Mock));
    }

    #[test]
    fn test_constructors_build_named_providers() {
        let table = default_constructors();
        for id in ProviderId::REGISTERED {
            let provider = table[&id](id, &config_for(id, "key-123")).unwrap();
            assert_eq!(provider.name(), id.as_str());
        }
    }

    #[test]
    fn test_constructors_reject_missing_key() {
        let table = default_constructors();
        for id in ProviderId::REGISTERED {
            let mut config = config_for(id, "");
            config.api_key = None;
            assert!(matches!(
                table[&id](id, &config),
                Err(LlmError::MissingApiKey(_))
            ));
        }
    }

    #[test]
    fn test_openai_compatible_bad_base_url_is_construction_error() {
        for id in [
            ProviderId::OpenAi,
            ProviderId::Gemini,
            ProviderId::OpenRouter,
            ProviderId::DeepSeek,
        ] {
            let mut config = config_for(id, "key");
            config.base_url = Some("::not-a-url::".to_string());
            assert!(
                matches!(create_openai_compatible(id, &config), Err(LlmError::InvalidRequest(_))),
                "{id} accepted a malformed base URL"
            );
        }
    }

    #[test]
    fn test_anthropic_bad_base_url_is_construction_error() {
        let mut config = config_for(ProviderId::Anthropic, "key");
        config.base_url = Some("::not-a-url::".to_string());
        assert!(matches!(
            create_anthropic(ProviderId::Anthropic, &config),
            Err(LlmError::InvalidRequest(_))
        ));
    }
}
