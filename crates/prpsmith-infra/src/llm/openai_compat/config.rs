//! Configuration and per-provider defaults for OpenAI-compatible providers.
//!
//! OpenAI, Gemini, OpenRouter and DeepSeek all speak the chat completions
//! protocol; they differ only in base URL and limits.

use prpsmith_types::llm::{LlmError, ProviderCapabilities};
use prpsmith_types::provider::{ProviderConfig, ProviderId};

pub const OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
pub const GEMINI_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1beta/openai";

/// Configuration for an OpenAI-compatible provider.
///
/// Used to construct an [`super::OpenAiCompatibleProvider`].
pub struct OpenAiCompatConfig {
    /// Provider wire name (e.g., "openai", "deepseek").
    pub provider_name: String,
    pub base_url: String,
    pub api_key: String,
    pub model: String,
    pub capabilities: ProviderCapabilities,
}

/// OpenAI: 128K context, 16K output.
pub fn openai_defaults(api_key: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openai".into(),
        base_url: OPENAI_BASE_URL.into(),
        api_key: api_key.into(),
        model: model.into(),
        capabilities: ProviderCapabilities {
            tool_calling: true,
            structured_output: true,
            max_context_tokens: 128_000,
            max_output_tokens: 16_384,
        },
    }
}

/// Google Gemini through its OpenAI-compatible beta endpoint: 1M context, 64K output.
pub fn gemini_defaults(api_key: &str, model: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "gemini".into(),
        base_url: GEMINI_BASE_URL.into(),
        api_key: api_key.into(),
        model: model.into(),
        capabilities: ProviderCapabilities {
            tool_calling: true,
            structured_output: true,
            max_context_tokens: 1_000_000,
            max_output_tokens: 65_536,
        },
    }
}

/// OpenRouter. Limits depend on the routed model; these are conservative.
pub fn openrouter_defaults(api_key: &str, model: &str, base_url: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "openrouter".into(),
        base_url: base_url.into(),
        api_key: api_key.into(),
        model: model.into(),
        capabilities: ProviderCapabilities {
            tool_calling: true,
            structured_output: true,
            max_context_tokens: 128_000,
            max_output_tokens: 8_192,
        },
    }
}

/// DeepSeek: 64K context, 8K output.
pub fn deepseek_defaults(api_key: &str, model: &str, base_url: &str) -> OpenAiCompatConfig {
    OpenAiCompatConfig {
        provider_name: "deepseek".into(),
        base_url: base_url.into(),
        api_key: api_key.into(),
        model: model.into(),
        capabilities: ProviderCapabilities {
            tool_calling: true,
            structured_output: true,
            max_context_tokens: 64_000,
            max_output_tokens: 8_192,
        },
    }
}

/// Pick the defaults for `id` and apply `config` on top.
///
/// A `base_url` in `config` replaces the provider's endpoint. OpenRouter and
/// DeepSeek fall back to their registered default URL.
pub fn for_provider(id: ProviderId, config: &ProviderConfig) -> Result<OpenAiCompatConfig, LlmError> {
    let api_key = config
        .api_key()
        .ok_or_else(|| LlmError::MissingApiKey(id.to_string()))?;
    let model = config.default_model.as_str();
    let base_url = config
        .base_url
        .as_deref()
        .map(str::trim)
        .filter(|url| !url.is_empty())
        .or(id.default_base_url());

    let mut oai = match id {
        ProviderId::OpenAi => openai_defaults(api_key, model),
        ProviderId::Gemini => gemini_defaults(api_key, model),
        ProviderId::OpenRouter => openrouter_defaults(api_key, model, base_url.unwrap_or_default()),
        ProviderId::DeepSeek => deepseek_defaults(api_key, model, base_url.unwrap_or_default()),
        ProviderId::Anthropic | ProviderId::Mock => {
            return Err(LlmError::InvalidRequest(format!(
                "{id} does not speak the OpenAI chat completions protocol"
            )));
        }
    };

    if let Some(url) = base_url {
        oai.base_url = url.trim_end_matches('/').to_string();
    }
    if oai.base_url.is_empty() {
        return Err(LlmError::InvalidRequest(format!("no base URL configured for {id}")));
    }
    Ok(oai)
}
