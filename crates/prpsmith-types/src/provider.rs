//! Provider identity and configuration types.
//!
//! The set of providers is closed: [`ProviderId`] enumerates every provider
//! the registry and the client factory know about, including the offline
//! `mock` pseudo-provider used for testing.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize, Serializer};

use crate::credential::Redacted;
use crate::error::ClientError;

/// Identifier of a supported LLM provider.
///
/// Variant order is registration order; `Ord` follows it, so a
/// `BTreeMap<ProviderId, _>` iterates providers in the order they were
/// registered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderId {
    OpenAi,
    Gemini,
    Anthropic,
    OpenRouter,
    DeepSeek,
    Mock,
}

/// Adapter family a provider is served by.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProviderFamily {
    /// OpenAI chat completions protocol, selected by base URL.
    OpenAiCompatible,
    /// Anthropic Messages API.
    Anthropic,
    /// Offline deterministic responder.
    Mock,
}

impl ProviderId {
    /// Providers backed by a real API, in registration order.
    pub const REGISTERED: [ProviderId; 5] = [
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::Anthropic,
        ProviderId::OpenRouter,
        ProviderId::DeepSeek,
    ];

    /// Every provider the factory accepts, registered ones first.
    pub const ALL: [ProviderId; 6] = [
        ProviderId::OpenAi,
        ProviderId::Gemini,
        ProviderId::Anthropic,
        ProviderId::OpenRouter,
        ProviderId::DeepSeek,
        ProviderId::Mock,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "openai",
            ProviderId::Gemini => "gemini",
            ProviderId::Anthropic => "anthropic",
            ProviderId::OpenRouter => "openrouter",
            ProviderId::DeepSeek => "deepseek",
            ProviderId::Mock => "mock",
        }
    }

    /// Human-readable label shown in listings.
    pub fn display_name(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "OpenAI",
            ProviderId::Gemini => "Google Gemini",
            ProviderId::Anthropic => "Anthropic Claude",
            ProviderId::OpenRouter => "OpenRouter",
            ProviderId::DeepSeek => "DeepSeek",
            ProviderId::Mock => "Mock",
        }
    }

    pub fn family(&self) -> ProviderFamily {
        match self {
            ProviderId::Anthropic => ProviderFamily::Anthropic,
            ProviderId::Mock => ProviderFamily::Mock,
            _ => ProviderFamily::OpenAiCompatible,
        }
    }

    /// Environment variable holding the API key.
    pub fn api_key_var(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenAi => Some("OPENAI_API_KEY"),
            ProviderId::Gemini => Some("GOOGLE_API_KEY"),
            ProviderId::Anthropic => Some("ANTHROPIC_API_KEY"),
            ProviderId::OpenRouter => Some("OPENROUTER_API_KEY"),
            ProviderId::DeepSeek => Some("DEEPSEEK_API_KEY"),
            ProviderId::Mock => None,
        }
    }

    /// Environment variable overriding the default model.
    pub fn model_var(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenAi => Some("OPENAI_DEFAULT_MODEL"),
            ProviderId::Gemini => Some("GEMINI_DEFAULT_MODEL"),
            ProviderId::Anthropic => Some("ANTHROPIC_DEFAULT_MODEL"),
            ProviderId::OpenRouter => Some("OPENROUTER_DEFAULT_MODEL"),
            ProviderId::DeepSeek => Some("DEEPSEEK_DEFAULT_MODEL"),
            ProviderId::Mock => None,
        }
    }

    /// Environment variable overriding the requests-per-minute ceiling.
    pub fn rpm_var(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenAi => Some("OPENAI_RPM"),
            ProviderId::Gemini => Some("GEMINI_RPM"),
            ProviderId::Anthropic => Some("ANTHROPIC_RPM"),
            ProviderId::OpenRouter => Some("OPENROUTER_RPM"),
            ProviderId::DeepSeek => Some("DEEPSEEK_RPM"),
            ProviderId::Mock => None,
        }
    }

    /// Environment variable overriding the endpoint.
    pub fn base_url_var(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenAi => Some("OPENAI_BASE_URL"),
            ProviderId::Gemini => Some("GEMINI_BASE_URL"),
            ProviderId::Anthropic => Some("ANTHROPIC_BASE_URL"),
            ProviderId::OpenRouter => Some("OPENROUTER_BASE_URL"),
            ProviderId::DeepSeek => Some("DEEPSEEK_BASE_URL"),
            ProviderId::Mock => None,
        }
    }

    /// Model used when nothing overrides it.
    pub fn fallback_model(&self) -> &'static str {
        match self {
            ProviderId::OpenAi => "gpt-4o",
            ProviderId::Gemini => "gemini-2.5-flash",
            ProviderId::Anthropic => "claude-3-5-sonnet-20241022",
            ProviderId::OpenRouter => "anthropic/claude-3.5-sonnet",
            ProviderId::DeepSeek => "deepseek-chat",
            ProviderId::Mock => "mock-model",
        }
    }

    pub fn fallback_rpm(&self) -> u32 {
        match self {
            ProviderId::Anthropic => 50,
            ProviderId::OpenRouter => 20,
            _ => 60,
        }
    }

    /// Base URL stored in the default config. `None` means the adapter's
    /// own endpoint is used.
    pub fn default_base_url(&self) -> Option<&'static str> {
        match self {
            ProviderId::OpenRouter => Some("https://openrouter.ai/api/v1"),
            ProviderId::DeepSeek => Some("https://api.deepseek.com"),
            _ => None,
        }
    }

    /// Comma-separated list of every accepted provider name.
    pub fn valid_names() -> String {
        Self::ALL
            .iter()
            .map(|id| id.as_str())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProviderId {
    type Err = ClientError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s.trim().to_lowercase();
        Self::ALL
            .into_iter()
            .find(|id| id.as_str() == normalized)
            .ok_or_else(|| ClientError::UnknownProvider {
                name: s.to_string(),
                valid: Self::valid_names(),
            })
    }
}

/// Settings for one provider.
///
/// A config with a non-empty `api_key` is "available". `default_model` is
/// never empty.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProviderConfig {
    /// Human-readable label (e.g. "Google Gemini").
    pub name: String,
    /// API key; `None` means the provider cannot be used.
    #[serde(skip)]
    pub api_key: Option<Redacted>,
    pub default_model: String,
    /// Advisory requests-per-minute ceiling. Not enforced.
    pub rpm_limit: u32,
    /// Response-size ceiling in tokens.
    pub max_tokens: u32,
    /// Override endpoint for hosts speaking a compatible API.
    pub base_url: Option<String>,
}

impl ProviderConfig {
    /// The API key, if present and non-empty.
    pub fn api_key(&self) -> Option<&str> {
        self.api_key
            .as_ref()
            .map(|k| k.expose())
            .filter(|k| !k.trim().is_empty())
    }

    pub fn has_api_key(&self) -> bool {
        self.api_key().is_some()
    }

    /// Synthetic configuration for the `mock` pseudo-provider.
    pub fn mock() -> Self {
        Self {
            name: ProviderId::Mock.display_name().to_string(),
            api_key: None,
            default_model: ProviderId::Mock.fallback_model().to_string(),
            rpm_limit: ProviderId::Mock.fallback_rpm(),
            max_tokens: 1000,
            base_url: None,
        }
    }
}

/// Availability of a provider as reported to the selection UI.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProviderStatus {
    Available,
    MissingApiKey,
    Error(String),
}

impl ProviderStatus {
    pub fn is_available(&self) -> bool {
        matches!(self, ProviderStatus::Available)
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ProviderStatus::Available => write!(f, "available"),
            ProviderStatus::MissingApiKey => write!(f, "missing_api_key"),
            ProviderStatus::Error(reason) => write!(f, "error: {reason}"),
        }
    }
}

impl Serialize for ProviderStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

/// One row of [`ProviderInfo`].
#[derive(Debug, Clone, Serialize)]
pub struct ProviderSummary {
    pub id: ProviderId,
    pub name: String,
    pub model: String,
    pub rpm_limit: u32,
    pub max_tokens: u32,
    pub has_api_key: bool,
    pub status: ProviderStatus,
}

/// Registry overview for settings screens and `provider list`.
#[derive(Debug, Clone, Serialize)]
pub struct ProviderInfo {
    pub total_providers: usize,
    pub available_providers: usize,
    pub default_provider: ProviderId,
    pub providers: Vec<ProviderSummary>,
}

/// Per-request overrides supplied by the calling session.
///
/// Holds a `{provider -> api key}` map and the provider the session chose.
/// Both take priority over persisted and environment settings.
#[derive(Debug, Clone, Default)]
pub struct SessionOverrides {
    api_keys: BTreeMap<ProviderId, Redacted>,
    provider: Option<ProviderId>,
}

impl SessionOverrides {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn with_api_key(mut self, provider: ProviderId, api_key: impl Into<String>) -> Self {
        self.api_keys.insert(provider, Redacted::new(api_key));
        self
    }

    /// The provider the session selected, if any.
    pub fn provider(&self) -> Option<ProviderId> {
        self.provider
    }

    /// Override key for `provider`, if present and non-empty.
    pub fn api_key(&self, provider: ProviderId) -> Option<&str> {
        self.api_keys
            .get(&provider)
            .map(|k| k.expose())
            .filter(|k| !k.trim().is_empty())
    }
}
