//! Form filling and PRP generation on top of the client factory.
//!
//! Both agents return [`Generated`] values: provider output when the call
//! succeeds, deterministic local content when the provider fails. Only
//! provider failures degrade; configuration errors are returned.

pub mod form_filler;
pub mod prp;
pub mod templates;

use tracing::warn;

use prpsmith_types::error::ClientError;
use prpsmith_types::prp::{Generated, Origin};

/// Turn a provider failure into fallback content, or pass the error through.
pub(crate) fn degrade<T>(
    err: ClientError,
    fallback: impl FnOnce() -> T,
) -> Result<Generated<T>, ClientError> {
    if !err.allows_fallback() {
        return Err(err);
    }
    warn!(error = %err, "provider unavailable, using fallback content");
    Ok(Generated {
        value: fallback(),
        origin: Origin::Fallback {
            reason: err.to_string(),
        },
    })
}

#[cfg(test)]
pub(crate) mod testing {
    use std::collections::HashMap;
    use std::sync::Arc;

    use tokio::sync::RwLock;

    use prpsmith_types::llm::{
        CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities, StopReason, Usage,
    };
    use prpsmith_types::provider::{ProviderConfig, ProviderId};

    use crate::llm::box_provider::BoxLlmProvider;
    use crate::llm::factory::{ClientFactory, ConstructorTable, ProviderConstructor};
    use crate::llm::provider::LlmProvider;
    use crate::llm::registry::ProviderRegistry;

    /// Provider answering every request with the same canned outcome.
    pub struct CannedProvider {
        reply: Result<String, String>,
        capabilities: ProviderCapabilities,
    }

    impl CannedProvider {
        pub fn replying(text: &str) -> Self {
            Self::new(Ok(text.to_string()))
        }

        pub fn failing(message: &str) -> Self {
            Self::new(Err(message.to_string()))
        }

        fn new(reply: Result<String, String>) -> Self {
            Self {
                reply,
                capabilities: ProviderCapabilities {
                    tool_calling: false,
                    structured_output: true,
                    max_context_tokens: 8_192,
                    max_output_tokens: 1_000,
                },
            }
        }
    }

    impl LlmProvider for CannedProvider {
        fn name(&self) -> &str {
            "canned"
        }

        fn capabilities(&self) -> &ProviderCapabilities {
            &self.capabilities
        }

        async fn complete(
            &self,
            request: &CompletionRequest,
        ) -> Result<CompletionResponse, LlmError> {
            match &self.reply {
                Ok(text) => Ok(CompletionResponse {
                    id: "canned-1".into(),
                    content: text.clone(),
                    model: request.model.clone(),
                    stop_reason: StopReason::EndTurn,
                    usage: Usage::default(),
                    tool_calls: vec![],
                }),
                Err(message) => Err(LlmError::Provider {
                    message: message.clone(),
                }),
            }
        }
    }

    /// Factory whose `openai` adapter is `provider`, with a configured key.
    pub fn factory_with(make: fn() -> CannedProvider) -> Arc<ClientFactory> {
        let vars: HashMap<&str, &str> = HashMap::from([("OPENAI_API_KEY", "sk-test")]);
        let registry =
            ProviderRegistry::build_defaults(move |key| vars.get(key).map(|v| v.to_string()));
        let ctor: ProviderConstructor = Arc::new(
            move |_: ProviderId, _: &ProviderConfig| -> Result<BoxLlmProvider, LlmError> {
                Ok(BoxLlmProvider::new(make()))
            },
        );
        let table = ConstructorTable::from([(ProviderId::OpenAi, ctor)]);
        Arc::new(ClientFactory::new(Arc::new(RwLock::new(registry)), table))
    }

    /// Factory where nothing has a key.
    pub fn unconfigured_factory() -> Arc<ClientFactory> {
        let registry = ProviderRegistry::build_defaults(|_| None);
        Arc::new(ClientFactory::new(
            Arc::new(RwLock::new(registry)),
            ConstructorTable::new(),
        ))
    }
}
