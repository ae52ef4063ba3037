//! The uniform client contract handed out by the factory.

use std::sync::Arc;

use prpsmith_types::error::ClientError;
use prpsmith_types::llm::ToolDefinition;
use prpsmith_types::provider::{ProviderConfig, ProviderId};

use super::agent::{Agent, OutputShape};
use super::box_provider::BoxLlmProvider;

/// System prompt used by [`LlmClient::generate_response`].
pub const GENERIC_SYSTEM_PROMPT: &str = "You are a helpful assistant.";

/// A constructed provider adapter together with the configuration it was
/// built from.
///
/// Clients are shared (`Arc<LlmClient>`) through the factory cache; they
/// hold no per-request state.
#[derive(Debug)]
pub struct LlmClient {
    id: ProviderId,
    config: ProviderConfig,
    provider: Arc<BoxLlmProvider>,
}

impl LlmClient {
    pub fn new(id: ProviderId, config: ProviderConfig, provider: BoxLlmProvider) -> Self {
        Self {
            id,
            config,
            provider: Arc::new(provider),
        }
    }

    pub fn id(&self) -> ProviderId {
        self.id
    }

    pub fn config(&self) -> &ProviderConfig {
        &self.config
    }

    pub fn model(&self) -> &str {
        &self.config.default_model
    }

    /// Bind a system prompt, output shape and tools to this provider.
    ///
    /// No network call happens here.
    pub fn create_agent(
        &self,
        system_prompt: impl Into<String>,
        output: OutputShape,
        tools: Vec<ToolDefinition>,
    ) -> Agent {
        Agent::new(
            Arc::clone(&self.provider),
            self.id,
            self.config.default_model.clone(),
            self.config.max_tokens,
            system_prompt.into(),
            output,
            tools,
        )
    }

    /// Run `prompt` once through a throwaway text agent and return the text.
    pub async fn generate_response(&self, prompt: &str) -> Result<String, ClientError> {
        let agent = self.create_agent(GENERIC_SYSTEM_PROMPT, OutputShape::Text, Vec::new());
        let run = agent.run(prompt).await?;
        Ok(run.text())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::llm::mock::MockProvider;

    fn mock_client() -> LlmClient {
        LlmClient::new(
            ProviderId::Mock,
            ProviderConfig::mock(),
            BoxLlmProvider::new(MockProvider::new("mock-model")),
        )
    }

    #[tokio::test]
    async fn test_generate_response_is_deterministic() {
        let client = mock_client();
        let a = client.generate_response("hello").await.unwrap();
        let b = client.generate_response("hello").await.unwrap();
        assert_eq!(a, "Mock response for: hello");
        assert_eq!(a, b);
    }

    #[test]
    fn test_create_agent_binds_configuration() {
        let client = mock_client();
        let agent = client.create_agent("You fill forms.", OutputShape::Text, vec![]);
        assert_eq!(agent.system_prompt(), "You fill forms.");
        assert_eq!(agent.output_shape(), &OutputShape::Text);
        assert!(agent.tools().is_empty());
        assert_eq!(client.model(), "mock-model");
    }
}
