//! Offline provider behind the `mock` pseudo-provider.
//!
//! Needs no credential and never touches the network. Text requests are
//! answered with `"Mock response for: {prompt}"`; structured requests with an
//! empty JSON object so schema-typed agents still decode.

use std::sync::atomic::{AtomicUsize, Ordering};

use prpsmith_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities,
    StopReason, Usage,
};

use super::provider::LlmProvider;

pub struct MockProvider {
    model: String,
    capabilities: ProviderCapabilities,
    calls: AtomicUsize,
}

impl MockProvider {
    pub fn new(model: impl Into<String>) -> Self {
        Self {
            model: model.into(),
            capabilities: ProviderCapabilities {
                tool_calling: false,
                structured_output: true,
                max_context_tokens: 8_192,
                max_output_tokens: 1_000,
            },
            calls: AtomicUsize::new(0),
        }
    }

    /// The deterministic reply for a text prompt.
    pub fn reply_for(prompt: &str) -> String {
        format!("Mock response for: {prompt}")
    }

    /// Number of `complete` calls served so far.
    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::Relaxed)
    }
}

impl LlmProvider for MockProvider {
    fn name(&self) -> &str {
        "mock"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let n = self.calls.fetch_add(1, Ordering::Relaxed) + 1;

        let prompt = request
            .messages
            .iter()
            .rev()
            .find(|m| m.role == MessageRole::User)
            .map(|m| m.content.as_str())
            .unwrap_or_default();

        let content = if request.output_config.is_some() {
            "{}".to_string()
        } else {
            Self::reply_for(prompt)
        };

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        Ok(CompletionResponse {
            id: format!("mock-{n}"),
            usage: Usage {
                input_tokens: prompt.chars().count() as u32,
                output_tokens: content.chars().count() as u32,
            },
            content,
            model,
            stop_reason: StopReason::EndTurn,
            tool_calls: vec![],
        })
    }
}
