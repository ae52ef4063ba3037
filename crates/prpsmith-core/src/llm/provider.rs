//! LlmProvider trait definition.
//!
//! This is the native call primitive every provider adapter implements.
//! Uses RPITIT for `complete`; `BoxLlmProvider` erases the type for the
//! factory's constructor table.

use prpsmith_types::llm::{CompletionRequest, CompletionResponse, LlmError, ProviderCapabilities};

/// Trait for LLM provider backends (OpenAI-compatible, Anthropic, mock).
///
/// Implementations perform exactly one request per `complete` call and
/// never retry. Real adapters live in prpsmith-infra; the offline mock lives
/// in [`super::mock`].
pub trait LlmProvider: Send + Sync {
    /// Provider wire name (e.g., "anthropic", "openrouter").
    fn name(&self) -> &str;

    /// What this provider supports.
    fn capabilities(&self) -> &ProviderCapabilities;

    /// Send a completion request and receive the full response.
    fn complete(
        &self,
        request: &CompletionRequest,
    ) -> impl std::future::Future<Output = Result<CompletionResponse, LlmError>> + Send;
}
