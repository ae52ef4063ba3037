//! AnthropicProvider -- concrete [`LlmProvider`] implementation for Anthropic Claude.
//!
//! Sends requests to the Anthropic Messages API (`/v1/messages`) with
//! the `x-api-key` and `anthropic-version` headers.
//!
//! The API key is wrapped in [`secrecy::SecretString`] and is never logged
//! or included in `Debug` output.

use std::time::Duration;

use secrecy::{ExposeSecret, SecretString};

use prpsmith_core::llm::provider::LlmProvider;
use prpsmith_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities,
    StopReason, ToolCall, Usage,
};

use super::types::{
    AnthropicContentBlock, AnthropicMessage, AnthropicRequest, AnthropicResponse, AnthropicTool,
    ErrorPayload,
};

pub const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";

/// Anthropic Claude LLM provider.
///
/// Does NOT derive Debug; the key is only exposed when building headers.
pub struct AnthropicProvider {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    capabilities: ProviderCapabilities,
}

impl AnthropicProvider {
    /// The Anthropic API version header value.
    const API_VERSION: &'static str = "2023-06-01";

    /// Create a new Anthropic provider.
    ///
    /// Rejects an empty key and a `base_url` that is not an absolute URL.
    pub fn new(
        api_key: SecretString,
        model: String,
        base_url: Option<&str>,
    ) -> Result<Self, LlmError> {
        if api_key.expose_secret().trim().is_empty() {
            return Err(LlmError::MissingApiKey("anthropic".to_string()));
        }

        let base_url = base_url
            .map(str::trim)
            .filter(|url| !url.is_empty())
            .unwrap_or(DEFAULT_BASE_URL)
            .trim_end_matches('/')
            .to_string();
        reqwest::Url::parse(&base_url)
            .map_err(|e| LlmError::InvalidRequest(format!("invalid base URL {base_url}: {e}")))?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(300))
            .build()
            .map_err(|e| LlmError::Provider {
                message: format!("failed to create HTTP client: {e}"),
            })?;

        let capabilities = Self::capabilities_for_model(&model);

        Ok(Self {
            client,
            api_key,
            base_url,
            model,
            capabilities,
        })
    }

    /// The default model for this provider.
    pub fn model(&self) -> &str {
        &self.model
    }

    fn capabilities_for_model(model: &str) -> ProviderCapabilities {
        let max_output_tokens = if model.contains("opus") {
            32_000
        } else if model.contains("sonnet") || model.contains("haiku") {
            8_192
        } else {
            4_096
        };
        ProviderCapabilities {
            tool_calling: true,
            structured_output: true,
            max_context_tokens: 200_000,
            max_output_tokens,
        }
    }

    /// Build the full API URL for a given path.
    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    /// Convert a generic [`CompletionRequest`] into an [`AnthropicRequest`].
    ///
    /// System-role messages are folded into the top-level `system` field,
    /// which is the only place the Messages API accepts them.
    fn to_anthropic_request(&self, request: &CompletionRequest) -> AnthropicRequest {
        let mut system_parts: Vec<&str> = request.system.as_deref().into_iter().collect();
        let mut messages = Vec::with_capacity(request.messages.len());
        for m in &request.messages {
            match m.role {
                MessageRole::System => system_parts.push(&m.content),
                MessageRole::User | MessageRole::Assistant => messages.push(AnthropicMessage {
                    role: m.role.to_string(),
                    content: m.content.clone(),
                }),
            }
        }

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        AnthropicRequest {
            model,
            max_tokens: request.max_tokens,
            messages,
            system: (!system_parts.is_empty()).then(|| system_parts.join("\n\n")),
            temperature: request.temperature,
            stop_sequences: request.stop_sequences.clone(),
            output_config: request.output_config.clone(),
            tools: request
                .tools
                .iter()
                .map(|tool| AnthropicTool {
                    name: tool.name.clone(),
                    description: tool.description.clone(),
                    input_schema: tool.parameters.clone(),
                })
                .collect(),
        }
    }
}

/// Map a non-success status and its body to an [`LlmError`].
fn map_status(status: reqwest::StatusCode, body: &str) -> LlmError {
    let message = serde_json::from_str::<ErrorPayload>(body)
        .map(|payload| payload.error.message)
        .unwrap_or_else(|_| body.to_string());

    match status.as_u16() {
        401 | 403 => LlmError::AuthenticationFailed,
        429 => LlmError::RateLimited {
            retry_after_ms: None,
        },
        529 => LlmError::Overloaded(message),
        400 => LlmError::InvalidRequest(message),
        _ => LlmError::Provider {
            message: format!("HTTP {status}: {message}"),
        },
    }
}

/// Flatten an API response into the provider-agnostic shape.
fn into_completion(response: AnthropicResponse) -> CompletionResponse {
    let mut content = String::new();
    let mut tool_calls = Vec::new();
    for block in response.content {
        match block {
            AnthropicContentBlock::Text { text } => content.push_str(&text),
            AnthropicContentBlock::ToolUse { id, name, input } => {
                tool_calls.push(ToolCall { id, name, input })
            }
            AnthropicContentBlock::Other => {}
        }
    }

    let stop_reason = match response.stop_reason.as_deref() {
        Some("tool_use") => StopReason::ToolUse,
        Some("max_tokens") => StopReason::MaxTokens,
        Some("stop_sequence") => StopReason::StopSequence,
        _ => StopReason::EndTurn,
    };

    CompletionResponse {
        id: response.id,
        content,
        model: response.model,
        stop_reason,
        usage: Usage {
            input_tokens: response.usage.input_tokens,
            output_tokens: response.usage.output_tokens,
        },
        tool_calls,
    }
}

impl LlmProvider for AnthropicProvider {
    fn name(&self) -> &str {
        "anthropic"
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let body = self.to_anthropic_request(request);
        let url = self.url("/v1/messages");

        let response = self
            .client
            .post(&url)
            .header("x-api-key", self.api_key.expose_secret())
            .header("anthropic-version", Self::API_VERSION)
            .header("content-type", "application/json")
            .json(&body)
            .send()
            .await
            .map_err(|e| LlmError::Provider {
                message: format!("HTTP request failed: {e}"),
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(map_status(status, &error_body));
        }

        let anthropic_resp: AnthropicResponse = response.json().await.map_err(|e| {
            LlmError::Deserialization(format!("failed to parse response: {e}"))
        })?;

        Ok(into_completion(anthropic_resp))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prpsmith_types::llm::{Message, OutputConfig, ToolDefinition};

    fn make_provider() -> AnthropicProvider {
        AnthropicProvider::new(
            SecretString::from("test-key-not-real"),
            "claude-3-5-sonnet-20241022".to_string(),
            None,
        )
        .unwrap()
    }

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: String::new(),
            messages: vec![Message::user("Hello")],
            system: Some("Be helpful".to_string()),
            max_tokens: 1024,
            temperature: Some(0.7),
            stop_sequences: None,
            output_config: None,
            tools: vec![],
        }
    }

    #[test]
    fn test_provider_name_and_capabilities() {
        let provider = make_provider();
        assert_eq!(provider.name(), "anthropic");
        assert_eq!(provider.capabilities().max_output_tokens, 8_192);
        assert_eq!(provider.url("/v1/messages"), "https://api.anthropic.com/v1/messages");
    }

    #[test]
    fn test_empty_key_is_rejected() {
        let result = AnthropicProvider::new(SecretString::from(""), "claude".to_string(), None);
        assert!(matches!(result, Err(LlmError::MissingApiKey(_))));
    }

    #[test]
    fn test_malformed_base_url_is_rejected() {
        let result = AnthropicProvider::new(
            SecretString::from("key"),
            "claude".to_string(),
            Some("not a url"),
        );
        assert!(matches!(result, Err(LlmError::InvalidRequest(_))));
    }

    #[test]
    fn test_base_url_override() {
        let provider = AnthropicProvider::new(
            SecretString::from("key"),
            "claude".to_string(),
            Some("http://localhost:8080/"),
        )
        .unwrap();
        assert_eq!(provider.url("/v1/messages"), "http://localhost:8080/v1/messages");
    }

    #[test]
    fn test_to_anthropic_request() {
        let provider = make_provider();
        let mut req = request();
        req.messages.insert(
            0,
            Message {
                role: MessageRole::System,
                content: "Answer in English".to_string(),
            },
        );
        req.tools = vec![ToolDefinition {
            name: "lookup_stack".to_string(),
            description: "Look up a tech stack".to_string(),
            parameters: serde_json::json!({"type": "object"}),
        }];
        req.output_config = Some(OutputConfig::json_schema(
            "ProjectForm",
            serde_json::json!({"type": "object"}),
        ));

        let body = provider.to_anthropic_request(&req);
        assert_eq!(body.model, "claude-3-5-sonnet-20241022");
        assert_eq!(body.messages.len(), 1);
        assert_eq!(body.messages[0].role, "user");
        assert_eq!(body.system.as_deref(), Some("Be helpful\n\nAnswer in English"));
        assert_eq!(body.tools[0].name, "lookup_stack");
        assert!(body.output_config.is_some());
    }

    #[test]
    fn test_into_completion_collects_text_and_tool_use() {
        let response: AnthropicResponse = serde_json::from_str(
            r#"{
                "id": "msg_1",
                "content": [
                    {"type": "text", "text": "Let me check. "},
                    {"type": "tool_use", "id": "toolu_1", "name": "lookup_stack", "input": {"name": "axum"}},
                    {"type": "text", "text": "Done."}
                ],
                "model": "claude-3-5-sonnet-20241022",
                "stop_reason": "tool_use",
                "usage": {"input_tokens": 12, "output_tokens": 34}
            }"#,
        )
        .unwrap();

        let completion = into_completion(response);
        assert_eq!(completion.content, "Let me check. Done.");
        assert_eq!(completion.stop_reason, StopReason::ToolUse);
        assert_eq!(completion.tool_calls.len(), 1);
        assert_eq!(completion.tool_calls[0].input["name"], "axum");
        assert_eq!(completion.usage.output_tokens, 34);
    }

    #[test]
    fn test_map_status() {
        use reqwest::StatusCode;
        assert!(matches!(
            map_status(StatusCode::UNAUTHORIZED, ""),
            LlmError::AuthenticationFailed
        ));
        assert!(matches!(
            map_status(StatusCode::TOO_MANY_REQUESTS, ""),
            LlmError::RateLimited { .. }
        ));

        let overloaded = StatusCode::from_u16(529).unwrap();
        match map_status(
            overloaded,
            r#"{"type":"error","error":{"type":"overloaded_error","message":"Overloaded"}}"#,
        ) {
            LlmError::Overloaded(message) => assert_eq!(message, "Overloaded"),
            other => panic!("expected Overloaded, got {other:?}"),
        }

        match map_status(StatusCode::BAD_GATEWAY, "upstream down") {
            LlmError::Provider { message } => assert!(message.contains("upstream down")),
            other => panic!("expected Provider, got {other:?}"),
        }
    }
}
