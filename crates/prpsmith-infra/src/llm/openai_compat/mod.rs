//! OpenAI-compatible LLM provider implementation.
//!
//! A single [`OpenAiCompatibleProvider`] serves OpenAI, Google Gemini,
//! OpenRouter and DeepSeek via configurable base URLs.
//!
//! Uses [`async_openai`] for type-safe request/response handling. Tools and
//! structured output are spliced into the request as their wire JSON.

pub mod config;

use async_openai::Client;
use async_openai::config::OpenAIConfig;
use async_openai::types::chat::{
    ChatCompletionRequestAssistantMessage, ChatCompletionRequestAssistantMessageContent,
    ChatCompletionRequestMessage, ChatCompletionRequestSystemMessage,
    ChatCompletionRequestSystemMessageContent, ChatCompletionRequestUserMessage,
    ChatCompletionRequestUserMessageContent, CreateChatCompletionRequest, FinishReason,
    StopConfiguration,
};
use serde_json::{Value, json};

use prpsmith_core::llm::provider::LlmProvider;
use prpsmith_types::llm::{
    CompletionRequest, CompletionResponse, LlmError, MessageRole, ProviderCapabilities,
    StopReason, ToolCall, Usage,
};

use self::config::OpenAiCompatConfig;

/// Unified provider for any OpenAI-compatible API.
///
/// Does NOT derive Debug: the `async_openai::Client` holds the API key.
pub struct OpenAiCompatibleProvider {
    client: Client<OpenAIConfig>,
    provider_name: String,
    model: String,
    capabilities: ProviderCapabilities,
}

impl OpenAiCompatibleProvider {
    /// Create a provider from a configuration.
    ///
    /// Rejects an empty API key and a base URL that is not an absolute URL.
    pub fn new(config: OpenAiCompatConfig) -> Result<Self, LlmError> {
        if config.api_key.trim().is_empty() {
            return Err(LlmError::MissingApiKey(config.provider_name));
        }
        reqwest::Url::parse(&config.base_url).map_err(|e| {
            LlmError::InvalidRequest(format!("invalid base URL {}: {e}", config.base_url))
        })?;

        let openai_config = OpenAIConfig::new()
            .with_api_key(&config.api_key)
            .with_api_base(&config.base_url);

        Ok(Self {
            client: Client::with_config(openai_config),
            provider_name: config.provider_name,
            model: config.model,
            capabilities: config.capabilities,
        })
    }

    /// Build a [`CreateChatCompletionRequest`] from a generic [`CompletionRequest`].
    fn build_request(
        &self,
        request: &CompletionRequest,
    ) -> Result<CreateChatCompletionRequest, LlmError> {
        let mut messages: Vec<ChatCompletionRequestMessage> = Vec::new();

        if let Some(ref system) = request.system {
            messages.push(ChatCompletionRequestMessage::System(
                ChatCompletionRequestSystemMessage {
                    content: ChatCompletionRequestSystemMessageContent::Text(system.clone()),
                    name: None,
                },
            ));
        }

        for msg in &request.messages {
            let oai_msg = match msg.role {
                MessageRole::System => ChatCompletionRequestMessage::System(
                    ChatCompletionRequestSystemMessage {
                        content: ChatCompletionRequestSystemMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    },
                ),
                MessageRole::User => ChatCompletionRequestMessage::User(
                    ChatCompletionRequestUserMessage {
                        content: ChatCompletionRequestUserMessageContent::Text(
                            msg.content.clone(),
                        ),
                        name: None,
                    },
                ),
                MessageRole::Assistant => {
                    #[allow(deprecated)]
                    ChatCompletionRequestMessage::Assistant(
                        ChatCompletionRequestAssistantMessage {
                            content: Some(ChatCompletionRequestAssistantMessageContent::Text(
                                msg.content.clone(),
                            )),
                            refusal: None,
                            name: None,
                            audio: None,
                            tool_calls: None,
                            function_call: None,
                        },
                    )
                }
            };
            messages.push(oai_msg);
        }

        let model = if request.model.is_empty() {
            self.model.clone()
        } else {
            request.model.clone()
        };

        let mut req = CreateChatCompletionRequest {
            model,
            messages,
            max_completion_tokens: Some(request.max_tokens),
            temperature: request.temperature.map(|t| t as f32),
            ..Default::default()
        };

        if let Some(ref stops) = request.stop_sequences {
            if !stops.is_empty() {
                req.stop = Some(StopConfiguration::StringArray(stops.clone()));
            }
        }

        if request.tools.is_empty() && request.output_config.is_none() {
            return Ok(req);
        }

        let mut body = serde_json::to_value(&req)
            .map_err(|e| LlmError::InvalidRequest(format!("failed to encode request: {e}")))?;
        if !request.tools.is_empty() {
            let tools: Vec<Value> = request
                .tools
                .iter()
                .map(|tool| {
                    json!({
                        "type": "function",
                        "function": {
                            "name": tool.name,
                            "description": tool.description,
                            "parameters": tool.parameters,
                        }
                    })
                })
                .collect();
            body["tools"] = Value::Array(tools);
        }
        if let Some(ref output) = request.output_config {
            let schema = &output.format.json_schema;
            let mut json_schema = json!({
                "name": schema.name,
                "schema": schema.schema,
            });
            if let Some(strict) = schema.strict {
                json_schema["strict"] = Value::Bool(strict);
            }
            body["response_format"] = json!({
                "type": "json_schema",
                "json_schema": json_schema,
            });
        }

        serde_json::from_value(body)
            .map_err(|e| LlmError::InvalidRequest(format!("unsupported tool or schema: {e}")))
    }
}

impl LlmProvider for OpenAiCompatibleProvider {
    fn name(&self) -> &str {
        &self.provider_name
    }

    fn capabilities(&self) -> &ProviderCapabilities {
        &self.capabilities
    }

    async fn complete(&self, request: &CompletionRequest) -> Result<CompletionResponse, LlmError> {
        let oai_request = self.build_request(request)?;

        let response = self
            .client
            .chat()
            .create(oai_request)
            .await
            .map_err(map_openai_error)?;

        let choice = response.choices.first();

        let content = choice
            .and_then(|c| c.message.content.clone())
            .unwrap_or_default();

        let tool_calls = match choice {
            Some(c) => {
                let raw = serde_json::to_value(&c.message.tool_calls)
                    .map_err(|e| LlmError::Deserialization(format!("invalid tool calls: {e}")))?;
                parse_tool_calls(&raw)?
            }
            None => Vec::new(),
        };

        let stop_reason = choice
            .and_then(|c| c.finish_reason.as_ref())
            .map(|fr| match fr {
                FinishReason::Stop => StopReason::EndTurn,
                FinishReason::Length => StopReason::MaxTokens,
                FinishReason::ToolCalls => StopReason::ToolUse,
                FinishReason::ContentFilter => StopReason::EndTurn,
                FinishReason::FunctionCall => StopReason::ToolUse,
            })
            .unwrap_or(StopReason::EndTurn);

        let usage = response
            .usage
            .map(|u| Usage {
                input_tokens: u.prompt_tokens,
                output_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(CompletionResponse {
            id: response.id,
            content,
            model: response.model,
            stop_reason,
            usage,
            tool_calls,
        })
    }
}

/// Read tool calls from their wire JSON.
///
/// Arguments arrive as a JSON-encoded string; they are parsed into a value.
fn parse_tool_calls(raw: &Value) -> Result<Vec<ToolCall>, LlmError> {
    let Some(calls) = raw.as_array() else {
        return Ok(Vec::new());
    };

    calls
        .iter()
        .filter_map(|call| {
            let function = call.get("function")?;
            let name = function.get("name")?.as_str()?.to_string();
            let id = call
                .get("id")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let arguments = function
                .get("arguments")
                .and_then(Value::as_str)
                .unwrap_or("{}");
            Some((id, name, arguments))
        })
        .map(|(id, name, arguments)| {
            let input = serde_json::from_str(arguments).map_err(|e| {
                LlmError::Deserialization(format!("invalid arguments for tool {name}: {e}"))
            })?;
            Ok(ToolCall { id, name, input })
        })
        .collect()
}

/// Map an `async_openai::error::OpenAIError` to an [`LlmError`].
fn map_openai_error(err: async_openai::error::OpenAIError) -> LlmError {
    use async_openai::error::OpenAIError;

    match &err {
        OpenAIError::ApiError(api_err) => {
            let code = api_err.code.as_deref().unwrap_or("");
            let error_type = api_err.r#type.as_deref().unwrap_or("");

            if code == "authentication_error"
                || error_type == "authentication_error"
                || code == "invalid_api_key"
                || api_err.message.contains("Incorrect API key")
                || api_err.message.contains("Invalid API key")
            {
                LlmError::AuthenticationFailed
            } else if code == "rate_limit_exceeded" || error_type == "rate_limit_error" {
                LlmError::RateLimited {
                    retry_after_ms: None,
                }
            } else if code == "context_length_exceeded"
                || api_err.message.contains("maximum context length")
            {
                LlmError::ContextLengthExceeded {
                    max: 0,
                    requested: 0,
                }
            } else if code == "server_error" || error_type == "overloaded_error" {
                LlmError::Overloaded(api_err.message.clone())
            } else {
                LlmError::Provider {
                    message: err.to_string(),
                }
            }
        }
        OpenAIError::Reqwest(reqwest_err) => match reqwest_err.status().map(|s| s.as_u16()) {
            Some(401) => LlmError::AuthenticationFailed,
            Some(429) => LlmError::RateLimited {
                retry_after_ms: None,
            },
            Some(529) => LlmError::Overloaded(err.to_string()),
            _ => LlmError::Provider {
                message: err.to_string(),
            },
        },
        OpenAIError::JSONDeserialize(_, content) => {
            LlmError::Deserialization(format!("failed to parse response: {content}"))
        }
        OpenAIError::InvalidArgument(msg) => LlmError::InvalidRequest(msg.clone()),
        _ => LlmError::Provider {
            message: err.to_string(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prpsmith_types::llm::{Message, OutputConfig, ToolDefinition};

    fn request() -> CompletionRequest {
        CompletionRequest {
            model: "gpt-4o".to_string(),
            messages: vec![Message::user("Hello")],
            system: Some("Be helpful".to_string()),
            max_tokens: 1024,
            temperature: Some(0.7),
            stop_sequences: None,
            output_config: None,
            tools: vec![],
        }
    }

    fn provider() -> OpenAiCompatibleProvider {
        OpenAiCompatibleProvider::new(config::openai_defaults("sk-test", "gpt-4o")).unwrap()
    }

    #[test]
    fn test_empty_key_is_rejected() {
        assert!(matches!(
            OpenAiCompatibleProvider::new(config::gemini_defaults("", "gemini-2.5-flash")),
            Err(LlmError::MissingApiKey(name)) if name == "gemini"
        ));
    }

    #[test]
    fn test_malformed_base_url_is_rejected() {
        let mut oai = config::openai_defaults("sk-test", "gpt-4o");
        oai.base_url = "::not-a-url::".to_string();
        assert!(matches!(
            OpenAiCompatibleProvider::new(oai),
            Err(LlmError::InvalidRequest(_))
        ));
    }

    #[test]
    fn test_build_request_messages() {
        let mut req = request();
        req.messages.push(Message {
            role: MessageRole::Assistant,
            content: "Hi there!".to_string(),
        });

        let oai_req = provider().build_request(&req).unwrap();
        assert_eq!(oai_req.model, "gpt-4o");
        // 1 system + 2 conversation = 3 messages
        assert_eq!(oai_req.messages.len(), 3);
        assert_eq!(oai_req.max_completion_tokens, Some(1024));
        assert!(oai_req.tools.is_none());
        assert!(oai_req.response_format.is_none());
    }

    #[test]
    fn test_build_request_empty_model_uses_default() {
        let mut req = request();
        req.model = String::new();
        let oai_req = provider().build_request(&req).unwrap();
        assert_eq!(oai_req.model, "gpt-4o");
    }

    #[test]
    fn test_build_request_stop_sequences() {
        let mut req = request();
        req.stop_sequences = Some(vec!["STOP".to_string()]);
        assert!(provider().build_request(&req).unwrap().stop.is_some());
    }

    #[test]
    fn test_build_request_with_tools_and_schema() {
        let mut req = request();
        req.tools = vec![ToolDefinition {
            name: "lookup_stack".to_string(),
            description: "Look up a tech stack".to_string(),
            parameters: json!({
                "type": "object",
                "properties": {"name": {"type": "string"}},
                "required": ["name"]
            }),
        }];
        req.output_config = Some(OutputConfig::json_schema(
            "ProjectForm",
            json!({"type": "object", "properties": {"project_name": {"type": "string"}}}),
        ));

        let oai_req = provider().build_request(&req).unwrap();
        let wire = serde_json::to_value(&oai_req).unwrap();
        assert_eq!(wire["tools"][0]["type"], "function");
        assert_eq!(wire["tools"][0]["function"]["name"], "lookup_stack");
        assert_eq!(wire["response_format"]["type"], "json_schema");
        assert_eq!(wire["response_format"]["json_schema"]["name"], "ProjectForm");
        assert_eq!(wire["messages"].as_array().unwrap().len(), 2);
    }

    #[test]
    fn test_parse_tool_calls() {
        let raw = json!([{
            "id": "call_1",
            "type": "function",
            "function": {"name": "lookup_stack", "arguments": "{\"name\":\"axum\"}"}
        }]);
        let calls = parse_tool_calls(&raw).unwrap();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].id, "call_1");
        assert_eq!(calls[0].input["name"], "axum");

        assert!(parse_tool_calls(&Value::Null).unwrap().is_empty());
    }

    #[test]
    fn test_parse_tool_calls_rejects_bad_arguments() {
        let raw = json!([{
            "id": "call_1",
            "type": "function",
            "function": {"name": "lookup_stack", "arguments": "{not json"}
        }]);
        assert!(matches!(
            parse_tool_calls(&raw),
            Err(LlmError::Deserialization(_))
        ));
    }

    #[test]
    fn test_map_openai_error_api_auth() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Incorrect API key provided".to_string(),
            r#type: Some("authentication_error".to_string()),
            param: None,
            code: None,
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, LlmError::AuthenticationFailed));
    }

    #[test]
    fn test_map_openai_error_rate_limit() {
        use async_openai::error::{ApiError, OpenAIError};
        let api_err = ApiError {
            message: "Rate limit exceeded".to_string(),
            r#type: Some("rate_limit_error".to_string()),
            param: None,
            code: None,
        };
        let err = map_openai_error(OpenAIError::ApiError(api_err));
        assert!(matches!(err, LlmError::RateLimited { .. }));
    }

    #[test]
    fn test_map_openai_error_invalid_argument() {
        use async_openai::error::OpenAIError;
        let err = map_openai_error(OpenAIError::InvalidArgument("bad arg".to_string()));
        assert!(matches!(err, LlmError::InvalidRequest(_)));
    }
}
