//! Agents: a system prompt, an output shape and optional tools bound to a
//! provider.
//!
//! Binding never touches the network; only [`Agent::run`] does, and it makes
//! exactly one `complete` call.

use std::sync::Arc;

use schemars::JsonSchema;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{Instrument, debug, info_span};

use prpsmith_types::error::ClientError;
use prpsmith_types::llm::{
    CompletionRequest, LlmError, Message, OutputConfig, ToolCall, ToolDefinition, Usage,
};
use prpsmith_types::provider::ProviderId;

use super::box_provider::BoxLlmProvider;

/// The output an agent is expected to produce.
#[derive(Debug, Clone, PartialEq)]
pub enum OutputShape {
    /// Free text.
    Text,
    /// A JSON value matching `schema`.
    Json { name: String, schema: Value },
}

impl OutputShape {
    /// JSON output shaped like `T`, with the schema derived by schemars.
    pub fn of<T: JsonSchema>() -> Self {
        let name = std::any::type_name::<T>()
            .rsplit("::")
            .next()
            .unwrap_or("Output")
            .to_string();
        let mut schema = serde_json::to_value(schemars::schema_for!(T))
            .unwrap_or_else(|_| serde_json::json!({ "type": "object" }));
        close_objects(&mut schema);
        OutputShape::Json { name, schema }
    }

    pub fn is_structured(&self) -> bool {
        matches!(self, OutputShape::Json { .. })
    }
}

/// Set `additionalProperties: false` on every object schema that lists
/// properties.
fn close_objects(value: &mut Value) {
    match value {
        Value::Object(map) => {
            if map.contains_key("properties") && !map.contains_key("additionalProperties") {
                map.insert("additionalProperties".into(), Value::Bool(false));
            }
            for child in map.values_mut() {
                close_objects(child);
            }
        }
        Value::Array(items) => items.iter_mut().for_each(close_objects),
        _ => {}
    }
}

/// Raw output value of a run.
#[derive(Debug, Clone, PartialEq)]
pub enum AgentOutput {
    Text(String),
    Structured(Value),
}

/// Result of [`Agent::run`].
#[derive(Debug, Clone)]
pub struct AgentRun {
    pub provider: ProviderId,
    pub model: String,
    pub output: AgentOutput,
    pub usage: Usage,
    pub tool_calls: Vec<ToolCall>,
}

impl AgentRun {
    /// Output rendered as text. Structured output is serialized as JSON.
    pub fn text(&self) -> String {
        match &self.output {
            AgentOutput::Text(text) => text.clone(),
            AgentOutput::Structured(value) => value.to_string(),
        }
    }

    /// Decode structured output into a typed record.
    pub fn decode<T: DeserializeOwned>(&self) -> Result<T, ClientError> {
        let value = match &self.output {
            AgentOutput::Structured(value) => value.clone(),
            AgentOutput::Text(text) => parse_json_output(text).map_err(|source| {
                ClientError::Generation {
                    provider: self.provider,
                    source,
                }
            })?,
        };
        serde_json::from_value(value).map_err(|e| ClientError::Generation {
            provider: self.provider,
            source: LlmError::Deserialization(format!("output does not match schema: {e}")),
        })
    }
}

/// A system prompt, output shape and tool set bound to one provider.
#[derive(Clone)]
pub struct Agent {
    provider: Arc<BoxLlmProvider>,
    provider_id: ProviderId,
    model: String,
    max_tokens: u32,
    system_prompt: String,
    output: OutputShape,
    tools: Vec<ToolDefinition>,
}

impl Agent {
    pub(crate) fn new(
        provider: Arc<BoxLlmProvider>,
        provider_id: ProviderId,
        model: String,
        max_tokens: u32,
        system_prompt: String,
        output: OutputShape,
        tools: Vec<ToolDefinition>,
    ) -> Self {
        Self {
            provider,
            provider_id,
            model,
            max_tokens,
            system_prompt,
            output,
            tools,
        }
    }

    pub fn system_prompt(&self) -> &str {
        &self.system_prompt
    }

    pub fn output_shape(&self) -> &OutputShape {
        &self.output
    }

    pub fn tools(&self) -> &[ToolDefinition] {
        &self.tools
    }

    fn build_request(&self, user_prompt: &str) -> CompletionRequest {
        let (system, output_config) = match &self.output {
            OutputShape::Text => (self.system_prompt.clone(), None),
            OutputShape::Json { name, schema } => (
                format!(
                    "{}\n\nRespond only with a JSON object that matches this JSON schema:\n{}",
                    self.system_prompt, schema
                ),
                Some(OutputConfig::json_schema(name.clone(), schema.clone())),
            ),
        };

        // never ask for more output than the model can produce
        let ceiling = self.provider.capabilities().max_output_tokens;
        let max_tokens = if ceiling > 0 {
            self.max_tokens.min(ceiling)
        } else {
            self.max_tokens
        };

        CompletionRequest {
            model: self.model.clone(),
            messages: vec![Message::user(user_prompt)],
            system: Some(system),
            max_tokens,
            temperature: None,
            stop_sequences: None,
            output_config,
            tools: self.tools.clone(),
        }
    }

    /// Send `user_prompt` to the provider and return the normalized output.
    ///
    /// Failures are returned as `ClientError::Generation`; nothing is retried.
    pub async fn run(&self, user_prompt: &str) -> Result<AgentRun, ClientError> {
        let request = self.build_request(user_prompt);

        let span = info_span!(
            "gen_ai.complete",
            gen_ai.system = self.provider.name(),
            gen_ai.request.model = %request.model,
            gen_ai.request.max_tokens = request.max_tokens,
            gen_ai.request.structured = self.output.is_structured(),
        );

        let response = self
            .provider
            .complete(&request)
            .instrument(span)
            .await
            .map_err(|source| ClientError::Generation {
                provider: self.provider_id,
                source,
            })?;

        debug!(
            provider = %self.provider_id,
            input_tokens = response.usage.input_tokens,
            output_tokens = response.usage.output_tokens,
            "completion received"
        );

        let output = match &self.output {
            OutputShape::Text => AgentOutput::Text(response.content),
            OutputShape::Json { .. } => {
                let value = parse_json_output(&response.content).map_err(|source| {
                    ClientError::Generation {
                        provider: self.provider_id,
                        source,
                    }
                })?;
                AgentOutput::Structured(value)
            }
        };

        Ok(AgentRun {
            provider: self.provider_id,
            model: response.model,
            output,
            usage: response.usage,
            tool_calls: response.tool_calls,
        })
    }
}

impl std::fmt::Debug for Agent {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Agent")
            .field("provider", &self.provider_id)
            .field("model", &self.model)
            .field("output", &self.output)
            .field("tools", &self.tools.len())
            .finish()
    }
}

/// Parse a model reply as JSON, tolerating Markdown code fences and prose
/// around a single top-level object.
pub fn parse_json_output(content: &str) -> Result<Value, LlmError> {
    let trimmed = content.trim();

    let unfenced = trimmed
        .strip_prefix("```json")
        .or_else(|| trimmed.strip_prefix("```"))
        .and_then(|rest| rest.trim_end().strip_suffix("```"))
        .map(str::trim)
        .unwrap_or(trimmed);

    if let Ok(value) = serde_json::from_str::<Value>(unfenced) {
        return Ok(value);
    }

    match (unfenced.find('{'), unfenced.rfind('}')) {
        (Some(start), Some(end)) if start < end => {
            serde_json::from_str::<Value>(&unfenced[start..=end]).map_err(|e| {
                LlmError::Deserialization(format!("model output is not valid JSON: {e}"))
            })
        }
        _ => Err(LlmError::Deserialization(
            "model output contains no JSON object".to_string(),
        )),
    }
}
