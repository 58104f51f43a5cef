//! OpenAI-compatible chat-completions backend.
//!
//! Speaks the chat-completions wire format, so any provider exposing
//! that API works by pointing `base_url` elsewhere.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::model::{Backend, ChatRequest, ModelError, ModelTurn, ToolChoice, Usage};
use crate::tools::ToolSpec;
use crate::transcript::{Message, Role, ToolCall};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4-turbo-preview";

// ─────────────────────────────────────────────────────────────────────────────
// API Wire Types
// ─────────────────────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiRequest {
    model: String,
    messages: Vec<Value>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    tools: Vec<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_choice: Option<&'static str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    choices: Vec<ApiChoice>,
    #[serde(default)]
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Debug, Deserialize)]
struct ApiMessage {
    #[serde(default)]
    content: Option<String>,
    #[serde(default)]
    tool_calls: Vec<ApiToolCall>,
}

#[derive(Debug, Deserialize)]
struct ApiToolCall {
    id: String,
    function: ApiFunction,
}

#[derive(Debug, Deserialize)]
struct ApiFunction {
    name: String,
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    #[serde(default)]
    prompt_tokens: u32,
    #[serde(default)]
    completion_tokens: u32,
}

// ─────────────────────────────────────────────────────────────────────────────
// Backend Implementation
// ─────────────────────────────────────────────────────────────────────────────

/// Builder for creating an OpenAI-compatible backend.
#[derive(Debug, Clone)]
pub struct OpenAiBackendBuilder {
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
}

impl OpenAiBackendBuilder {
    pub fn new(api_key: impl Into<String>, model: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            model: model.into(),
            base_url: DEFAULT_BASE_URL.to_string(),
            max_tokens: None,
        }
    }

    pub fn base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }

    pub fn build(self) -> OpenAiBackend {
        OpenAiBackend {
            http: reqwest::Client::new(),
            api_key: self.api_key,
            model: self.model,
            base_url: self.base_url.trim_end_matches('/').to_string(),
            max_tokens: self.max_tokens,
        }
    }
}

/// OpenAI-compatible API backend.
pub struct OpenAiBackend {
    http: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    max_tokens: Option<u32>,
}

impl OpenAiBackend {
    pub fn builder(
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> OpenAiBackendBuilder {
        OpenAiBackendBuilder::new(api_key, model)
    }

    fn role_to_api(role: Role) -> &'static str {
        match role {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }

    fn message_to_api(msg: &Message) -> Value {
        let mut object = json!({
            "role": Self::role_to_api(msg.role),
            "content": msg.content,
        });

        if let Some(id) = &msg.tool_call_id {
            object["tool_call_id"] = json!(id);
        }

        if !msg.tool_calls.is_empty() {
            let calls: Vec<Value> = msg
                .tool_calls
                .iter()
                .map(|call| {
                    json!({
                        "id": call.id,
                        "type": "function",
                        "function": {
                            "name": call.name,
                            "arguments": call.arguments,
                        }
                    })
                })
                .collect();
            object["tool_calls"] = json!(calls);
        }

        object
    }

    fn tool_to_api(spec: &ToolSpec) -> Value {
        json!({
            "type": "function",
            "function": {
                "name": spec.name,
                "description": spec.description,
                "parameters": spec.parameters,
            }
        })
    }

    fn response_to_message(api: ApiMessage) -> Message {
        let tool_calls: Vec<ToolCall> = api
            .tool_calls
            .into_iter()
            .map(|call| ToolCall {
                id: call.id,
                name: call.function.name,
                arguments: call.function.arguments,
            })
            .collect();

        Message {
            role: Role::Assistant,
            content: api.content,
            tool_calls,
            tool_call_id: None,
        }
    }
}

impl std::fmt::Display for OpenAiBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "openai({}, {})", self.model, self.base_url)
    }
}

impl Backend for OpenAiBackend {
    async fn complete(&self, request: ChatRequest<'_>) -> Result<ModelTurn, ModelError> {
        // tool_choice is only meaningful when tools are attached.
        let tool_choice = match (request.tools.is_empty(), request.tool_choice) {
            (true, _) => None,
            (false, ToolChoice::Auto) => Some("auto"),
            (false, ToolChoice::None) => Some("none"),
        };

        let api_request = ApiRequest {
            model: self.model.clone(),
            messages: request.messages.iter().map(Self::message_to_api).collect(),
            tools: request.tools.iter().map(Self::tool_to_api).collect(),
            tool_choice,
            max_tokens: self.max_tokens,
        };

        let url = format!("{}/v1/chat/completions", self.base_url);
        let response = self
            .http
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&api_request)
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ModelError::Api(format!("{status}: {body}")));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| ModelError::InvalidResponse(e.to_string()))?;

        let choice = api_response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| ModelError::InvalidResponse("no choices in response".to_string()))?;

        let usage = api_response
            .usage
            .map(|u| Usage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
            })
            .unwrap_or_default();

        Ok(ModelTurn {
            message: Self::response_to_message(choice.message),
            usage,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn assistant_tool_calls_serialize_as_functions() {
        let msg = Message {
            role: Role::Assistant,
            content: None,
            tool_calls: vec![ToolCall {
                id: "call_1".into(),
                name: "get_cpu_usage".into(),
                arguments: "{}".into(),
            }],
            tool_call_id: None,
        };
        let value = OpenAiBackend::message_to_api(&msg);
        assert_eq!(value["role"], "assistant");
        assert_eq!(value["tool_calls"][0]["type"], "function");
        assert_eq!(value["tool_calls"][0]["function"]["name"], "get_cpu_usage");
    }

    #[test]
    fn tool_message_keeps_call_id() {
        let value = OpenAiBackend::message_to_api(&Message::tool("call_1", "{}"));
        assert_eq!(value["role"], "tool");
        assert_eq!(value["tool_call_id"], "call_1");
    }

    #[test]
    fn response_message_maps_tool_calls() {
        let api = ApiMessage {
            content: None,
            tool_calls: vec![ApiToolCall {
                id: "call_9".into(),
                function: ApiFunction {
                    name: "get_disk_usage".into(),
                    arguments: r#"{"path":"/"}"#.into(),
                },
            }],
        };
        let msg = OpenAiBackend::response_to_message(api);
        assert_eq!(msg.role, Role::Assistant);
        assert_eq!(msg.tool_calls[0].id, "call_9");
        assert_eq!(msg.tool_calls[0].arguments, r#"{"path":"/"}"#);
    }

    #[test]
    fn builder_normalizes_base_url() {
        let backend = OpenAiBackend::builder("key", DEFAULT_MODEL)
            .base_url("https://example.com/")
            .build();
        assert_eq!(backend.base_url, "https://example.com");
    }
}
