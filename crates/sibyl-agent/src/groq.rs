//! Groq API client.
//!
//! Implements the `ModelClient` trait against Groq's OpenAI-compatible
//! chat-completions endpoint (https://api.groq.com/openai/v1/chat/completions).
//! The model itself (name, temperature, output cap) comes from the
//! `ModelSpec` handed out by the registry, so one client serves every
//! configured model.

use async_trait::async_trait;
use tracing::debug;

use sibyl_common::ConfigError;

use crate::models::ModelSpec;
use crate::tools::to_function_declaration;
use crate::{AgentError, Message, ModelClient, ModelResponse, Role, ToolCall, ToolDefinition};

const GROQ_API_URL: &str = "https://api.groq.com/openai/v1/chat/completions";

/// Prompt used for the liveness probe before a model is handed out.
const PROBE_PROMPT: &str = "Say 'OK' if you're working.";

/// Groq API client configuration.
#[derive(Clone)]
pub struct GroqConfig {
    pub api_key: String,
}

impl std::fmt::Debug for GroqConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GroqConfig")
            .field("api_key", &"[REDACTED]")
            .finish()
    }
}

impl GroqConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
        }
    }

    /// Create config from the `GROQ_API_KEY` environment variable.
    /// Absence is a startup precondition failure, reported with remediation.
    pub fn from_env() -> Result<Self, ConfigError> {
        let key = std::env::var("GROQ_API_KEY").map_err(|_| ConfigError::MissingCredential {
            var: "GROQ_API_KEY",
            remediation: "Create a key at https://console.groq.com/keys and export it \
                          (or add it to a .env file) before starting sibyl.",
        })?;
        Ok(Self::new(key))
    }
}

/// Groq API client.
pub struct GroqClient {
    config: GroqConfig,
    http: reqwest::Client,
}

impl GroqClient {
    pub fn new(config: GroqConfig) -> Self {
        Self {
            config,
            http: reqwest::Client::new(),
        }
    }

    /// Build the JSON request body for the chat-completions API.
    fn build_request_body(
        &self,
        model: &ModelSpec,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> serde_json::Value {
        let mut msgs = Vec::new();
        for msg in messages {
            let role = match msg.role {
                Role::System => "system",
                Role::Assistant => "assistant",
                // Tool results travel as user-visible context; the transcript
                // already labels them with the tool name.
                Role::User | Role::Tool => "user",
            };
            msgs.push(serde_json::json!({
                "role": role,
                "content": msg.content,
            }));
        }

        let mut body = serde_json::json!({
            "model": model.name,
            "temperature": model.temperature,
            "max_tokens": model.max_tokens,
            "messages": msgs,
        });

        if !tools.is_empty() {
            let tool_defs: Vec<_> = tools.iter().map(to_function_declaration).collect();
            body["tools"] = serde_json::json!(tool_defs);
            body["tool_choice"] = serde_json::json!("auto");
        }

        body
    }

    fn parse_response(&self, json: serde_json::Value) -> Result<ModelResponse, AgentError> {
        let message = json["choices"]
            .get(0)
            .map(|c| &c["message"])
            .ok_or_else(|| AgentError::ParseError("response has no choices".into()))?;

        let content = message["content"].as_str().unwrap_or_default().to_string();

        let tool_calls = message["tool_calls"]
            .as_array()
            .map(|calls| {
                calls
                    .iter()
                    .map(|call| {
                        // Arguments arrive as a JSON string inside the JSON.
                        let raw_args = call["function"]["arguments"].as_str().unwrap_or("{}");
                        let arguments = serde_json::from_str(raw_args)
                            .unwrap_or(serde_json::Value::Null);
                        ToolCall {
                            id: call["id"].as_str().unwrap_or("").to_string(),
                            name: call["function"]["name"].as_str().unwrap_or("").to_string(),
                            arguments,
                        }
                    })
                    .collect()
            })
            .unwrap_or_default();

        Ok(ModelResponse {
            content,
            tool_calls,
        })
    }

    async fn post(&self, body: &serde_json::Value) -> Result<serde_json::Value, AgentError> {
        let response = self
            .http
            .post(GROQ_API_URL)
            .bearer_auth(&self.config.api_key)
            .header("content-type", "application/json")
            .json(body)
            .send()
            .await
            .map_err(|e| AgentError::NetworkError(e.to_string()))?;

        let status = response.status();
        if status == reqwest::StatusCode::TOO_MANY_REQUESTS {
            return Err(AgentError::RateLimited);
        }
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(AgentError::ApiError(format!("HTTP {status}: {text}")));
        }

        response
            .json()
            .await
            .map_err(|e| AgentError::ParseError(e.to_string()))
    }
}

#[async_trait]
impl ModelClient for GroqClient {
    async fn probe(&self, model: &ModelSpec) -> Result<(), AgentError> {
        let probe_spec = ModelSpec {
            max_tokens: 16,
            ..model.clone()
        };
        let body = self.build_request_body(&probe_spec, &[Message::user(PROBE_PROMPT)], &[]);

        debug!(model = %model.name, "Groq liveness probe");
        self.post(&body).await.map(|_| ())
    }

    async fn invoke(
        &self,
        model: &ModelSpec,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, AgentError> {
        let body = self.build_request_body(model, messages, tools);

        debug!(model = %model.name, messages = messages.len(), "Groq API request");
        let json = self.post(&body).await?;
        self.parse_response(json)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GroqClient {
        GroqClient::new(GroqConfig::new("test-key"))
    }

    #[test]
    fn config_debug_redacts_key() {
        let config = GroqConfig::new("gsk_super_secret");
        let debug = format!("{config:?}");
        assert!(!debug.contains("gsk_super_secret"));
        assert!(debug.contains("[REDACTED]"));
    }

    #[test]
    fn request_body_maps_roles_and_tools() {
        let messages = vec![
            Message::system("be brief"),
            Message::user("hi"),
            Message::assistant("hello"),
            Message::tool_result("calculator", "Result: 4"),
        ];
        let tools = vec![ToolDefinition {
            name: "calculator".into(),
            description: "math".into(),
            parameters: serde_json::json!({"type": "object"}),
        }];

        let spec = ModelSpec::new("llama-3.3-70b-versatile");
        let body = client().build_request_body(&spec, &messages, &tools);

        assert_eq!(body["model"], "llama-3.3-70b-versatile");
        let msgs = body["messages"].as_array().unwrap();
        assert_eq!(msgs[0]["role"], "system");
        assert_eq!(msgs[2]["role"], "assistant");
        // Tool results are sent back as user-role context.
        assert_eq!(msgs[3]["role"], "user");

        assert_eq!(body["tools"][0]["type"], "function");
        assert_eq!(body["tools"][0]["function"]["name"], "calculator");
        assert_eq!(body["tool_choice"], "auto");
    }

    #[test]
    fn request_body_omits_tools_when_empty() {
        let spec = ModelSpec::new("m");
        let body = client().build_request_body(&spec, &[Message::user("hi")], &[]);
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
    }

    #[test]
    fn parse_plain_text_response() {
        let json = serde_json::json!({
            "choices": [{
                "message": {"role": "assistant", "content": "Hello!"}
            }]
        });
        let response = client().parse_response(json).unwrap();
        assert_eq!(response.content, "Hello!");
        assert!(response.tool_calls.is_empty());
    }

    #[test]
    fn parse_tool_call_response() {
        let json = serde_json::json!({
            "choices": [{
                "message": {
                    "role": "assistant",
                    "content": null,
                    "tool_calls": [{
                        "id": "call_1",
                        "type": "function",
                        "function": {
                            "name": "calculator",
                            "arguments": "{\"expression\": \"15/100*2500\"}"
                        }
                    }]
                }
            }]
        });
        let response = client().parse_response(json).unwrap();
        assert_eq!(response.content, "");
        assert_eq!(response.tool_calls.len(), 1);
        assert_eq!(response.tool_calls[0].name, "calculator");
        assert_eq!(
            response.tool_calls[0].arguments["expression"],
            "15/100*2500"
        );
    }

    #[test]
    fn parse_empty_choices_is_error() {
        let json = serde_json::json!({"choices": []});
        let err = client().parse_response(json).unwrap_err();
        assert!(matches!(err, AgentError::ParseError(_)));
    }
}
