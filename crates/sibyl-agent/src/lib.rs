//! Agent engine for Sibyl.
//!
//! Provides the Groq API client plus the orchestration layer around it:
//! - Model selection with cooldown-based fallback
//! - Conversation sessions with automatic tool-call loops
//! - History trimming and summarization
//! - A tool registry with built-in research and utility tools

pub mod groq;
pub mod history;
pub mod models;
pub mod session;
pub mod task;
pub mod tools;

use async_trait::async_trait;

pub use groq::{GroqClient, GroqConfig};
pub use models::{ModelRegistry, ModelSpec, ModelStats};
pub use session::{Conversation, SessionManager};
pub use task::TaskCategory;
pub use tools::{Tool, ToolError, ToolRegistry};

/// A hosted-model client. The selector probes candidates through this seam
/// and the turn controller invokes the chosen one; tests substitute a
/// scripted implementation.
#[async_trait]
pub trait ModelClient: Send + Sync {
    /// Liveness check for a model: a minimal completion that must succeed
    /// before the model is handed out for a turn.
    async fn probe(&self, model: &ModelSpec) -> Result<(), AgentError>;

    /// Send the transcript (and tool catalog) to a model and return its
    /// reply, which may carry structured tool-call requests.
    async fn invoke(
        &self,
        model: &ModelSpec,
        messages: &[Message],
        tools: &[ToolDefinition],
    ) -> Result<ModelResponse, AgentError>;
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Message {
    pub role: Role,
    pub content: String,
}

impl Message {
    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
        }
    }

    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn tool_result(tool: &str, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: format!("[Tool Result: {tool}]\n{}", content.into()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
    System,
    Tool,
}

/// A tool as advertised to the model: name, natural-language description,
/// and a JSON schema for its input.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    pub parameters: serde_json::Value,
}

/// A model reply: free text and/or structured tool-call requests.
#[derive(Debug, Clone, Default)]
pub struct ModelResponse {
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    #[error("model unavailable: {0}")]
    ModelUnavailable(String),
    #[error("all models failed to initialize; check your GROQ_API_KEY and network connection")]
    AllModelsFailed,
    #[error("rate limited")]
    RateLimited,
    #[error("API error: {0}")]
    ApiError(String),
    #[error("network error: {0}")]
    NetworkError(String),
    #[error("parse error: {0}")]
    ParseError(String),
    #[error("conversation is busy with another request")]
    Busy,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tool_result_message_carries_tool_name() {
        let msg = Message::tool_result("calculator", "Result: 42");
        assert_eq!(msg.role, Role::Tool);
        assert!(msg.content.starts_with("[Tool Result: calculator]"));
        assert!(msg.content.contains("Result: 42"));
    }

    #[test]
    fn role_serializes_lowercase() {
        let json = serde_json::to_string(&Role::Assistant).unwrap();
        assert_eq!(json, "\"assistant\"");
    }

    #[test]
    fn agent_error_display() {
        assert_eq!(
            AgentError::ModelUnavailable("llama-3.3-70b-versatile".into()).to_string(),
            "model unavailable: llama-3.3-70b-versatile"
        );
        assert!(AgentError::AllModelsFailed.to_string().contains("GROQ_API_KEY"));
    }
}
