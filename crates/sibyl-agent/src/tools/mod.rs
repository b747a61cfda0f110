//! Tool catalog for the agent.
//!
//! Tools are opaque capabilities the model can call: each exposes a name, a
//! natural-language description (consumed by the model for selection), a JSON
//! input schema, and an invoke function. The engine never validates
//! tool-specific semantics; it only catches failures and feeds them back.

mod builtin;
mod web;

pub use builtin::{Calculator, CodeAnalyzer, FileContentGenerator, WeatherInfo};
pub use web::{ArxivSearch, TavilySearch, WikipediaSearch};

use std::collections::HashMap;

use async_trait::async_trait;

use crate::ToolDefinition;

#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    #[error("unknown tool: {0}")]
    UnknownTool(String),
    #[error("invalid input: {0}")]
    InvalidInput(String),
    #[error("tool execution failed: {0}")]
    Failed(String),
}

/// A callable capability advertised to the model.
#[async_trait]
pub trait Tool: Send + Sync {
    fn name(&self) -> &str;
    fn description(&self) -> &str;
    fn schema(&self) -> serde_json::Value;

    async fn invoke(&self, input: &serde_json::Value) -> Result<String, ToolError>;
}

/// Registry of tools, populated once at startup and immutable thereafter.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn Tool>>,
    /// Registration order, so the catalog shown to the model is stable.
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Registry with the built-in utility tools (no network access).
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        registry.register(Box::new(Calculator));
        registry.register(Box::new(CodeAnalyzer));
        registry.register(Box::new(WeatherInfo));
        registry.register(Box::new(FileContentGenerator));
        registry
    }

    /// Add the web research tools. Tavily is included only when
    /// `TAVILY_API_KEY` is present in the environment.
    pub fn with_search_tools(mut self) -> Self {
        let http = reqwest::Client::new();
        self.register(Box::new(WikipediaSearch::new(http.clone())));
        self.register(Box::new(ArxivSearch::new(http.clone())));
        if let Ok(key) = std::env::var("TAVILY_API_KEY") {
            self.register(Box::new(TavilySearch::new(http, key)));
            tracing::info!("tavily search tool registered");
        } else {
            tracing::debug!("TAVILY_API_KEY not set, skipping tavily search");
        }
        self
    }

    pub fn register(&mut self, tool: Box<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// The catalog handed to the model on every call.
    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|tool| ToolDefinition {
                name: tool.name().to_string(),
                description: tool.description().to_string(),
                parameters: tool.schema(),
            })
            .collect()
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Invoke a tool by name. Unknown names are an error the caller turns
    /// into a tool-result message, like any other tool failure.
    pub async fn dispatch(
        &self,
        name: &str,
        input: &serde_json::Value,
    ) -> Result<String, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::UnknownTool(name.to_string()))?;
        tool.invoke(input).await
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

/// Convert a tool definition to the OpenAI-style function declaration used
/// by the Groq API.
pub fn to_function_declaration(tool: &ToolDefinition) -> serde_json::Value {
    serde_json::json!({
        "type": "function",
        "function": {
            "name": tool.name,
            "description": tool.description,
            "parameters": tool.parameters,
        }
    })
}
