//! Conversation sessions and the turn loop.
//!
//! A `SessionManager` keeps one `Conversation` per thread id and drives each
//! turn: trim and summarize the transcript, pick a model, invoke it with the
//! tool catalog bound, execute any requested tools, and repeat until the
//! model answers without tool requests. All failures are contained to the
//! current turn.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use sha2::{Digest, Sha256};
use tracing::{debug, warn};

use sibyl_common::ThreadId;

use crate::models::{ModelRegistry, ModelSpec};
use crate::tools::ToolRegistry;
use crate::{history, task, AgentError, Message, ModelClient, Role, ToolDefinition};

/// Advisory record of a tool invocation. Written for observability only;
/// nothing reads it back and no eviction is needed because the transcript
/// itself is bounded by trimming.
#[derive(Debug, Clone)]
pub struct CachedToolResult {
    pub tool: String,
    pub content: String,
    /// Conversation summary at the time the tool ran.
    pub summary: String,
}

/// Guard that clears the `busy` flag on drop, ensuring it is always released
/// even if the future is cancelled or an early return occurs.
struct BusyGuard<'a> {
    flag: &'a AtomicBool,
}

impl<'a> BusyGuard<'a> {
    fn acquire(flag: &'a AtomicBool) -> Result<Self, AgentError> {
        if flag
            .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
            .is_err()
        {
            return Err(AgentError::Busy);
        }
        Ok(Self { flag })
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.flag.store(false, Ordering::Release);
    }
}

/// Per-thread conversation state. Lives in process memory only.
pub struct Conversation {
    messages: Vec<Message>,
    summary: String,
    tool_cache: HashMap<String, CachedToolResult>,
    error_count: u32,
    last_tool_used: Option<String>,
    last_model_used: Option<String>,
    model_switch_count: u32,
    busy: AtomicBool,
}

impl Conversation {
    fn new() -> Self {
        Self {
            messages: Vec::new(),
            summary: "New conversation".to_string(),
            tool_cache: HashMap::new(),
            error_count: 0,
            last_tool_used: None,
            last_model_used: None,
            model_switch_count: 0,
            busy: AtomicBool::new(false),
        }
    }

    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn summary(&self) -> &str {
        &self.summary
    }

    pub fn error_count(&self) -> u32 {
        self.error_count
    }

    pub fn last_tool_used(&self) -> Option<&str> {
        self.last_tool_used.as_deref()
    }

    pub fn last_model_used(&self) -> Option<&str> {
        self.last_model_used.as_deref()
    }

    pub fn model_switch_count(&self) -> u32 {
        self.model_switch_count
    }

    pub fn cached_tool_results(&self) -> usize {
        self.tool_cache.len()
    }
}

impl Default for Conversation {
    fn default() -> Self {
        Self::new()
    }
}

/// Drives turns for any number of conversation threads. One turn fully
/// resolves before the next is accepted; threads share nothing but the
/// model registry's health counters.
pub struct SessionManager {
    client: Arc<dyn ModelClient>,
    registry: ModelRegistry,
    tools: ToolRegistry,
    conversations: HashMap<ThreadId, Conversation>,
    max_history: usize,
    max_tool_rounds: u32,
    forced_model: Option<String>,
}

impl SessionManager {
    pub fn new(client: Arc<dyn ModelClient>, registry: ModelRegistry, tools: ToolRegistry) -> Self {
        Self {
            client,
            registry,
            tools,
            conversations: HashMap::new(),
            max_history: history::DEFAULT_MAX_HISTORY,
            max_tool_rounds: 10,
            forced_model: None,
        }
    }

    pub fn with_max_history(mut self, max: usize) -> Self {
        self.max_history = max;
        self
    }

    pub fn with_max_tool_rounds(mut self, max: u32) -> Self {
        self.max_tool_rounds = max;
        self
    }

    /// Force every turn onto a specific model, bypassing task preference.
    pub fn with_forced_model(mut self, name: impl Into<String>) -> Self {
        self.forced_model = Some(name.into());
        self
    }

    pub fn registry(&self) -> &ModelRegistry {
        &self.registry
    }

    pub fn conversation(&self, thread: &ThreadId) -> Option<&Conversation> {
        self.conversations.get(thread)
    }

    /// Drop a thread's transcript and bookkeeping.
    pub fn clear(&mut self, thread: &ThreadId) {
        self.conversations.remove(thread);
    }

    /// Resolve one user utterance into one assistant utterance.
    ///
    /// Model and tool failures never escape: they surface as a degraded
    /// assistant message or as tool-result messages the model can react to.
    /// The only error returned is `Busy` for re-entrant use of a thread.
    pub async fn chat(&mut self, thread: &ThreadId, user_text: &str) -> Result<String, AgentError> {
        let Self {
            client,
            registry,
            tools,
            conversations,
            max_history,
            max_tool_rounds,
            forced_model,
        } = self;

        let conv = conversations.entry(thread.clone()).or_default();
        let _guard = BusyGuard::acquire(&conv.busy)?;

        conv.messages.push(Message::user(user_text));
        conv.summary = history::summarize(&conv.messages);

        let tool_defs = tools.definitions();
        if !conv.messages.iter().any(|m| m.role == Role::System) {
            let prompt = system_prompt(&conv.summary, conv.last_tool_used.as_deref(), &tool_defs);
            conv.messages.insert(0, Message::system(prompt));
        }
        conv.messages = history::trim(&conv.messages, *max_history);

        // Pick a model for this turn.
        let category = task::classify(user_text);
        let selected = match forced_model {
            Some(name) => registry.acquire_forced(client.as_ref(), name).await,
            None => registry.acquire(client.as_ref(), category).await,
        };
        let mut spec = match selected {
            Ok(spec) => spec,
            Err(e) => {
                return Ok(degrade(
                    &mut conv.messages,
                    &mut conv.error_count,
                    &e,
                ))
            }
        };
        track_model(&mut conv.last_model_used, &mut conv.model_switch_count, &spec);

        let mut rounds = 0u32;
        let mut retried = false;

        loop {
            let response = match client.invoke(&spec, &conv.messages, &tool_defs).await {
                Ok(response) => {
                    // Degrading is reserved for consecutive failures, so a
                    // later failure in the same turn gets its own retry.
                    retried = false;
                    response
                }
                Err(e) => {
                    registry.record_failure(&spec.name);
                    if !retried {
                        retried = true;
                        warn!(model = %spec.name, error = %e, "model call failed, retrying on alternate");
                        match registry.acquire_alternate(client.as_ref()).await {
                            Ok(alt) => {
                                track_model(
                                    &mut conv.last_model_used,
                                    &mut conv.model_switch_count,
                                    &alt,
                                );
                                spec = alt;
                                continue;
                            }
                            Err(e2) => {
                                return Ok(degrade(
                                    &mut conv.messages,
                                    &mut conv.error_count,
                                    &e2,
                                ))
                            }
                        }
                    }
                    // Second consecutive failure: degraded answer, no tool step.
                    return Ok(degrade(&mut conv.messages, &mut conv.error_count, &e));
                }
            };

            if response.tool_calls.is_empty() {
                conv.messages.push(Message::assistant(response.content.clone()));
                conv.error_count = 0;
                return Ok(response.content);
            }

            rounds += 1;
            if rounds > *max_tool_rounds {
                debug!("max tool rounds reached, returning partial response");
                conv.messages.push(Message::assistant(response.content.clone()));
                return Ok(response.content);
            }

            if !response.content.is_empty() {
                conv.messages.push(Message::assistant(response.content.clone()));
            }

            // Execute requested tools in order; failures become tool-result
            // messages so the model can recover or explain.
            for call in &response.tool_calls {
                match tools.dispatch(&call.name, &call.arguments).await {
                    Ok(result) => {
                        debug!(tool = %call.name, "tool executed");
                        conv.last_tool_used = Some(call.name.clone());
                        conv.tool_cache.insert(
                            cache_key(&call.name, &result),
                            CachedToolResult {
                                tool: call.name.clone(),
                                content: result.clone(),
                                summary: conv.summary.clone(),
                            },
                        );
                        conv.messages.push(Message::tool_result(&call.name, result));
                    }
                    Err(e) => {
                        warn!(tool = %call.name, error = %e, "tool execution failed");
                        conv.messages
                            .push(Message::tool_result(&call.name, format!("Error: {e}")));
                    }
                }
            }
        }
    }
}

fn track_model(last: &mut Option<String>, switches: &mut u32, spec: &ModelSpec) {
    if let Some(previous) = last {
        if previous != &spec.name {
            *switches += 1;
        }
    }
    *last = Some(spec.name.clone());
}

/// Append the degraded apology for a turn whose model calls could not be
/// completed, and bump the informational error counter.
fn degrade(messages: &mut Vec<Message>, error_count: &mut u32, err: &AgentError) -> String {
    *error_count += 1;
    let apology = format!(
        "I encountered an issue processing your request (attempt {}). \
         Please try again in a moment. Error: {err}",
        error_count
    );
    messages.push(Message::assistant(apology.clone()));
    apology
}

/// Advisory cache key: tool name plus a short digest of the first hundred
/// characters of the result.
fn cache_key(tool: &str, content: &str) -> String {
    let head: String = content.chars().take(100).collect();
    let digest = Sha256::digest(head.as_bytes());
    let hex: String = digest.iter().take(8).map(|b| format!("{b:02x}")).collect();
    format!("{tool}_{hex}")
}

fn system_prompt(summary: &str, last_tool: Option<&str>, tools: &[ToolDefinition]) -> String {
    let mut catalog = String::new();
    for tool in tools {
        catalog.push_str(&format!("- {}: {}\n", tool.name, tool.description));
    }

    format!(
        "You are Sibyl, a research assistant with access to utility and research tools.\n\n\
         Current conversation summary: {summary}\n\
         Last successful tool: {}\n\n\
         Available tools:\n{catalog}\n\
         Guidelines:\n\
         1. Use the appropriate tool whenever the question needs current information, \
         academic research, calculations, code review, weather, or file generation.\n\
         2. Be concise but comprehensive.\n\
         3. If a tool fails, try an alternative approach or explain the failure.\n\
         4. Prefer tool output over general knowledge when a tool can give a better answer.",
        last_tool.unwrap_or("None"),
    )
}
