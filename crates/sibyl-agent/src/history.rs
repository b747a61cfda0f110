//! Conversation trimming and summarization.
//!
//! The transcript handed to the model is bounded: system directives always
//! survive, older turns past the cap are discarded outright (no merging),
//! and a short keyword-based summary string is kept alongside.

use crate::{Message, Role};

/// Default number of recent messages retained per turn.
pub const DEFAULT_MAX_HISTORY: usize = 20;

/// Trim the transcript to at most `max_history` recent messages, always
/// preserving every system directive. Within the cap the input is returned
/// unchanged.
pub fn trim(messages: &[Message], max_history: usize) -> Vec<Message> {
    if messages.len() <= max_history {
        return messages.to_vec();
    }

    let system_msgs: Vec<Message> = messages
        .iter()
        .filter(|m| m.role == Role::System)
        .cloned()
        .collect();
    let recent = &messages[messages.len() - max_history..];

    let mut out = system_msgs;
    out.extend(recent.iter().cloned());
    out
}

/// Topic keywords checked against user messages when summarizing.
const TOPIC_TABLE: &[(&[&str], &str)] = &[
    (&["weather", "temperature", "climate"], "weather"),
    (&["calculate", "math", "equation"], "calculations"),
    (&["code", "programming", "python"], "programming"),
    (&["research", "paper", "study"], "research"),
];

/// Produce a short human-readable summary of the conversation so far.
pub fn summarize(messages: &[Message]) -> String {
    if messages.len() < 4 {
        return "New conversation".to_string();
    }

    let mut topics: Vec<&str> = Vec::new();
    for msg in messages {
        if msg.role != Role::User {
            continue;
        }
        let content = msg.content.to_lowercase();
        for (keywords, topic) in TOPIC_TABLE {
            if keywords.iter().any(|kw| content.contains(kw)) && !topics.contains(topic) {
                topics.push(*topic);
            }
        }
    }

    if !topics.is_empty() {
        format!("Discussion topics: {}", topics.join(", "))
    } else {
        format!("Conversation with {} exchanges", messages.len() / 2)
    }
}
