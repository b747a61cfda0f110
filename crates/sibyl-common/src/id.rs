use serde::{Deserialize, Serialize};
use std::fmt;

pub fn new_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

/// Identifier for a conversation thread. Each thread has its own isolated
/// transcript and bookkeeping; nothing is shared across threads.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ThreadId(String);

impl ThreadId {
    pub fn new() -> Self {
        Self(new_id())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for ThreadId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<&str> for ThreadId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for ThreadId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for ThreadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn new_id_is_valid_uuid() {
        let id = new_id();
        let parsed = uuid::Uuid::parse_str(&id);
        assert!(parsed.is_ok());
        assert_eq!(parsed.unwrap().get_version_num(), 4);
    }

    #[test]
    fn new_id_is_unique() {
        let a = new_id();
        let b = new_id();
        assert_ne!(a, b);
    }

    #[test]
    fn thread_id_new() {
        let tid = ThreadId::new();
        assert!(uuid::Uuid::parse_str(tid.as_str()).is_ok());
    }

    #[test]
    fn thread_id_from_str_round_trips() {
        let tid = ThreadId::from("chat-window-1");
        assert_eq!(tid.as_str(), "chat-window-1");
        assert_eq!(tid.to_string(), "chat-window-1");
    }

    #[test]
    fn thread_id_equality_and_hash() {
        use std::collections::HashSet;
        let a = ThreadId::from("t1");
        let b = ThreadId::from("t1");
        assert_eq!(a, b);

        let mut set = HashSet::new();
        set.insert(a);
        set.insert(b);
        assert_eq!(set.len(), 1);
    }

    #[test]
    fn thread_id_serialization() {
        let tid = ThreadId::from("t42");
        let json = serde_json::to_string(&tid).unwrap();
        let back: ThreadId = serde_json::from_str(&json).unwrap();
        assert_eq!(tid, back);
    }
}
