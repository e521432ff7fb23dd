//! Conversation state threaded through the pipeline stages
//!
//! The state is a value: each stage takes a snapshot and returns an updated
//! one via [`ConversationState::with`]. Nothing mutates a shared instance.

use super::chat::{ChatRequest, Variable};

/// Reserved variable names
pub mod keys {
    /// The current user message
    pub const INPUT: &str = "input";
    pub const HISTORY: &str = "History";
    pub const USER_INTENT: &str = "UserIntent";
    pub const CHAT_CONTEXT: &str = "ChatContext";
    pub const LINK: &str = "link";
    pub const PROMPT: &str = "prompt";
    pub const TOKEN_LIMIT: &str = "tokenLimit";
    /// Caller-supplied intent that skips intent extraction
    pub const PLAN_USER_INTENT: &str = "planUserIntent";
}

/// Ordered variable bag with last-write-wins key semantics
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ConversationState {
    entries: Vec<(String, String)>,
}

impl ConversationState {
    /// Create an empty state
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a state from a request: the input first, then each variable in order
    pub fn from_request(request: &ChatRequest) -> Self {
        request
            .variables
            .iter()
            .fold(
                Self::new().with(keys::INPUT, request.input.clone()),
                |state, var| state.with(var.key.clone(), var.value.clone()),
            )
    }

    /// Get a variable value
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Get a variable value, or the empty string when absent
    pub fn get_or_empty(&self, key: &str) -> &str {
        self.get(key).unwrap_or_default()
    }

    pub fn contains(&self, key: &str) -> bool {
        self.get(key).is_some()
    }

    /// Return a new snapshot with `key` set to `value`.
    ///
    /// An existing key keeps its position; a new key is appended.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        let key = key.into();
        let value = value.into();
        match self.entries.iter_mut().find(|(k, _)| *k == key) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((key, value)),
        }
        self
    }

    /// Iterate variables in insertion order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Convert into the response variable list
    pub fn to_variables(&self) -> Vec<Variable> {
        self.iter().map(|(k, v)| Variable::new(k, v)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seeded_from_request() {
        let request = ChatRequest::new("show me a sunset")
            .with_variable("History", "old")
            .with_variable("mood", "calm");
        let state = ConversationState::from_request(&request);

        assert_eq!(state.get(keys::INPUT), Some("show me a sunset"));
        assert_eq!(state.get(keys::HISTORY), Some("old"));
        assert_eq!(state.len(), 3);
    }

    #[test]
    fn test_later_variables_shadow_earlier() {
        let request = ChatRequest::new("hi")
            .with_variable("History", "first")
            .with_variable("History", "second");
        let state = ConversationState::from_request(&request);

        assert_eq!(state.get(keys::HISTORY), Some("second"));
        assert_eq!(state.len(), 2);
    }

    #[test]
    fn test_with_returns_new_snapshot() {
        let before = ConversationState::new().with("a", "1");
        let after = before.clone().with("a", "2").with("b", "3");

        assert_eq!(before.get("a"), Some("1"));
        assert_eq!(after.get("a"), Some("2"));
        let keys: Vec<_> = after.iter().map(|(k, _)| k).collect();
        assert_eq!(keys, vec!["a", "b"]);
    }

    #[test]
    fn test_missing_key_is_empty() {
        let state = ConversationState::new();
        assert_eq!(state.get_or_empty(keys::HISTORY), "");
        assert!(!state.contains(keys::LINK));
    }
}
