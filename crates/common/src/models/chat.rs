//! Wire shapes exchanged with the web layer

use serde::{Deserialize, Serialize};

/// A single key/value pair in a request or response variable list
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Variable {
    #[serde(rename = "Key", alias = "key")]
    pub key: String,

    #[serde(rename = "Value", alias = "value")]
    pub value: String,
}

impl Variable {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Incoming chat request.
///
/// Keys in `variables` need not be unique; when a key repeats, the later
/// entry wins.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatRequest {
    /// The new user message
    #[serde(rename = "Input", alias = "input", default)]
    pub input: String,

    /// Caller-supplied variables (e.g. `History`)
    #[serde(rename = "Variables", alias = "variables", default)]
    pub variables: Vec<Variable>,
}

impl ChatRequest {
    /// Create a request with no variables
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            input: input.into(),
            variables: Vec::new(),
        }
    }

    /// Append a variable
    pub fn with_variable(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.variables.push(Variable::new(key, value));
        self
    }
}

/// Outgoing chat response
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ChatResponse {
    /// Final answer text, after link rewriting
    #[serde(rename = "Value", alias = "value")]
    pub value: String,

    /// Final conversation state, in insertion order
    #[serde(rename = "Variables", alias = "variables")]
    pub variables: Vec<Variable>,
}

impl ChatResponse {
    /// Look up a variable by key
    pub fn variable(&self, key: &str) -> Option<&str> {
        self.variables
            .iter()
            .rev()
            .find(|v| v.key == key)
            .map(|v| v.value.as_str())
    }
}
