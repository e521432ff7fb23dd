//! Prompt template rendering
//!
//! Templates reference values as `{{$Name}}`. A placeholder resolves, in
//! increasing precedence, to the current time (`now`), one of the fixed
//! system texts, or a conversation variable. Unknown names render empty and
//! substituted values are never scanned again.

use chrono::{DateTime, Utc};
use picforge_common::config::PromptConfig;
use picforge_common::{AppError, ConversationState, Result};
use regex_lite::{Captures, Regex};
use std::collections::HashMap;

const PLACEHOLDER_PATTERN: &str = r"\{\{\$(\w+)\}\}";
const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S UTC";

/// Renders intent and chat templates against a conversation state
pub struct PromptRenderer {
    placeholder: Regex,
    fragments: Vec<(&'static str, String)>,
}

impl PromptRenderer {
    pub fn new(config: &PromptConfig) -> Result<Self> {
        let placeholder = Regex::new(PLACEHOLDER_PATTERN).map_err(|e| AppError::Internal {
            message: format!("Invalid placeholder pattern: {}", e),
        })?;

        let fragments = vec![
            ("SystemDescription", config.system_description.clone()),
            ("SystemIntent", config.system_intent.clone()),
            ("SystemIntentContinuation", config.system_intent_continuation.clone()),
            ("SystemResponse", config.system_response.clone()),
            ("SystemChatContinuation", config.system_chat_continuation.clone()),
        ];

        Ok(Self { placeholder, fragments })
    }

    /// Render `template` at the given instant
    pub fn render(&self, template: &str, state: &ConversationState, now: DateTime<Utc>) -> String {
        let now_text = now.format(TIMESTAMP_FORMAT).to_string();

        let mut values: HashMap<&str, String> = HashMap::new();
        for (name, text) in &self.fragments {
            // System texts may only reference the time
            let rendered = self.substitute(text, |key| (key == "now").then(|| now_text.clone()));
            values.insert(*name, rendered);
        }
        for (key, value) in state.iter() {
            values.insert(key, value.to_string());
        }
        values.entry("now").or_insert_with(|| now_text.clone());

        self.substitute(template, |key| values.get(key).cloned())
    }

    /// Render at the current time
    pub fn render_now(&self, template: &str, state: &ConversationState) -> String {
        self.render(template, state, Utc::now())
    }

    fn substitute<F>(&self, template: &str, lookup: F) -> String
    where
        F: Fn(&str) -> Option<String>,
    {
        self.placeholder
            .replace_all(template, |caps: &Captures| lookup(&caps[1]).unwrap_or_default())
            .into_owned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 5, 1, 12, 30, 0).unwrap()
    }

    fn renderer() -> PromptRenderer {
        let config = PromptConfig {
            system_description: "You know pictures.".to_string(),
            system_chat_continuation: "[{{$now}}] bot:".to_string(),
            ..PromptConfig::default()
        };
        PromptRenderer::new(&config).unwrap()
    }

    #[test]
    fn test_renders_state_and_fragments() {
        let state = ConversationState::new().with("UserIntent", "User intent: find cats");
        let out = renderer().render(
            "{{$SystemDescription}}\n{{$UserIntent}}\n{{$SystemChatContinuation}}",
            &state,
            fixed_now(),
        );
        assert_eq!(out, "You know pictures.\nUser intent: find cats\n[2024-05-01 12:30:00 UTC] bot:");
    }

    #[test]
    fn test_unknown_placeholder_renders_empty() {
        let out = renderer().render("a{{$Missing}}b", &ConversationState::new(), fixed_now());
        assert_eq!(out, "ab");
    }

    #[test]
    fn test_substituted_values_not_rescanned() {
        let state = ConversationState::new().with("History", "user: what is {{$SystemDescription}}?");
        let out = renderer().render("{{$History}}", &state, fixed_now());
        assert_eq!(out, "user: what is {{$SystemDescription}}?");
    }

    #[test]
    fn test_state_overrides_fragment() {
        let state = ConversationState::new().with("SystemDescription", "custom");
        let out = renderer().render("{{$SystemDescription}}", &state, fixed_now());
        assert_eq!(out, "custom");
    }

    #[test]
    fn test_text_without_placeholders_untouched() {
        let out = renderer().render("{{ plain }} {$x}", &ConversationState::new(), fixed_now());
        assert_eq!(out, "{{ plain }} {$x}");
    }
}
