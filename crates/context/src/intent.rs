//! Intent extraction from the recent conversation

use crate::budget::BudgetAllocator;
use crate::completion::{CompletionSettings, TextCompletionProvider};
use crate::guard::{bounded, CallKind};
use crate::template::PromptRenderer;
use picforge_common::config::PromptConfig;
use picforge_common::metrics::record_completion;
use picforge_common::models::keys;
use picforge_common::{ConversationState, Result};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio_util::sync::CancellationToken;
use tracing::debug;

/// Produces the user intent statement that drives retrieval
pub struct IntentExtractor {
    completion: Arc<dyn TextCompletionProvider>,
    renderer: Arc<PromptRenderer>,
    template: String,
    prefix: String,
    stop_sequences: Vec<String>,
    settings: CompletionSettings,
    timeout: Duration,
}

impl IntentExtractor {
    pub fn new(
        config: &PromptConfig,
        completion: Arc<dyn TextCompletionProvider>,
        renderer: Arc<PromptRenderer>,
        timeout: Duration,
    ) -> Self {
        let settings =
            CompletionSettings::from_generation(&config.intent, config.response_token_limit)
                .with_stop_sequences(config.intent_stop_sequences.clone());

        Self {
            completion,
            renderer,
            template: config.intent_extraction_template.clone(),
            prefix: config.intent_prefix.clone(),
            stop_sequences: config.intent_stop_sequences.clone(),
            settings,
            timeout,
        }
    }

    /// Extract the intent for `state`.
    ///
    /// A caller-supplied `planUserIntent` is returned verbatim. Otherwise the
    /// history is cut to its most recent tokens within the intent budget and
    /// the model is asked to restate the request. Completion failures are
    /// returned to the caller unchanged.
    pub async fn extract(
        &self,
        state: &ConversationState,
        budget: &BudgetAllocator,
        cancel: &CancellationToken,
    ) -> Result<String> {
        if let Some(planned) = state.get(keys::PLAN_USER_INTENT) {
            debug!("Using caller-supplied intent");
            return Ok(planned.to_string());
        }

        let remaining = budget.remaining_for_intent();
        let history = match usize::try_from(remaining) {
            Ok(limit) if limit > 0 => {
                budget.counter().keep_tail(state.get_or_empty(keys::HISTORY), limit)
            }
            _ => "",
        };

        let intent_state = state
            .clone()
            .with(keys::HISTORY, history)
            .with(keys::TOKEN_LIMIT, remaining.to_string());
        let prompt = self.renderer.render_now(&self.template, &intent_state);

        let start = Instant::now();
        let outcome = bounded(
            "intent extraction",
            CallKind::Completion,
            self.timeout,
            cancel,
            self.completion.complete(&prompt, &self.settings),
        )
        .await;
        record_completion(start.elapsed().as_secs_f64(), "intent", outcome.is_ok());

        let raw = outcome?;
        Ok(format!("{}{}", self.prefix, self.clean(&raw)))
    }

    /// Trim the reply and cut anything from a stop sequence onwards
    fn clean<'a>(&self, raw: &'a str) -> &'a str {
        let end = self
            .stop_sequences
            .iter()
            .filter(|s| !s.is_empty())
            .filter_map(|s| raw.find(s.as_str()))
            .min()
            .unwrap_or(raw.len());
        raw[..end].trim()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCompletion;
    use picforge_common::tokens::HeuristicTokenCounter;
    use picforge_common::{AppError, ErrorCode, TokenCounter};

    fn config() -> PromptConfig {
        PromptConfig {
            completion_token_limit: 100,
            response_token_limit: 20,
            system_description: "d".to_string(),
            system_intent: "i".to_string(),
            system_intent_continuation: "c".to_string(),
            intent_extraction_template: "{{$History}}|{{$tokenLimit}}".to_string(),
            ..PromptConfig::default()
        }
    }

    fn setup(
        config: &PromptConfig,
        completion: Arc<FakeCompletion>,
    ) -> (IntentExtractor, BudgetAllocator) {
        let counter: Arc<dyn TokenCounter> = Arc::new(HeuristicTokenCounter::new(1));
        let renderer = Arc::new(PromptRenderer::new(config).unwrap());
        let extractor = IntentExtractor::new(config, completion, renderer, Duration::from_secs(1));
        (extractor, BudgetAllocator::new(config, counter))
    }

    #[tokio::test]
    async fn test_history_truncated_to_recent_tail() {
        let config = config();
        let completion = Arc::new(FakeCompletion::replying(vec![Ok(" sunsets at the beach ".to_string())]));
        let (extractor, budget) = setup(&config, completion.clone());

        // intent budget = 100 - 20 - len("d\ni\nc") = 75
        let history = format!("{}{}", "x".repeat(50), "y".repeat(75));
        let state = ConversationState::new().with(keys::HISTORY, history);

        let intent = extractor.extract(&state, &budget, &CancellationToken::new()).await.unwrap();
        assert_eq!(intent, "User intent: sunsets at the beach");

        let calls = completion.calls();
        assert_eq!(calls[0].0, format!("{}|75", "y".repeat(75)));
        assert_eq!(calls[0].1.stop_sequences, vec!["] bot:".to_string()]);
    }

    #[tokio::test]
    async fn test_planned_intent_skips_completion() {
        let config = config();
        let completion = Arc::new(FakeCompletion::replying(vec![]));
        let (extractor, budget) = setup(&config, completion.clone());

        let state = ConversationState::new().with(keys::PLAN_USER_INTENT, "User intent: cats");
        let intent = extractor.extract(&state, &budget, &CancellationToken::new()).await.unwrap();

        assert_eq!(intent, "User intent: cats");
        assert!(completion.calls().is_empty());
    }

    #[tokio::test]
    async fn test_non_positive_budget_sends_no_history() {
        let mut config = config();
        config.completion_token_limit = 22;
        let completion = Arc::new(FakeCompletion::replying(vec![Ok("cats".to_string())]));
        let (extractor, budget) = setup(&config, completion.clone());

        let state = ConversationState::new().with(keys::HISTORY, "user: show me cats");
        extractor.extract(&state, &budget, &CancellationToken::new()).await.unwrap();

        assert!(completion.calls()[0].0.starts_with('|'));
    }

    #[tokio::test]
    async fn test_reply_cut_at_stop_sequence() {
        let config = config();
        let completion = Arc::new(FakeCompletion::replying(vec![Ok("dogs in snow] bot: hi".to_string())]));
        let (extractor, budget) = setup(&config, completion);

        let intent = extractor
            .extract(&ConversationState::new(), &budget, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(intent, "User intent: dogs in snow");
    }

    #[tokio::test]
    async fn test_completion_failure_propagates() {
        let config = config();
        let completion = Arc::new(FakeCompletion::replying(vec![Err(AppError::Completion {
            message: "quota".to_string(),
        })]));
        let (extractor, budget) = setup(&config, completion.clone());

        let err = extractor
            .extract(&ConversationState::new(), &budget, &CancellationToken::new())
            .await
            .unwrap_err();
        assert_eq!(err.code(), ErrorCode::CompletionError);
        assert_eq!(completion.calls().len(), 1);
    }
}
