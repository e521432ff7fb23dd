//! Sort classification of the user intent
//!
//! Maps the intent text to a [`SortType`] that retrievers use to order
//! their results. Two implementations:
//! - keyword cues (no network)
//! - a single-label completion call

use crate::completion::{CompletionSettings, TextCompletionProvider};
use async_trait::async_trait;
use picforge_common::config::ClassifierConfig;
use picforge_common::{AppError, Result, SortType};
use std::sync::Arc;

/// Trait for intent classification
#[async_trait]
pub trait SortClassifier: Send + Sync {
    async fn classify(&self, intent: &str) -> Result<SortType>;
}

const OLDEST_CUES: &[&str] =
    &["oldest", "earliest", "first ", "chronological", "from the beginning"];
const NEWEST_CUES: &[&str] =
    &["newest", "latest", "most recent", "recently", "last ", "this week", "today"];

/// Heuristic classifier based on recency and age cue words
#[derive(Debug, Clone, Default)]
pub struct KeywordSortClassifier;

impl KeywordSortClassifier {
    pub fn new() -> Self {
        Self
    }

    fn detect(&self, intent: &str) -> SortType {
        let text = intent.to_lowercase();

        // Age cues take priority: "my first" should not match "latest"
        if contains_any(&text, OLDEST_CUES) {
            return SortType::OldestFirst;
        }

        if contains_any(&text, NEWEST_CUES) {
            return SortType::NewestFirst;
        }

        if contains_any(&text, &["best", "most relevant", "closest", "top "]) {
            return SortType::Relevance;
        }

        SortType::Unsorted
    }
}

fn contains_any(text: &str, cues: &[&str]) -> bool {
    cues.iter().any(|cue| text.contains(cue))
}

#[async_trait]
impl SortClassifier for KeywordSortClassifier {
    async fn classify(&self, intent: &str) -> Result<SortType> {
        Ok(self.detect(intent))
    }
}

const CLASSIFICATION_PROMPT: &str = "Classify how the pictures the user asks for should be ordered.\n\
Answer with exactly one word: newest, oldest, relevance, or none.\n\n";

/// Classifier that asks the language model for a single label
pub struct CompletionSortClassifier {
    completion: Arc<dyn TextCompletionProvider>,
    settings: CompletionSettings,
}

impl CompletionSortClassifier {
    pub fn new(completion: Arc<dyn TextCompletionProvider>) -> Self {
        let settings = CompletionSettings {
            max_tokens: 5,
            temperature: 0.0,
            top_p: 1.0,
            frequency_penalty: 0.0,
            presence_penalty: 0.0,
            stop_sequences: vec!["\n".to_string()],
        };
        Self { completion, settings }
    }
}

#[async_trait]
impl SortClassifier for CompletionSortClassifier {
    async fn classify(&self, intent: &str) -> Result<SortType> {
        let prompt = format!("{}{}\nOrder:", CLASSIFICATION_PROMPT, intent);
        let label = self.completion.complete(&prompt, &self.settings).await.map_err(|e| {
            AppError::Classification { message: e.to_string() }
        })?;

        label
            .parse::<SortType>()
            .map_err(|message| AppError::Classification { message })
    }
}

/// Create a classifier based on configuration
pub fn create_sort_classifier(
    config: &ClassifierConfig,
    completion: Arc<dyn TextCompletionProvider>,
) -> Result<Arc<dyn SortClassifier>> {
    match config.provider.as_str() {
        "keyword" => Ok(Arc::new(KeywordSortClassifier::new())),
        "completion" => Ok(Arc::new(CompletionSortClassifier::new(completion))),
        other => Err(AppError::Configuration {
            message: format!("Unknown classifier provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeCompletion;

    #[tokio::test]
    async fn test_keyword_cues() {
        let classifier = KeywordSortClassifier::new();
        let cases = [
            ("User intent: show my latest beach photos", SortType::NewestFirst),
            ("User intent: the oldest picture of grandma", SortType::OldestFirst),
            ("User intent: best sunset shot", SortType::Relevance),
            ("User intent: pictures of cats", SortType::Unsorted),
        ];
        for (intent, expected) in cases {
            assert_eq!(classifier.classify(intent).await.unwrap(), expected, "{}", intent);
        }
    }

    #[tokio::test]
    async fn test_completion_label_parsed() {
        let completion = Arc::new(FakeCompletion::replying(vec![Ok(" Newest.".to_string())]));
        let classifier = CompletionSortClassifier::new(completion.clone());

        let sort = classifier.classify("User intent: recent dogs").await.unwrap();
        assert_eq!(sort, SortType::NewestFirst);

        let calls = completion.calls();
        assert_eq!(calls[0].1.temperature, 0.0);
        assert!(calls[0].0.contains("recent dogs"));
    }

    #[tokio::test]
    async fn test_unparseable_label_is_classification_error() {
        let completion = Arc::new(FakeCompletion::replying(vec![Ok("purple".to_string())]));
        let classifier = CompletionSortClassifier::new(completion);

        let err = classifier.classify("User intent: cats").await.unwrap_err();
        assert!(matches!(err, AppError::Classification { .. }));
    }

    #[tokio::test]
    async fn test_completion_failure_is_classification_error() {
        let completion = Arc::new(FakeCompletion::replying(vec![Err(AppError::Completion {
            message: "503".to_string(),
        })]));
        let classifier = CompletionSortClassifier::new(completion);

        let err = classifier.classify("User intent: cats").await.unwrap_err();
        assert!(err.is_degradable());
    }
}
