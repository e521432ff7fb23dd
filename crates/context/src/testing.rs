//! Scripted collaborators for unit tests

use crate::classifier::SortClassifier;
use crate::completion::{CompletionSettings, TextCompletionProvider};
use crate::retrieval::Retriever;
use async_trait::async_trait;
use picforge_common::{AppError, MemoryQueryResult, Result, SortType};
use std::collections::{HashMap, VecDeque};
use std::sync::Mutex;
use std::time::Duration;

/// Completion provider that replays scripted replies and records each call
pub struct FakeCompletion {
    replies: Mutex<VecDeque<Result<String>>>,
    calls: Mutex<Vec<(String, CompletionSettings)>>,
    delay: Option<Duration>,
}

impl FakeCompletion {
    pub fn replying(replies: Vec<Result<String>>) -> Self {
        Self {
            replies: Mutex::new(replies.into()),
            calls: Mutex::new(Vec::new()),
            delay: None,
        }
    }

    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn calls(&self) -> Vec<(String, CompletionSettings)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl TextCompletionProvider for FakeCompletion {
    async fn complete(&self, prompt: &str, settings: &CompletionSettings) -> Result<String> {
        self.calls.lock().unwrap().push((prompt.to_string(), settings.clone()));
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        self.replies.lock().unwrap().pop_front().unwrap_or_else(|| {
            Err(AppError::Completion {
                message: "no scripted reply".to_string(),
            })
        })
    }

    fn model_name(&self) -> &str {
        "fake-model"
    }
}

enum Scripted {
    Results(Vec<MemoryQueryResult>),
    Failure,
    Slow(Duration, Vec<MemoryQueryResult>),
}

/// Retriever with per-collection results, failures or delays
#[derive(Default)]
pub struct FakeRetriever {
    collections: HashMap<String, Scripted>,
    calls: Mutex<Vec<(String, String, SortType)>>,
}

impl FakeRetriever {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_results(mut self, collection: &str, results: Vec<MemoryQueryResult>) -> Self {
        self.collections.insert(collection.to_string(), Scripted::Results(results));
        self
    }

    pub fn with_failure(mut self, collection: &str) -> Self {
        self.collections.insert(collection.to_string(), Scripted::Failure);
        self
    }

    pub fn with_delay(
        mut self,
        collection: &str,
        delay: Duration,
        results: Vec<MemoryQueryResult>,
    ) -> Self {
        self.collections.insert(collection.to_string(), Scripted::Slow(delay, results));
        self
    }

    pub fn calls(&self) -> Vec<(String, String, SortType)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl Retriever for FakeRetriever {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        sort: SortType,
    ) -> Result<Vec<MemoryQueryResult>> {
        self.calls
            .lock()
            .unwrap()
            .push((collection.to_string(), query.to_string(), sort));

        match self.collections.get(collection) {
            Some(Scripted::Results(results)) => Ok(results.clone()),
            Some(Scripted::Failure) => Err(AppError::Retrieval {
                collection: collection.to_string(),
                message: "index unavailable".to_string(),
            }),
            Some(Scripted::Slow(delay, results)) => {
                tokio::time::sleep(*delay).await;
                Ok(results.clone())
            }
            None => Ok(Vec::new()),
        }
    }
}

/// Classifier returning a fixed answer
pub struct FakeClassifier {
    answer: Option<SortType>,
}

impl FakeClassifier {
    pub fn returning(sort: SortType) -> Self {
        Self { answer: Some(sort) }
    }

    pub fn failing() -> Self {
        Self { answer: None }
    }
}

#[async_trait]
impl SortClassifier for FakeClassifier {
    async fn classify(&self, _intent: &str) -> Result<SortType> {
        self.answer.ok_or_else(|| AppError::Classification {
            message: "label not recognised".to_string(),
        })
    }
}

/// Snippet helper: relevance-tagged result in the given collection
pub fn snippet(collection: &str, id: &str, text: &str, relevance: f64) -> MemoryQueryResult {
    MemoryQueryResult::new(collection, id, text, relevance)
}
