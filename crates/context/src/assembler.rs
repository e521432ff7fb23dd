//! Context Assembler - Builds the bounded knowledge and history block
//!
//! Provides:
//! - Sort classification with a neutral fallback
//! - Concurrent retrieval across collections with per-call timeouts
//! - Greedy, stop-at-first-overflow snippet packing
//! - Most-recent-first history inclusion

use crate::classifier::SortClassifier;
use crate::guard::{bounded, CallKind};
use crate::retrieval::{rank_results, Retriever};
use futures::future::join_all;
use picforge_common::config::PromptConfig;
use picforge_common::metrics::{record_budget, record_classification_fallback, record_retrieval};
use picforge_common::{AppError, MemoryQueryResult, Result, SortType, TokenCounter};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

const SNIPPET_SEPARATOR: &str = "\n\n";
const SECTION_SEPARATOR: &str = "\n";

/// Result of context assembly
#[derive(Debug, Clone, Default, PartialEq)]
pub struct AssembledContext {
    /// Final context: non-empty sections joined by a newline
    pub text: String,

    /// Preamble plus packed snippets, or empty
    pub snippet_section: String,

    /// Preamble plus history tail, or empty
    pub history_section: String,

    /// Number of snippets that fit
    pub snippets_included: usize,

    pub remaining_tokens: i64,
    pub snippet_budget: i64,
    pub history_budget: i64,
}

/// Assembles retrieved snippets and history within a token budget
pub struct ContextAssembler {
    retriever: Arc<dyn Retriever>,
    classifier: Arc<dyn SortClassifier>,
    counter: Arc<dyn TokenCounter>,
    collections: Vec<String>,
    knowledge_preamble: String,
    history_preamble: String,
    retrieval_timeout: Duration,
    classifier_timeout: Duration,
}

impl ContextAssembler {
    pub fn new(
        config: &PromptConfig,
        retriever: Arc<dyn Retriever>,
        classifier: Arc<dyn SortClassifier>,
        counter: Arc<dyn TokenCounter>,
        collections: Vec<String>,
        retrieval_timeout: Duration,
        classifier_timeout: Duration,
    ) -> Self {
        Self {
            retriever,
            classifier,
            counter,
            collections,
            knowledge_preamble: config.knowledge_preamble.clone(),
            history_preamble: config.history_preamble.clone(),
            retrieval_timeout,
            classifier_timeout,
        }
    }

    /// Classify the intent; any failure other than cancellation yields `Unsorted`
    pub async fn classify(&self, intent: &str, cancel: &CancellationToken) -> Result<SortType> {
        let outcome = bounded(
            "classification",
            CallKind::Collaborator,
            self.classifier_timeout,
            cancel,
            self.classifier.classify(intent),
        )
        .await;

        match outcome {
            Ok(sort) => Ok(sort),
            Err(AppError::Cancelled) => Err(AppError::Cancelled),
            Err(e) => {
                warn!(
                    stage = "classified",
                    code = e.code().as_code(),
                    "Sort classification failed, using unsorted"
                );
                record_classification_fallback();
                Ok(SortType::Unsorted)
            }
        }
    }

    /// Query every collection concurrently and rank the merged results.
    ///
    /// A failed or timed-out collection contributes nothing. Nothing is
    /// queried when the snippet budget is not positive.
    pub async fn retrieve(
        &self,
        intent: &str,
        sort: SortType,
        snippet_budget: i64,
        cancel: &CancellationToken,
    ) -> Result<Vec<MemoryQueryResult>> {
        if snippet_budget <= 0 {
            debug!(snippet_budget, "No snippet budget, skipping retrieval");
            return Ok(Vec::new());
        }

        let queries = self.collections.iter().map(|collection| async move {
            let outcome = bounded(
                "retrieval",
                CallKind::Collaborator,
                self.retrieval_timeout,
                cancel,
                self.retriever.search(collection, intent, sort),
            )
            .await;

            match &outcome {
                Ok(results) => record_retrieval(collection, results.len(), true),
                Err(AppError::Cancelled) => {}
                Err(e) => {
                    warn!(
                        stage = "retrieved",
                        collection = %collection,
                        code = e.code().as_code(),
                        "Retrieval failed, continuing without this collection"
                    );
                    record_retrieval(collection, 0, false);
                }
            }
            outcome
        });

        let mut batches = Vec::with_capacity(self.collections.len());
        for outcome in join_all(queries).await {
            match outcome {
                Ok(results) => batches.push(results),
                Err(AppError::Cancelled) => return Err(AppError::Cancelled),
                Err(_) => batches.push(Vec::new()),
            }
        }

        Ok(rank_results(batches))
    }

    /// Pack ranked snippets and the history tail into the context budget
    pub fn assemble(
        &self,
        ranked: &[MemoryQueryResult],
        history: &str,
        remaining: i64,
        snippet_budget: i64,
    ) -> AssembledContext {
        let counter = self.counter.as_ref();

        let (snippet_section, snippets_included) =
            self.snippet_section(ranked, snippet_budget, counter);

        let mut history_budget = remaining - counter.count(&snippet_section) as i64;
        if !snippet_section.is_empty() {
            history_budget -= counter.count(SECTION_SEPARATOR) as i64;
        }
        let history_section = self.history_section(history, history_budget, counter);

        record_budget("context", remaining);
        record_budget("snippets", snippet_budget);
        record_budget("history", history_budget);

        let text = [snippet_section.as_str(), history_section.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(SECTION_SEPARATOR);

        AssembledContext {
            text,
            snippet_section,
            history_section,
            snippets_included,
            remaining_tokens: remaining,
            snippet_budget,
            history_budget,
        }
    }

    fn snippet_section(
        &self,
        ranked: &[MemoryQueryResult],
        snippet_budget: i64,
        counter: &dyn TokenCounter,
    ) -> (String, usize) {
        let header = format!("{}{}", self.knowledge_preamble, SECTION_SEPARATOR);
        let budget = snippet_budget - counter.count(&header) as i64;
        let snippets = accumulate_snippets(ranked, budget, counter);

        if snippets.is_empty() {
            return (String::new(), 0);
        }
        let included = snippets.len();
        (format!("{}{}", header, snippets.join(SNIPPET_SEPARATOR)), included)
    }

    fn history_section(
        &self,
        history: &str,
        history_budget: i64,
        counter: &dyn TokenCounter,
    ) -> String {
        if history_budget <= 0 || history.is_empty() {
            return String::new();
        }

        let header = format!("{}{}", self.history_preamble, SECTION_SEPARATOR);
        let tail = match usize::try_from(history_budget - counter.count(&header) as i64) {
            Ok(limit) => counter.keep_tail(history, limit),
            Err(_) => "",
        };

        if tail.is_empty() {
            String::new()
        } else {
            format!("{}{}", header, tail)
        }
    }
}

/// Take snippets in rank order while they fit; stop at the first that does not.
///
/// Each snippet after the first is also charged for its separator.
pub fn accumulate_snippets<'a>(
    ranked: &'a [MemoryQueryResult],
    budget: i64,
    counter: &dyn TokenCounter,
) -> Vec<&'a str> {
    let separator_cost = counter.count(SNIPPET_SEPARATOR) as i64;
    let mut remaining = budget;
    let mut taken = Vec::new();

    for result in ranked {
        let separator = if taken.is_empty() { 0 } else { separator_cost };
        let cost = counter.count(&result.text) as i64 + separator;
        if cost > remaining {
            break;
        }
        remaining -= cost;
        taken.push(result.text.as_str());
    }

    taken
}
