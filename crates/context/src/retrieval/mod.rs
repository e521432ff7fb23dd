//! Knowledge retrieval
//!
//! Provides:
//! - The [`Retriever`] collaborator interface
//! - Cross-collection merge with a stable relevance ranking
//! - An HTTP search index retriever and a local in-memory retriever

mod memory;
mod search;

pub use memory::{InMemoryRetriever, StoredDocument};
pub use search::SearchIndexRetriever;

use async_trait::async_trait;
use picforge_common::config::RetrievalConfig;
use picforge_common::{AppError, MemoryQueryResult, Result, SortType};
use std::cmp::Ordering;
use std::sync::Arc;

/// Trait for querying one knowledge collection.
///
/// Implementations must be safe to call concurrently for distinct collections.
#[async_trait]
pub trait Retriever: Send + Sync {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        sort: SortType,
    ) -> Result<Vec<MemoryQueryResult>>;
}

/// Merge per-collection batches and sort by relevance, highest first.
///
/// Batches are concatenated in collection order and the sort is stable, so
/// equal scores keep their retrieval order. NaN scores rank last.
pub fn rank_results(batches: Vec<Vec<MemoryQueryResult>>) -> Vec<MemoryQueryResult> {
    let mut merged: Vec<MemoryQueryResult> = batches.into_iter().flatten().collect();
    merged.sort_by(|a, b| compare_relevance(b.relevance, a.relevance));
    merged
}

fn compare_relevance(a: f64, b: f64) -> Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => Ordering::Equal,
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => a.partial_cmp(&b).unwrap_or(Ordering::Equal),
    }
}

/// Create a retriever based on configuration
pub fn create_retriever(config: &RetrievalConfig) -> Result<Arc<dyn Retriever>> {
    match config.provider.as_str() {
        "search" => {
            let retriever = SearchIndexRetriever::new(config)?;
            tracing::info!(collections = ?config.collections, "Search index retriever ready");
            Ok(Arc::new(retriever))
        }
        "memory" => {
            let retriever = match config.memory_path.as_deref() {
                Some(path) => InMemoryRetriever::from_file(path, config.top_k)?,
                None => {
                    tracing::warn!("No retrieval.memory_path configured, knowledge base is empty");
                    InMemoryRetriever::new(Vec::new(), config.top_k)
                }
            };
            tracing::info!(documents = retriever.len(), "In-memory retriever ready");
            Ok(Arc::new(retriever))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown retrieval provider: {}", other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::snippet;

    #[test]
    fn test_rank_sorts_descending_across_collections() {
        let ranked = rank_results(vec![
            vec![snippet("a", "1", "low", 0.2), snippet("a", "2", "high", 0.9)],
            vec![snippet("b", "3", "mid", 0.5)],
        ]);
        let ids: Vec<_> = ranked.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "3", "1"]);
    }

    #[test]
    fn test_equal_relevance_keeps_retrieval_order() {
        let batches = || {
            vec![
                vec![snippet("a", "first", "x", 0.7), snippet("a", "second", "y", 0.7)],
                vec![snippet("b", "third", "z", 0.7)],
            ]
        };
        for _ in 0..5 {
            let ids: Vec<_> = rank_results(batches()).into_iter().map(|r| r.document_id).collect();
            assert_eq!(ids, vec!["first", "second", "third"]);
        }
    }

    #[test]
    fn test_nan_ranks_last() {
        let ranked = rank_results(vec![vec![
            snippet("a", "nan", "x", f64::NAN),
            snippet("a", "ok", "y", 0.1),
        ]]);
        assert_eq!(ranked[0].document_id, "ok");
    }

    #[test]
    fn test_memory_provider_without_file() {
        let config = RetrievalConfig::default();
        assert!(create_retriever(&config).is_ok());
    }
}
