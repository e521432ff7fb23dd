//! In-memory retriever over a local document file

use super::Retriever;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use picforge_common::{AppError, MemoryQueryResult, Result, SortType};
use serde::{Deserialize, Serialize};
use std::cmp::Reverse;
use std::collections::HashSet;

/// Terms too common in intents to carry any signal
const STOP_WORDS: &[&str] = &[
    "the", "and", "for", "with", "from", "that", "this", "are", "was", "user", "intent", "show",
    "find", "wants", "see", "some", "any", "all", "can", "you", "please",
];

/// One indexed picture description
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredDocument {
    pub collection: String,
    pub id: String,
    pub text: String,
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
}

struct IndexedDocument {
    document: StoredDocument,
    terms: HashSet<String>,
}

/// Term-overlap retriever loaded once at startup
pub struct InMemoryRetriever {
    documents: Vec<IndexedDocument>,
    top_k: usize,
}

impl InMemoryRetriever {
    pub fn new(documents: Vec<StoredDocument>, top_k: usize) -> Self {
        let documents = documents
            .into_iter()
            .map(|document| IndexedDocument {
                terms: terms(&document.text),
                document,
            })
            .collect();

        Self { documents, top_k }
    }

    /// Load a JSON array of documents
    pub fn from_file(path: &str, top_k: usize) -> Result<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| AppError::Configuration {
            message: format!("Failed to read documents from {}: {}", path, e),
        })?;
        let documents: Vec<StoredDocument> =
            serde_json::from_str(&raw).map_err(|e| AppError::Configuration {
                message: format!("Failed to parse documents in {}: {}", path, e),
            })?;

        Ok(Self::new(documents, top_k))
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

/// Lowercased alphanumeric terms longer than two characters
fn terms(text: &str) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|w| w.chars().count() > 2)
        .map(|w| w.to_lowercase())
        .filter(|w| !STOP_WORDS.contains(&w.as_str()))
        .collect()
}

/// Jaccard overlap between two term sets
fn overlap(a: &HashSet<String>, b: &HashSet<String>) -> f64 {
    if a.is_empty() || b.is_empty() {
        return 0.0;
    }

    let intersection = a.intersection(b).count();
    let union = a.union(b).count();

    intersection as f64 / union as f64
}

#[async_trait]
impl Retriever for InMemoryRetriever {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        sort: SortType,
    ) -> Result<Vec<MemoryQueryResult>> {
        let query_terms = terms(query);

        let mut matches: Vec<(&StoredDocument, f64)> = self
            .documents
            .iter()
            .filter(|d| d.document.collection == collection)
            .map(|d| (&d.document, overlap(&query_terms, &d.terms)))
            .filter(|(_, score)| *score > 0.0)
            .collect();

        // Stable sorts keep file order among equals
        match sort {
            SortType::Unsorted | SortType::Relevance => {
                matches.sort_by(|a, b| b.1.total_cmp(&a.1));
            }
            SortType::NewestFirst => {
                matches.sort_by_key(|(d, _)| Reverse(d.created_at));
            }
            SortType::OldestFirst => {
                // Undated documents go last
                matches.sort_by_key(|(d, _)| (d.created_at.is_none(), d.created_at));
            }
        }

        Ok(matches
            .into_iter()
            .take(self.top_k)
            .map(|(d, score)| MemoryQueryResult::new(collection, &d.id, &d.text, score))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn doc(id: &str, text: &str, year: Option<i32>) -> StoredDocument {
        StoredDocument {
            collection: "embeddings".to_string(),
            id: id.to_string(),
            text: text.to_string(),
            created_at: year.map(|y| Utc.with_ymd_and_hms(y, 1, 1, 0, 0, 0).unwrap()),
        }
    }

    fn retriever() -> InMemoryRetriever {
        InMemoryRetriever::new(
            vec![
                doc("1", "File: beach2019.jpg\nA sunset over the beach.", Some(2019)),
                doc("2", "File: beach2023.jpg\nKids building a sandcastle on the beach.", Some(2023)),
                doc("3", "File: cat.jpg\nA cat asleep on a sofa.", Some(2021)),
                doc("4", "File: beach.jpg\nBeach umbrellas.", None),
            ],
            2,
        )
    }

    #[tokio::test]
    async fn test_relevance_picks_best_overlap() {
        let results = retriever()
            .search("embeddings", "User intent: sunset at the beach", SortType::Relevance)
            .await
            .unwrap();
        assert_eq!(results[0].document_id, "1");
        assert!(results.iter().all(|r| r.relevance > 0.0));
        assert!(results.len() <= 2);
    }

    #[tokio::test]
    async fn test_newest_first_chooses_recent_matches() {
        let results = retriever()
            .search("embeddings", "beach", SortType::NewestFirst)
            .await
            .unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["2", "1"]);
    }

    #[tokio::test]
    async fn test_oldest_first_puts_undated_last() {
        let results = retriever()
            .search("embeddings", "beach", SortType::OldestFirst)
            .await
            .unwrap();
        let ids: Vec<_> = results.iter().map(|r| r.document_id.as_str()).collect();
        assert_eq!(ids, vec!["1", "2"]);
    }

    #[tokio::test]
    async fn test_other_collection_and_no_overlap_empty() {
        let r = retriever();
        assert!(r.search("faces", "beach", SortType::Unsorted).await.unwrap().is_empty());
        assert!(r.search("embeddings", "spaceship", SortType::Unsorted).await.unwrap().is_empty());
    }

    #[test]
    fn test_load_from_file() {
        let path = std::env::temp_dir().join(format!("picforge-docs-{}.json", uuid::Uuid::new_v4()));
        std::fs::write(
            &path,
            r#"[{"collection":"embeddings","id":"a","text":"File: a.jpg\nA dog.","created_at":"2022-03-01T00:00:00Z"}]"#,
        )
        .unwrap();

        let retriever = InMemoryRetriever::from_file(path.to_str().unwrap(), 5).unwrap();
        assert_eq!(retriever.len(), 1);
        std::fs::remove_file(path).ok();
    }

    #[test]
    fn test_missing_file_is_configuration_error() {
        let err = InMemoryRetriever::from_file("/nonexistent/docs.json", 5).err().unwrap();
        assert!(matches!(err, AppError::Configuration { .. }));
    }
}
