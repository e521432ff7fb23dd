//! Retrieval results, sort classification, and link candidates

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A relevance-ranked snippet returned by a retriever
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MemoryQueryResult {
    /// Collection the snippet came from
    pub collection_id: String,

    /// Document identifier within the collection
    pub document_id: String,

    /// Snippet text
    pub text: String,

    /// Relevance score, higher is better
    pub relevance: f64,
}

impl MemoryQueryResult {
    pub fn new(
        collection_id: impl Into<String>,
        document_id: impl Into<String>,
        text: impl Into<String>,
        relevance: f64,
    ) -> Self {
        Self {
            collection_id: collection_id.into(),
            document_id: document_id.into(),
            text: text.into(),
            relevance,
        }
    }
}

/// Retrieval ordering requested by the user's intent.
///
/// The pipeline forwards it to retrievers without interpreting it.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum SortType {
    /// No preference
    #[default]
    Unsorted,
    /// Best match first
    Relevance,
    /// Most recent pictures first
    NewestFirst,
    /// Oldest pictures first
    OldestFirst,
}

impl SortType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SortType::Unsorted => "unsorted",
            SortType::Relevance => "relevance",
            SortType::NewestFirst => "newest_first",
            SortType::OldestFirst => "oldest_first",
        }
    }
}

impl fmt::Display for SortType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SortType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let label = s
            .trim()
            .trim_matches(|c: char| !c.is_alphanumeric() && c != '_')
            .to_lowercase();

        match label.as_str() {
            "unsorted" | "none" | "default" => Ok(SortType::Unsorted),
            "relevance" | "relevant" | "best" => Ok(SortType::Relevance),
            "newest" | "newest_first" | "latest" | "recent" | "descending" => {
                Ok(SortType::NewestFirst)
            }
            "oldest" | "oldest_first" | "earliest" | "chronological" | "ascending" => {
                Ok(SortType::OldestFirst)
            }
            _ => Err(format!("unknown sort type: {}", s.trim())),
        }
    }
}

/// A filename confirmed present in both retrieved context and model output
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LinkCandidate {
    /// Filename as it appears in the text
    pub raw_token: String,

    /// Link target, e.g. `/images/cat.jpg`
    pub target_path: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sort_type_parsing() {
        assert_eq!("newest".parse::<SortType>().unwrap(), SortType::NewestFirst);
        assert_eq!(" Oldest.".parse::<SortType>().unwrap(), SortType::OldestFirst);
        assert_eq!("NONE".parse::<SortType>().unwrap(), SortType::Unsorted);
        assert_eq!("relevance".parse::<SortType>().unwrap(), SortType::Relevance);
        assert!("sideways".parse::<SortType>().is_err());
    }

    #[test]
    fn test_sort_type_default_is_neutral() {
        assert_eq!(SortType::default(), SortType::Unsorted);
        assert_eq!(SortType::NewestFirst.to_string(), "newest_first");
    }
}
