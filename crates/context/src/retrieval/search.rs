//! Search index retriever (Azure AI Search REST API)

use super::Retriever;
use async_trait::async_trait;
use picforge_common::config::RetrievalConfig;
use picforge_common::{AppError, MemoryQueryResult, Result, SortType};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Queries one index per collection over HTTP
pub struct SearchIndexRetriever {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    api_version: String,
    top_k: usize,
    id_field: String,
    text_field: String,
    date_field: String,
}

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    search: &'a str,
    top: usize,
    select: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    orderby: Option<String>,
}

#[derive(Deserialize)]
struct SearchResponse {
    value: Vec<Map<String, Value>>,
}

impl SearchIndexRetriever {
    pub fn new(config: &RetrievalConfig) -> Result<Self> {
        let endpoint = config.endpoint.clone().ok_or_else(|| AppError::Configuration {
            message: "retrieval.endpoint is required for the search provider".to_string(),
        })?;
        let api_key = config.api_key.clone().ok_or_else(|| AppError::Configuration {
            message: "retrieval.api_key is required for the search provider".to_string(),
        })?;

        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(5))
            .build()
            .map_err(|e| AppError::Internal {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            api_key,
            api_version: config.api_version.clone(),
            top_k: config.top_k,
            id_field: config.id_field.clone(),
            text_field: config.text_field.clone(),
            date_field: config.date_field.clone(),
        })
    }

    fn url(&self, collection: &str) -> String {
        format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.endpoint, collection, self.api_version
        )
    }

    fn request<'a>(&self, query: &'a str, sort: SortType) -> SearchRequest<'a> {
        let orderby = match sort {
            SortType::NewestFirst => Some(format!("{} desc", self.date_field)),
            SortType::OldestFirst => Some(format!("{} asc", self.date_field)),
            SortType::Unsorted | SortType::Relevance => None,
        };

        SearchRequest {
            search: query,
            top: self.top_k,
            select: format!("{},{}", self.id_field, self.text_field),
            orderby,
        }
    }

    /// Convert one hit; hits without text are dropped
    fn to_result(&self, collection: &str, hit: &Map<String, Value>) -> Option<MemoryQueryResult> {
        let text = hit.get(&self.text_field)?.as_str()?;
        let id = match hit.get(&self.id_field)? {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let score = hit.get("@search.score").and_then(Value::as_f64).unwrap_or(0.0);

        Some(MemoryQueryResult::new(collection, id, text, score))
    }
}

#[async_trait]
impl Retriever for SearchIndexRetriever {
    async fn search(
        &self,
        collection: &str,
        query: &str,
        sort: SortType,
    ) -> Result<Vec<MemoryQueryResult>> {
        let retrieval_error = |message: String| AppError::Retrieval {
            collection: collection.to_string(),
            message,
        };

        let response = self
            .client
            .post(self.url(collection))
            .header("api-key", &self.api_key)
            .json(&self.request(query, sort))
            .send()
            .await
            .map_err(|e| retrieval_error(format!("Request failed: {}", e)))?;

        if !response.status().is_success() {
            let status = response.status();
            return Err(retrieval_error(format!("Search API error {}", status)));
        }

        let body: SearchResponse = response
            .json()
            .await
            .map_err(|e| retrieval_error(format!("Failed to parse response: {}", e)))?;

        Ok(body
            .value
            .iter()
            .filter_map(|hit| self.to_result(collection, hit))
            .collect())
    }
}
