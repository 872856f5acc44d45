//! Travel search through the Tavily API
//!
//! Results are flattened into a plain text block for the model to read.

use crate::config::is_usable_key;
use crate::error::{ErrorKind, ServiceError};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;

/// One search result
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchHit {
    pub url: String,
    #[serde(default)]
    pub content: String,
}

#[async_trait]
pub trait SearchProvider: Send + Sync {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct TavilyResponse {
    results: Vec<SearchHit>,
}

/// Tavily search client using basic search depth
pub struct TavilyClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

impl TavilyClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Result<Self, reqwest::Error> {
        let client = Client::builder().timeout(Duration::from_secs(30)).build()?;
        Ok(Self {
            client,
            api_key: api_key.filter(|k| is_usable_key(k)),
            base_url: base_url.into(),
        })
    }
}

#[async_trait]
impl SearchProvider for TavilyClient {
    async fn search(&self, query: &str) -> Result<Vec<SearchHit>, ServiceError> {
        let Some(api_key) = self.api_key.as_deref() else {
            return Err(ServiceError::config("Tavily API Key is not configured."));
        };

        let body = json!({
            "api_key": api_key,
            "query": query,
            "search_depth": "basic",
        });
        let response = self
            .client
            .post(&self.base_url)
            .json(&body)
            .send()
            .await
            .map_err(|e| ServiceError::network(format!("Network error: {e}")))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(ServiceError::provider(format!(
                "Tavily Search API error ({status}): {body}"
            )));
        }

        let data: TavilyResponse = response
            .json()
            .await
            .map_err(|e| ServiceError::parse(format!("Unexpected search response: {e}")))?;

        tracing::info!(query = %query, results = data.results.len(), "Travel search completed");
        Ok(data.results)
    }
}

/// Flatten hits into `Source:`/`Content:` lines
pub fn format_hits(hits: &[SearchHit]) -> String {
    hits.iter()
        .map(|hit| format!("Source: {}\nContent: {}", hit.url, hit.content))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Search and flatten. Both arms hold the text the model reads; a failure
/// carries a description of the error instead of hits.
pub async fn search_travel(provider: &dyn SearchProvider, query: &str) -> Result<String, String> {
    match provider.search(query).await {
        Ok(hits) => Ok(format_hits(&hits)),
        Err(e) if e.kind == ErrorKind::Config => Err(format!("Error: {}", e.message)),
        Err(e) => {
            tracing::warn!(query = %query, kind = e.kind.as_str(), error = %e, "Travel search failed");
            Err(format!("Error during Tavily search: {}", e.message))
        }
    }
}
