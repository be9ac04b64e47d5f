//! Azure Cognitive Search client
//!
//! Issues one full-text query per request against a fixed index:
//!
//! ```text
//! POST {endpoint}/indexes/{index}/docs/search?api-version={api_version}
//! api-key: <key>
//! {"search": "<query>", "queryType": "full"}
//! ```

use super::models::{SearchRequest, SearchResult};
use crate::config::{ConfigError, SearchConfig};
use crate::error::snippet;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use std::time::Instant;
use tracing::{debug, error};

/// Search errors
#[derive(Debug, thiserror::Error)]
pub enum SearchError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl SearchError {
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Full-text search over the document index
#[async_trait]
pub trait SearchClient: Send + Sync {
    /// Documents relevant to `query`, in index ranking order
    async fn search(&self, query: &str) -> Result<SearchResult, SearchError>;
}

/// Search client for an Azure Cognitive Search index
pub struct AzureSearchClient {
    http: Client,
    search_url: String,
    api_key: SecretString,
}

impl AzureSearchClient {
    /// Create a client from configuration; fails if a required value is missing
    pub fn new(config: &SearchConfig) -> Result<Self, ConfigError> {
        let search_url = config.search_url()?;
        let api_key = config
            .api_key
            .clone()
            .ok_or(ConfigError::Missing("SEARCH_API_KEY"))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("search HTTP client: {}", e)))?;

        debug!(url = %search_url, "Search client initialized");

        Ok(Self {
            http,
            search_url,
            api_key,
        })
    }
}

#[async_trait]
impl SearchClient for AzureSearchClient {
    async fn search(&self, query: &str) -> Result<SearchResult, SearchError> {
        let start = Instant::now();

        let response = self
            .http
            .post(&self.search_url)
            .header("api-key", self.api_key.expose_secret())
            .json(&SearchRequest::full(query))
            .send()
            .await
            .map_err(SearchError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = status.as_u16(), "Search index returned an error");
            return Err(SearchError::Upstream {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let result: SearchResult = response
            .json()
            .await
            .map_err(|e| SearchError::InvalidResponse(e.to_string()))?;

        debug!(
            documents = result.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Search completed"
        );

        Ok(result)
    }
}
