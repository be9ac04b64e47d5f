//! Data models for the search index API

use serde::{Deserialize, Serialize};

/// Full-text search request body
#[derive(Debug, Clone, Serialize)]
pub struct SearchRequest<'a> {
    pub search: &'a str,
    #[serde(rename = "queryType")]
    pub query_type: QueryType,
}

impl<'a> SearchRequest<'a> {
    /// Lucene full-syntax query over the raw user text
    pub fn full(search: &'a str) -> Self {
        Self {
            search,
            query_type: QueryType::Full,
        }
    }
}

/// Query parser selection
#[derive(Debug, Clone, Copy, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Full,
}

/// Indexed document; fields other than `content` are ignored
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub content: String,
    #[serde(rename = "@search.score", default, skip_serializing_if = "Option::is_none")]
    pub score: Option<f64>,
}

impl Document {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            score: None,
        }
    }
}

/// Documents in index relevance order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SearchResult {
    #[serde(rename = "value", default)]
    pub documents: Vec<Document>,
}

impl SearchResult {
    pub fn new(documents: Vec<Document>) -> Self {
        Self { documents }
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }
}
