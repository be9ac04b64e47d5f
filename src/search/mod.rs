//! Document retrieval from the search index

pub mod client;
pub mod models;

pub use client::{AzureSearchClient, SearchClient, SearchError};
pub use models::{Document, QueryType, SearchRequest, SearchResult};
