//! Request and response bodies for the HTTP API

use serde::{Deserialize, Serialize};

/// Body of `POST /query`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryRequest {
    /// Absent or `null` is rejected by the handler
    #[serde(default)]
    pub query: Option<String>,
}

/// Successful `POST /query` response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryResponse {
    pub response: String,
}

/// Health check response
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

/// Error body returned by `POST /query` for rejected input and pipeline failures
///
/// A body over the size limit that declares its length is refused by the limit
/// layer before routing and gets a plain 413 without this body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiError {
    pub code: String,
    pub message: String,
}

impl ApiError {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code: code.into(),
            message: message.into(),
        }
    }
}

/// Machine-readable error codes
pub mod error_codes {
    pub const VALIDATION_ERROR: &str = "VALIDATION_ERROR";
    pub const PAYLOAD_TOO_LARGE: &str = "PAYLOAD_TOO_LARGE";
    pub const SEARCH_UPSTREAM_ERROR: &str = "SEARCH_UPSTREAM_ERROR";
    pub const COMPLETION_UPSTREAM_ERROR: &str = "COMPLETION_UPSTREAM_ERROR";
    pub const TIMEOUT: &str = "TIMEOUT";
    pub const INTERNAL_ERROR: &str = "INTERNAL_ERROR";
}
