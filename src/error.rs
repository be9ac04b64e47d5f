//! Crate-level error type
//!
//! Component errors (`SearchError`, `CompletionError`, `TokenizerError`,
//! `ConfigError`) live next to the code that raises them and are folded into
//! [`RelayError`] at the query handler boundary.

use thiserror::Error;

use crate::completion::CompletionError;
use crate::config::ConfigError;
use crate::context::TokenizerError;
use crate::search::SearchError;

/// Errors surfaced by the relay
#[derive(Debug, Error)]
pub enum RelayError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Search failed: {0}")]
    Search(#[from] SearchError),

    #[error("Completion failed: {0}")]
    Completion(#[from] CompletionError),

    #[error("Tokenizer error: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl RelayError {
    /// Pipeline stage the error originated from, used as a log and metric label
    pub fn stage(&self) -> &'static str {
        match self {
            Self::InvalidInput(_) => "input",
            Self::Search(_) => "search",
            Self::Completion(_) => "completion",
            Self::Tokenizer(_) => "tokenizer",
            Self::Config(_) => "config",
            Self::Internal(_) => "internal",
        }
    }
}

/// Result alias used across the crate
pub type Result<T> = std::result::Result<T, RelayError>;

/// Keep upstream error bodies short enough to embed in log lines and API errors
pub(crate) fn snippet(body: &str) -> String {
    const MAX_CHARS: usize = 512;
    let mut chars = body.chars();
    let head: String = chars.by_ref().take(MAX_CHARS).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
