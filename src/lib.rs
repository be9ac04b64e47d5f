//! Retrieval-backed question answering relay
//!
//! A question posted to `POST /query` is answered in three steps:
//! full-text search against an Azure Cognitive Search index, fitting the
//! retrieved documents into the model's token budget, and a chat completion
//! against an Azure OpenAI deployment restricted to one organization.

pub mod api;
pub mod completion;
pub mod config;
pub mod context;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod search;
pub mod startup;
pub mod telemetry;

pub use error::{RelayError, Result};
pub use handler::QueryHandler;
