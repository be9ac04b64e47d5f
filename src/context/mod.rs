//! Context assembly under a model token budget
//!
//! Retrieved documents are joined and, when necessary, truncated so that the
//! user query, the retrieved context and a fixed safety margin fit into the
//! model's input window.

pub mod budget;
pub mod budgeter;
pub mod token_counter;

pub use budget::{
    Budget, BudgetConfig, BudgetError, DEFAULT_MAX_TOTAL_TOKENS, DEFAULT_SAFETY_MARGIN,
};
pub use budgeter::{AssembledContext, ContextBudgeter};
pub use token_counter::{TiktokenCounter, TokenCounter, TokenizerError, WordCounter, ENCODING_NAME};
