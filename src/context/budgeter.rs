//! Context budgeter: fit retrieved documents into the model input budget
//!
//! Documents are joined in ranking order, so truncation always keeps the
//! most relevant text. When the joined text is over budget it is cut word by
//! word, each word tokenized on its own and the counts summed. That per-word
//! sum is the accounting the deployed prompts were tuned against and is kept
//! as is, even where it differs slightly from tokenizing the truncated string
//! in one pass.

use super::budget::{Budget, BudgetConfig, BudgetError};
use super::token_counter::{split_words, TokenCounter};
use crate::search::Document;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, warn};

/// Outcome of fitting documents into the budget
#[derive(Debug, Clone, Serialize)]
pub struct AssembledContext {
    /// Context text handed to the model
    pub text: String,
    pub budget: Budget,
    /// Token count of the untruncated context
    pub context_tokens: usize,
    pub truncated: bool,
}

/// Builds the context string for a single query
pub struct ContextBudgeter {
    counter: Arc<dyn TokenCounter>,
    config: BudgetConfig,
}

impl ContextBudgeter {
    /// Create a budgeter sharing the process-wide token counter
    pub fn new(counter: Arc<dyn TokenCounter>, config: BudgetConfig) -> Result<Self, BudgetError> {
        config.validate()?;
        Ok(Self { counter, config })
    }

    pub fn config(&self) -> &BudgetConfig {
        &self.config
    }

    /// Context text for `documents` within `total_max_tokens`
    pub fn build_context(
        &self,
        documents: &[Document],
        user_query: &str,
        total_max_tokens: usize,
    ) -> String {
        self.assemble(documents, user_query, total_max_tokens).text
    }

    /// Context text within the configured default budget
    pub fn build_default_context(
        &self,
        documents: &[Document],
        user_query: &str,
    ) -> AssembledContext {
        self.assemble(documents, user_query, self.config.max_total_tokens)
    }

    /// Fit `documents` into `total_max_tokens`, reporting how the budget was spent
    pub fn assemble(
        &self,
        documents: &[Document],
        user_query: &str,
        total_max_tokens: usize,
    ) -> AssembledContext {
        let raw_context = documents
            .iter()
            .map(|doc| doc.content.as_str())
            .collect::<Vec<_>>()
            .join("\n");

        let query_tokens = self.counter.count_tokens(user_query);
        let budget = Budget::new(total_max_tokens, query_tokens, self.config.safety_margin);
        let context_tokens = self.counter.count_tokens(&raw_context);

        debug!(
            documents = documents.len(),
            query_tokens,
            context_tokens,
            available = budget.available_for_context,
            "Context budget computed"
        );

        if budget.fits(context_tokens) {
            return AssembledContext {
                text: raw_context,
                budget,
                context_tokens,
                truncated: false,
            };
        }

        let text = self.truncate_words(&raw_context, budget.available_for_context);
        warn!(
            context_tokens,
            available = budget.available_for_context,
            kept_chars = text.len(),
            total_chars = raw_context.len(),
            "Retrieved context exceeds budget, truncating"
        );

        AssembledContext {
            text,
            budget,
            context_tokens,
            truncated: true,
        }
    }

    /// Keep whole words while the summed per-word token count stays within `available`
    fn truncate_words(&self, raw_context: &str, available: i64) -> String {
        let mut truncated = String::new();
        let mut running: i64 = 0;

        for word in split_words(raw_context) {
            running = running.saturating_add(self.counter.count_tokens(word) as i64);
            if running > available {
                break;
            }
            truncated.push_str(word);
            truncated.push(' ');
        }

        truncated.trim_end().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::token_counter::{TiktokenCounter, WordCounter};

    fn word_budgeter() -> ContextBudgeter {
        ContextBudgeter::new(Arc::new(WordCounter::default()), BudgetConfig::default()).unwrap()
    }

    fn docs() -> Vec<Document> {
        vec![Document::new("A B C"), Document::new("D E")]
    }

    #[test]
    fn test_large_budget_keeps_everything() {
        let budgeter = word_budgeter();
        assert_eq!(budgeter.build_context(&docs(), "Q", 8192), "A B C\nD E");
    }

    #[test]
    fn test_exact_budget_drops_second_document() {
        let budgeter = word_budgeter();
        // 1 query token + 200 margin + 3 context tokens
        let assembled = budgeter.assemble(&docs(), "Q", 204);
        assert_eq!(assembled.budget.available_for_context, 3);
        assert!(assembled.truncated);
        assert_eq!(assembled.context_tokens, 5);
        assert_eq!(assembled.text, "A B C");
    }

    #[test]
    fn test_zero_allowance_gives_empty_context() {
        let budgeter = word_budgeter();
        let assembled = budgeter.assemble(&docs(), "Q", 201);
        assert_eq!(assembled.budget.available_for_context, 0);
        assert_eq!(assembled.text, "");
    }

    #[test]
    fn test_negative_allowance_gives_empty_context() {
        let budgeter = word_budgeter();
        let query = "word ".repeat(500);
        let assembled = budgeter.assemble(&docs(), &query, 100);
        assert!(assembled.budget.available_for_context < 0);
        assert_eq!(assembled.text, "");
    }

    #[test]
    fn test_no_documents_gives_empty_context() {
        let budgeter = word_budgeter();
        assert_eq!(budgeter.build_context(&[], "Q", 8192), "");
        assert_eq!(budgeter.build_context(&[], "Q", 0), "");
    }

    #[test]
    fn test_truncation_collapses_inner_whitespace() {
        let budgeter = word_budgeter();
        let documents = vec![Document::new("alpha\tbeta\n\ngamma  delta")];
        // allowance of 3 keeps three words joined by single spaces
        assert_eq!(budgeter.build_context(&documents, "Q", 204), "alpha beta gamma");
    }

    #[test]
    fn test_truncation_splits_on_information_separators() {
        let budgeter = word_budgeter();
        let documents = vec![Document::new("A\u{1c}B C D")];
        // allowance of 2: 203 - 1 - 200
        assert_eq!(budgeter.build_context(&documents, "Q", 203), "A B");
    }

    #[test]
    fn test_default_budget_uses_config() {
        let budgeter = word_budgeter();
        let assembled = budgeter.build_default_context(&docs(), "Q");
        assert_eq!(assembled.budget.total_max_tokens, 8192);
        assert_eq!(assembled.budget.available_for_context, 8192 - 1 - 200);
        assert!(!assembled.truncated);
    }

    #[test]
    fn test_tiktoken_truncation_stays_within_allowance() {
        let counter = Arc::new(TiktokenCounter::new().unwrap());
        let budgeter = ContextBudgeter::new(counter.clone(), BudgetConfig::default()).unwrap();
        let documents = vec![Document::new(
            "Erasmus Hogeschool Brussel offers bachelor programmes in applied computer science. "
                .repeat(200),
        )];
        let query = "Which programmes are offered?";
        let assembled = budgeter.assemble(&documents, query, 600);

        assert!(assembled.truncated);
        let per_word_sum: usize = assembled
            .text
            .split_whitespace()
            .map(|w| counter.count_tokens(w))
            .sum();
        assert!(per_word_sum as i64 <= assembled.budget.available_for_context);
        assert!(documents[0].content.starts_with(&assembled.text));
    }
}
