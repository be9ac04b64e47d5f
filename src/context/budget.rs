//! Token budget for the retrieved context
//!
//! The model input is split between the user query, a fixed safety margin
//! and the retrieved context:
//!
//! ```text
//! available_for_context = total_max_tokens - query_tokens - safety_margin
//! ```
//!
//! The result is signed. A query that eats the whole budget leaves a negative
//! allowance, which the budgeter turns into an empty context.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default model input budget (gpt-35-turbo 8k deployments)
pub const DEFAULT_MAX_TOTAL_TOKENS: usize = 8192;

/// Tokens held back to avoid edge-of-limit completion failures
pub const DEFAULT_SAFETY_MARGIN: usize = 200;

/// Token budget configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetConfig {
    #[serde(default = "default_max_total_tokens")]
    pub max_total_tokens: usize,
    #[serde(default = "default_safety_margin")]
    pub safety_margin: usize,
}

fn default_max_total_tokens() -> usize {
    DEFAULT_MAX_TOTAL_TOKENS
}

fn default_safety_margin() -> usize {
    DEFAULT_SAFETY_MARGIN
}

impl Default for BudgetConfig {
    fn default() -> Self {
        Self {
            max_total_tokens: default_max_total_tokens(),
            safety_margin: default_safety_margin(),
        }
    }
}

impl BudgetConfig {
    /// Validate that the margin leaves room for any context at all
    pub fn validate(&self) -> Result<(), BudgetError> {
        if self.safety_margin >= self.max_total_tokens {
            return Err(BudgetError::ConfigurationInvalid {
                safety_margin: self.safety_margin,
                max: self.max_total_tokens,
            });
        }
        Ok(())
    }
}

/// Token budget errors
#[derive(Debug, Error)]
pub enum BudgetError {
    #[error("Configuration invalid: safety margin {safety_margin} leaves no room in {max} tokens")]
    ConfigurationInvalid { safety_margin: usize, max: usize },
}

/// Budget derived for a single request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Budget {
    pub total_max_tokens: i64,
    pub query_tokens: i64,
    pub available_for_context: i64,
}

impl Budget {
    /// Derive the context allowance for one query
    pub fn new(total_max_tokens: usize, query_tokens: usize, safety_margin: usize) -> Self {
        let total_max_tokens = to_signed(total_max_tokens);
        let query_tokens = to_signed(query_tokens);
        let available_for_context = total_max_tokens
            .saturating_sub(query_tokens)
            .saturating_sub(to_signed(safety_margin));

        Self {
            total_max_tokens,
            query_tokens,
            available_for_context,
        }
    }

    /// Whether a context of `tokens` fits without truncation
    pub fn fits(&self, tokens: usize) -> bool {
        to_signed(tokens) <= self.available_for_context
    }

    /// Whether no context can be included at all
    pub fn is_exhausted(&self) -> bool {
        self.available_for_context <= 0
    }
}

fn to_signed(value: usize) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = BudgetConfig::default();
        assert_eq!(config.max_total_tokens, 8192);
        assert_eq!(config.safety_margin, 200);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_margin_larger_than_budget_is_rejected() {
        let config = BudgetConfig {
            max_total_tokens: 100,
            safety_margin: 200,
        };
        assert!(matches!(
            config.validate(),
            Err(BudgetError::ConfigurationInvalid { .. })
        ));
    }

    #[test]
    fn test_available_for_context() {
        let budget = Budget::new(8192, 12, 200);
        assert_eq!(budget.available_for_context, 7980);
        assert!(budget.fits(7980));
        assert!(!budget.fits(7981));
        assert!(!budget.is_exhausted());
    }

    #[test]
    fn test_budget_may_go_negative() {
        let budget = Budget::new(100, 50, 200);
        assert_eq!(budget.available_for_context, -150);
        assert!(budget.is_exhausted());
        assert!(!budget.fits(1));
        assert!(!budget.fits(0));
    }

    #[test]
    fn test_zero_allowance_fits_only_empty_context() {
        let budget = Budget::new(201, 1, 200);
        assert_eq!(budget.available_for_context, 0);
        assert!(budget.fits(0));
        assert!(!budget.fits(1));
    }
}
