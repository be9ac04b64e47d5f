//! Token counting using tiktoken

use std::sync::Arc;
use thiserror::Error;
use tiktoken_rs::{cl100k_base, CoreBPE};

/// Name of the encoding every budget in the process is computed with
pub const ENCODING_NAME: &str = "cl100k_base";

/// Tokenizer errors
#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("Failed to load {encoding} encoding: {message}")]
    Init { encoding: &'static str, message: String },
}

/// Token counter trait for different tokenization strategies
pub trait TokenCounter: Send + Sync {
    /// Count the model tokens in the given text
    fn count_tokens(&self, text: &str) -> usize;
}

/// Tiktoken-based counter using cl100k_base (GPT-4, GPT-3.5-turbo)
///
/// Build one per process and share it; cloning shares the loaded encoding.
#[derive(Clone)]
pub struct TiktokenCounter {
    bpe: Arc<CoreBPE>,
}

impl TiktokenCounter {
    /// Load the cl100k_base encoding
    pub fn new() -> Result<Self, TokenizerError> {
        let bpe = cl100k_base().map_err(|e| TokenizerError::Init {
            encoding: ENCODING_NAME,
            message: e.to_string(),
        })?;
        Ok(Self { bpe: Arc::new(bpe) })
    }
}

impl TokenCounter for TiktokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        // Special-token markers inside retrieved documents count as plain text.
        self.bpe.encode_ordinary(text).len()
    }
}

/// Split `text` into words on Unicode whitespace and the ASCII information
/// separators `\x1c`..=`\x1f`, dropping empty pieces
pub(crate) fn split_words(text: &str) -> impl Iterator<Item = &str> {
    text.split(is_word_separator).filter(|word| !word.is_empty())
}

fn is_word_separator(c: char) -> bool {
    c.is_whitespace() || ('\x1c'..='\x1f').contains(&c)
}

/// Word-based counter: `ceil(words * tokens_per_word)`
pub struct WordCounter {
    tokens_per_word: f64,
}

impl WordCounter {
    pub fn new(tokens_per_word: f64) -> Self {
        Self { tokens_per_word }
    }
}

impl Default for WordCounter {
    /// One token per whitespace-delimited word
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl TokenCounter for WordCounter {
    fn count_tokens(&self, text: &str) -> usize {
        let word_count = split_words(text).count();
        (word_count as f64 * self.tokens_per_word).ceil() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tiktoken_counter() {
        let counter = TiktokenCounter::new().unwrap();
        let text = "Hello, world! This is a test.";
        let tokens = counter.count_tokens(text);
        assert!(tokens > 0);
        assert!(tokens < 20);
        assert_eq!(counter.count_tokens(""), 0);
    }

    #[test]
    fn test_tiktoken_counts_special_markers_as_text() {
        let counter = TiktokenCounter::new().unwrap();
        assert!(counter.count_tokens("<|endoftext|>") > 1);
    }

    #[test]
    fn test_clones_share_encoding() {
        let counter = TiktokenCounter::new().unwrap();
        let clone = counter.clone();
        assert!(Arc::ptr_eq(&counter.bpe, &clone.bpe));
        assert_eq!(
            counter.count_tokens("Erasmus Hogeschool Brussel"),
            clone.count_tokens("Erasmus Hogeschool Brussel")
        );
    }

    #[test]
    fn test_word_counter() {
        let counter = WordCounter::default();
        assert_eq!(counter.count_tokens("A B C"), 3);
        assert_eq!(counter.count_tokens("A B C\nD E"), 5);
        assert_eq!(counter.count_tokens("   "), 0);

        let weighted = WordCounter::new(1.3);
        assert_eq!(weighted.count_tokens("Hello world test"), 4);
    }

    #[test]
    fn test_information_separators_split_words() {
        let words: Vec<&str> = split_words("A\u{1c}B\u{1f}C \u{1d}\u{1e} D").collect();
        assert_eq!(words, vec!["A", "B", "C", "D"]);
        assert_eq!(WordCounter::default().count_tokens("A\u{1c}B"), 2);
    }
}
