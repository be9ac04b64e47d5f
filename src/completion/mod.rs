//! Answer generation with a hosted chat model

pub mod client;
pub mod prompt;

pub use client::{AzureOpenAiClient, CompletionClient, CompletionError};
pub use prompt::{system_instruction, ChatMessage, PromptMessages, Role, DEFAULT_ORGANIZATION};
