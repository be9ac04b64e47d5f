//! Prompt construction
//!
//! Every completion request carries exactly three messages, in this order:
//! the system instruction, the user's question, then the retrieved context as
//! a second system message.

use serde::{Deserialize, Serialize};

/// Organization the assistant answers for when none is configured
pub const DEFAULT_ORGANIZATION: &str = "Erasmus Hogeschool Brussel";

/// Chat message role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// Chat message
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            content: content.into(),
        }
    }
}

/// The fixed `[instruction, query, context]` exchange
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PromptMessages([ChatMessage; 3]);

impl PromptMessages {
    pub fn new(system_instruction: &str, user_query: &str, context: &str) -> Self {
        Self([
            ChatMessage::system(system_instruction),
            ChatMessage::user(user_query),
            ChatMessage::system(context),
        ])
    }

    pub fn as_slice(&self) -> &[ChatMessage] {
        &self.0
    }

    pub fn instruction(&self) -> &ChatMessage {
        &self.0[0]
    }

    pub fn query(&self) -> &ChatMessage {
        &self.0[1]
    }

    pub fn context(&self) -> &ChatMessage {
        &self.0[2]
    }
}

/// System instruction restricting answers to one organization
pub fn system_instruction(organization: &str) -> String {
    format!(
        "You are an assistant that only responds to questions related to the {org}, \
         and you only use the data that is given to you. Whenever you receive questions \
         unrelated to the {org}, ignore the content of the question and say that you are \
         a chatbot for {org} and can only assist with questions relating to the {org}.",
        org = organization
    )
}
