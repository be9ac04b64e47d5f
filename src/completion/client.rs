//! Azure OpenAI chat-completion client
//!
//! Non-streaming, single attempt. Sends the three-message prompt to a fixed
//! deployment and returns the first choice's content verbatim:
//!
//! ```text
//! POST {endpoint}/openai/deployments/{deployment}/chat/completions?api-version={api_version}
//! api-key: <key>
//! ```

use super::prompt::PromptMessages;
use crate::config::{CompletionConfig, ConfigError, PromptConfig};
use crate::error::snippet;
use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::time::Instant;
use tracing::{debug, error, info};

/// Completion errors
#[derive(Debug, thiserror::Error)]
pub enum CompletionError {
    #[error("Request failed: {0}")]
    Request(String),

    #[error("Timeout: {0}")]
    Timeout(String),

    #[error("Upstream returned status {status}: {body}")]
    Upstream { status: u16, body: String },

    #[error("Invalid response: {0}")]
    InvalidResponse(String),
}

impl CompletionError {
    fn from_transport(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout(e.to_string())
        } else {
            Self::Request(e.to_string())
        }
    }
}

/// Chat completion over retrieved context
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Answer `user_query` from `context`
    async fn complete(&self, context: &str, user_query: &str) -> Result<String, CompletionError>;
}

/// Client for one Azure OpenAI chat deployment
pub struct AzureOpenAiClient {
    http: Client,
    chat_url: String,
    api_key: SecretString,
    system_instruction: String,
}

impl AzureOpenAiClient {
    /// Create a client from configuration; fails if a required value is missing
    pub fn new(config: &CompletionConfig, prompt: &PromptConfig) -> Result<Self, ConfigError> {
        let chat_url = config.chat_url()?;
        let api_key = config
            .api_key
            .clone()
            .ok_or(ConfigError::Missing("AZURE_OPENAI_KEY"))?;

        let http = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| ConfigError::Invalid(format!("completion HTTP client: {}", e)))?;

        info!(
            deployment = %config.deployment,
            timeout_secs = config.timeout_secs,
            "Completion client initialized"
        );

        Ok(Self {
            http,
            chat_url,
            api_key,
            system_instruction: prompt.instruction(),
        })
    }

    pub fn system_instruction(&self) -> &str {
        &self.system_instruction
    }
}

#[async_trait]
impl CompletionClient for AzureOpenAiClient {
    async fn complete(&self, context: &str, user_query: &str) -> Result<String, CompletionError> {
        let start = Instant::now();
        let request = ChatCompletionRequest {
            messages: PromptMessages::new(&self.system_instruction, user_query, context),
        };

        let response = self
            .http
            .post(&self.chat_url)
            .header("api-key", self.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(CompletionError::from_transport)?;

        let status = response.status();
        if !status.is_success() {
            let body = response
                .text()
                .await
                .unwrap_or_else(|_| "Unknown error".to_string());
            error!(status = status.as_u16(), "Completion endpoint returned an error");
            return Err(CompletionError::Upstream {
                status: status.as_u16(),
                body: snippet(&body),
            });
        }

        let completion: ChatCompletionResponse = response
            .json()
            .await
            .map_err(|e| CompletionError::InvalidResponse(e.to_string()))?;

        let choice = completion
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| CompletionError::InvalidResponse("No choices in response".to_string()))?;

        debug!(
            elapsed_ms = start.elapsed().as_millis() as u64,
            finish_reason = choice.finish_reason.as_deref().unwrap_or("unknown"),
            "Completion received"
        );

        Ok(choice.message.content.unwrap_or_default())
    }
}

// Azure OpenAI API types
#[derive(Debug, Serialize)]
struct ChatCompletionRequest {
    messages: PromptMessages,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ResponseMessage,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}
