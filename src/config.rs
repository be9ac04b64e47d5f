//! Service configuration
//!
//! Sources, lowest precedence first:
//! 1. built-in defaults
//! 2. optional TOML file (`relay.toml`, or the path in `RELAY_CONFIG`)
//! 3. `RELAY__<SECTION>__<KEY>` environment variables
//! 4. the flat variable names of the original deployment
//!    (`SEARCH_SERVICE_NAME`, `AZURE_OPENAI_KEY`, ...)

use crate::completion::prompt::{system_instruction, DEFAULT_ORGANIZATION};
use crate::context::BudgetConfig;
use secrecy::SecretString;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Config file looked up when `RELAY_CONFIG` is unset (extension optional)
pub const DEFAULT_CONFIG_FILE: &str = "relay";

/// Search API version the index was provisioned with
pub const DEFAULT_SEARCH_API_VERSION: &str = "2021-04-30-Preview";

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Missing required configuration value: {0}")]
    Missing(&'static str),

    #[error("Missing required configuration values: {}", .0.join(", "))]
    MissingValues(Vec<&'static str>),

    #[error("Invalid configuration: {0}")]
    Invalid(String),

    #[error("Failed to load configuration: {0}")]
    Load(#[from] ::config::ConfigError),
}

/// Top-level configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub search: SearchConfig,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub budget: BudgetConfig,
    #[serde(default)]
    pub prompt: PromptConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Config {
    /// Load from file and environment
    pub fn load() -> Result<Self, ConfigError> {
        let path =
            std::env::var("RELAY_CONFIG").unwrap_or_else(|_| DEFAULT_CONFIG_FILE.to_string());

        let settings = ::config::Config::builder()
            .add_source(::config::File::with_name(&path).required(false))
            .add_source(::config::Environment::with_prefix("RELAY").separator("__"))
            .build()?;

        let config: Config = settings.try_deserialize()?;
        Ok(config.with_env_overrides())
    }

    /// Parse a TOML document, without consulting the environment
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = ::config::Config::builder()
            .add_source(::config::File::from_str(toml, ::config::FileFormat::Toml))
            .build()?;
        Ok(settings.try_deserialize()?)
    }

    /// Apply the flat environment variable names used by existing deployments
    pub fn with_env_overrides(mut self) -> Self {
        self.search = self.search.with_env_overrides();
        self.completion = self.completion.with_env_overrides();
        self
    }

    /// Check every required value, reporting all missing ones at once
    pub fn validate(&self) -> Result<(), ConfigError> {
        let mut missing = Vec::new();

        if self.search.endpoint.is_none() && self.search.service_name.is_none() {
            missing.push("SEARCH_SERVICE_NAME");
        }
        if self.search.index_name.is_none() {
            missing.push("SEARCH_INDEX_NAME");
        }
        if self.search.api_key.is_none() {
            missing.push("SEARCH_API_KEY");
        }
        if self.completion.endpoint.is_none() {
            missing.push("AZURE_OPENAI_ENDPOINT");
        }
        if self.completion.api_version.is_none() {
            missing.push("AZURE_OPENAI_API_VERSION");
        }
        if self.completion.api_key.is_none() {
            missing.push("AZURE_OPENAI_KEY");
        }

        if !missing.is_empty() {
            return Err(ConfigError::MissingValues(missing));
        }

        self.budget
            .validate()
            .map_err(|e| ConfigError::Invalid(e.to_string()))
    }
}

/// HTTP listener configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    /// Maximum accepted request body
    #[serde(default = "default_max_body_bytes")]
    pub max_body_bytes: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    5000
}

fn default_max_body_bytes() -> usize {
    64 * 1024
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Azure Cognitive Search configuration
#[derive(Debug, Clone, Deserialize)]
pub struct SearchConfig {
    /// Search service name, used to derive the endpoint
    #[serde(default)]
    pub service_name: Option<String>,

    #[serde(default)]
    pub index_name: Option<String>,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    /// Full endpoint URL, overrides the one derived from `service_name`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default = "default_search_api_version")]
    pub api_version: String,

    #[serde(default = "default_search_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_search_api_version() -> String {
    DEFAULT_SEARCH_API_VERSION.to_string()
}

fn default_search_timeout_secs() -> u64 {
    30
}

impl Default for SearchConfig {
    fn default() -> Self {
        Self {
            service_name: None,
            index_name: None,
            api_key: None,
            endpoint: None,
            api_version: default_search_api_version(),
            timeout_secs: default_search_timeout_secs(),
        }
    }
}

impl SearchConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("SEARCH_SERVICE_NAME") {
            self.service_name = Some(val);
        }

        if let Ok(val) = std::env::var("SEARCH_INDEX_NAME") {
            self.index_name = Some(val);
        }

        if let Ok(val) = std::env::var("SEARCH_API_KEY") {
            self.api_key = Some(SecretString::new(val));
        }

        if let Ok(val) = std::env::var("SEARCH_ENDPOINT") {
            self.endpoint = Some(val);
        }

        self
    }

    /// Service endpoint, explicit or derived from the service name
    pub fn base_url(&self) -> Result<String, ConfigError> {
        match (&self.endpoint, &self.service_name) {
            (Some(endpoint), _) => Ok(endpoint.trim_end_matches('/').to_string()),
            (None, Some(service)) => Ok(format!("https://{}.search.windows.net", service)),
            (None, None) => Err(ConfigError::Missing("SEARCH_SERVICE_NAME")),
        }
    }

    /// Document search URL for the configured index
    pub fn search_url(&self) -> Result<String, ConfigError> {
        let index = self
            .index_name
            .as_deref()
            .ok_or(ConfigError::Missing("SEARCH_INDEX_NAME"))?;
        Ok(format!(
            "{}/indexes/{}/docs/search?api-version={}",
            self.base_url()?,
            index,
            self.api_version
        ))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Azure OpenAI configuration
#[derive(Debug, Clone, Deserialize)]
pub struct CompletionConfig {
    /// Resource endpoint, e.g. `https://<resource>.openai.azure.com`
    #[serde(default)]
    pub endpoint: Option<String>,

    #[serde(default)]
    pub api_version: Option<String>,

    #[serde(default)]
    pub api_key: Option<SecretString>,

    #[serde(default = "default_deployment")]
    pub deployment: String,

    #[serde(default = "default_completion_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_deployment() -> String {
    "gpt-35-turbo".to_string()
}

fn default_completion_timeout_secs() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_version: None,
            api_key: None,
            deployment: default_deployment(),
            timeout_secs: default_completion_timeout_secs(),
        }
    }
}

impl CompletionConfig {
    pub fn with_env_overrides(mut self) -> Self {
        if let Ok(val) = std::env::var("AZURE_OPENAI_ENDPOINT") {
            self.endpoint = Some(val);
        }

        // Older deployments put the API version in AZURE_OPENAI_MODEL.
        if let Ok(val) = std::env::var("AZURE_OPENAI_MODEL") {
            self.api_version = Some(val);
        }

        if let Ok(val) = std::env::var("AZURE_OPENAI_API_VERSION") {
            self.api_version = Some(val);
        }

        if let Ok(val) = std::env::var("AZURE_OPENAI_KEY") {
            self.api_key = Some(SecretString::new(val));
        }

        if let Ok(val) = std::env::var("AZURE_OPENAI_DEPLOYMENT") {
            self.deployment = val;
        }

        self
    }

    /// Chat completions URL for the configured deployment
    pub fn chat_url(&self) -> Result<String, ConfigError> {
        let endpoint = self
            .endpoint
            .as_deref()
            .ok_or(ConfigError::Missing("AZURE_OPENAI_ENDPOINT"))?;
        let api_version = self
            .api_version
            .as_deref()
            .ok_or(ConfigError::Missing("AZURE_OPENAI_API_VERSION"))?;
        Ok(format!(
            "{}/openai/deployments/{}/chat/completions?api-version={}",
            endpoint.trim_end_matches('/'),
            self.deployment,
            api_version
        ))
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// System prompt configuration
#[derive(Debug, Clone, Deserialize)]
pub struct PromptConfig {
    #[serde(default = "default_organization")]
    pub organization: String,

    /// Full instruction text, replacing the generated one
    #[serde(default)]
    pub system_instruction: Option<String>,
}

fn default_organization() -> String {
    DEFAULT_ORGANIZATION.to_string()
}

impl Default for PromptConfig {
    fn default() -> Self {
        Self {
            organization: default_organization(),
            system_instruction: None,
        }
    }
}

impl PromptConfig {
    pub fn instruction(&self) -> String {
        self.system_instruction
            .clone()
            .unwrap_or_else(|| system_instruction(&self.organization))
    }
}

/// Log output format
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Pretty,
    Json,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    /// Filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default)]
    pub format: LogFormat,
}

fn default_log_level() -> String {
    "info,query_relay=info".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: LogFormat::default(),
        }
    }
}
