//! Configuration management for PDFChat
//!
//! Supports loading configuration from:
//! - Environment variables (prefixed with APP__)
//! - Configuration files (config/default.toml, config/{APP_ENV}.toml, config/local.toml)
//! - Default values

use crate::errors::Result;
use crate::index::Distance;
use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::time::Duration;
use validator::{Validate, ValidationError};

/// Main application configuration
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
pub struct AppConfig {
    /// Retrieval pipeline parameters
    #[serde(default)]
    #[validate(nested)]
    pub rag: RagConfig,

    /// Embedding provider configuration
    #[serde(default)]
    pub embedding: EmbeddingConfig,

    /// Language model provider configuration
    #[serde(default)]
    pub llm: LlmConfig,

    /// Document and conversation persistence
    #[serde(default)]
    pub database: DatabaseConfig,

    /// Observability configuration
    #[serde(default)]
    pub observability: ObservabilityConfig,
}

/// Retrieval-augmented generation parameters
#[derive(Debug, Clone, Deserialize, Serialize, Validate)]
#[validate(schema(function = "validate_overlap"))]
pub struct RagConfig {
    /// Target passage length in characters
    #[serde(default = "default_chunk_size")]
    #[validate(range(min = 1))]
    pub chunk_size: usize,

    /// Characters shared by consecutive passages
    #[serde(default = "default_chunk_overlap")]
    pub chunk_overlap: usize,

    /// Passages retrieved per question
    #[serde(default = "default_top_k")]
    #[validate(range(min = 1))]
    pub top_k: usize,

    /// Embedding model identifier passed to the embedding provider
    #[serde(default = "default_embedding_model_id")]
    pub embedding_model_id: String,

    /// Generation model identifier passed to the language model provider
    #[serde(default = "default_generation_model_id")]
    pub generation_model_id: String,

    /// Similarity metric for the vector index
    #[serde(default)]
    pub distance: Distance,

    /// Rewrite follow-up questions into standalone ones before retrieval
    #[serde(default)]
    pub condense_question: bool,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct EmbeddingConfig {
    /// Embedding provider: hash, openai
    #[serde(default = "default_embedding_provider")]
    pub provider: String,

    /// API key for embedding service (falls back to OPENAI_API_KEY)
    pub api_key: Option<String>,

    /// API base URL (for custom endpoints)
    pub api_base: Option<String>,

    /// Embedding dimension
    #[serde(default = "default_embedding_dimension")]
    pub dimension: usize,

    /// Request timeout in seconds
    #[serde(default = "default_embedding_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries
    #[serde(default = "default_embedding_retries")]
    pub max_retries: u32,

    /// Batch size for embedding requests
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LlmConfig {
    /// Language model provider: openai (any OpenAI-compatible endpoint), extractive
    #[serde(default = "default_llm_provider")]
    pub provider: String,

    /// API key (falls back to GROQ_API_KEY, then OPENAI_API_KEY)
    pub api_key: Option<String>,

    /// API base URL
    #[serde(default = "default_llm_api_base")]
    pub api_base: String,

    /// Sampling temperature
    #[serde(default = "default_temperature")]
    pub temperature: f32,

    /// Maximum output tokens
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// Request timeout in seconds
    #[serde(default = "default_llm_timeout")]
    pub timeout_secs: u64,

    /// Maximum retries on rate limits and server errors
    #[serde(default = "default_llm_retries")]
    pub max_retries: u32,

    /// System prompt override
    pub system_prompt: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct DatabaseConfig {
    /// Repository backend: memory, sqlite
    #[serde(default = "default_database_backend")]
    pub backend: String,

    /// Database URL for SQL backends
    #[serde(default = "default_database_url")]
    pub url: String,

    /// Maximum number of connections
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,

    /// Connection timeout in seconds
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout_secs: u64,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ObservabilityConfig {
    /// Log filter directive (e.g. "info", "pdfchat_context=debug")
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// Enable JSON logging
    #[serde(default = "default_json_logging")]
    pub json_logging: bool,

    /// Prometheus metrics port (0 to disable)
    #[serde(default)]
    pub metrics_port: u16,
}

// Default value functions
fn default_chunk_size() -> usize { 1000 }
fn default_chunk_overlap() -> usize { 200 }
fn default_top_k() -> usize { 4 }
fn default_embedding_model_id() -> String { "feature-hash-v1".to_string() }
fn default_generation_model_id() -> String { "llama3-8b-8192".to_string() }
fn default_embedding_provider() -> String { "hash".to_string() }
fn default_embedding_dimension() -> usize { 384 }
fn default_embedding_timeout() -> u64 { 30 }
fn default_embedding_retries() -> u32 { 3 }
fn default_batch_size() -> usize { 32 }
fn default_llm_provider() -> String { "openai".to_string() }
fn default_llm_api_base() -> String { "https://api.groq.com/openai/v1".to_string() }
fn default_temperature() -> f32 { 0.1 }
fn default_max_tokens() -> usize { 1024 }
fn default_llm_timeout() -> u64 { 60 }
fn default_llm_retries() -> u32 { 2 }
fn default_database_backend() -> String { "memory".to_string() }
fn default_database_url() -> String { "sqlite://pdfchat.db?mode=rwc".to_string() }
fn default_max_connections() -> u32 { 5 }
fn default_connect_timeout() -> u64 { 10 }
fn default_log_level() -> String { "info".to_string() }
fn default_json_logging() -> bool { false }

fn validate_overlap(rag: &RagConfig) -> std::result::Result<(), ValidationError> {
    if rag.chunk_overlap >= rag.chunk_size {
        let mut err = ValidationError::new("chunk_overlap");
        err.message = Some(Cow::from("chunk_overlap must be smaller than chunk_size"));
        return Err(err);
    }
    Ok(())
}

impl AppConfig {
    /// Load configuration from environment and files
    pub fn load() -> Result<Self> {
        let env = std::env::var("APP_ENV").unwrap_or_else(|_| "development".to_string());

        let config = Config::builder()
            // Load base config file
            .add_source(File::with_name("config/default").required(false))

            // Load environment-specific config
            .add_source(File::with_name(&format!("config/{}", env)).required(false))

            // Load local overrides
            .add_source(File::with_name("config/local").required(false))

            // Load from environment variables with APP__ prefix
            // e.g., APP__RAG__TOP_K=6
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )

            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Load from a specific TOML file
    pub fn from_file(path: &str) -> Result<Self> {
        let config = Config::builder()
            .add_source(File::with_name(path))
            .add_source(
                Environment::with_prefix("APP")
                    .separator("__")
                    .try_parsing(true)
            )
            .build()?;

        let config: AppConfig = config.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }
}

impl EmbeddingConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key from config, then from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
    }
}

impl LlmConfig {
    /// Get request timeout as Duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// API key from config, then from the environment
    pub fn resolved_api_key(&self) -> Option<String> {
        self.api_key
            .clone()
            .filter(|k| !k.is_empty())
            .or_else(|| std::env::var("GROQ_API_KEY").ok())
            .or_else(|| std::env::var("OPENAI_API_KEY").ok())
            .filter(|k| !k.is_empty())
    }
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            chunk_size: default_chunk_size(),
            chunk_overlap: default_chunk_overlap(),
            top_k: default_top_k(),
            embedding_model_id: default_embedding_model_id(),
            generation_model_id: default_generation_model_id(),
            distance: Distance::default(),
            condense_question: false,
        }
    }
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: default_embedding_provider(),
            api_key: None,
            api_base: None,
            dimension: default_embedding_dimension(),
            timeout_secs: default_embedding_timeout(),
            max_retries: default_embedding_retries(),
            batch_size: default_batch_size(),
        }
    }
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            provider: default_llm_provider(),
            api_key: None,
            api_base: default_llm_api_base(),
            temperature: default_temperature(),
            max_tokens: default_max_tokens(),
            timeout_secs: default_llm_timeout(),
            max_retries: default_llm_retries(),
            system_prompt: None,
        }
    }
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            backend: default_database_backend(),
            url: default_database_url(),
            max_connections: default_max_connections(),
            connect_timeout_secs: default_connect_timeout(),
        }
    }
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
            json_logging: default_json_logging(),
            metrics_port: 0,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            rag: RagConfig::default(),
            embedding: EmbeddingConfig::default(),
            llm: LlmConfig::default(),
            database: DatabaseConfig::default(),
            observability: ObservabilityConfig::default(),
        }
    }
}
