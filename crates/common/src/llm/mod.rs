//! Language model abstraction
//!
//! Provides:
//! - Chat message types shared by prompt assembly and providers
//! - The `LanguageModel` trait
//! - An OpenAI-compatible chat-completions client (Groq, OpenAI, local servers)
//!
//! Every provider failure is normalised to `AppError::Generation` with a
//! `GenerationFailureKind`, so callers never inspect provider-specific text.

use crate::config::LlmConfig;
use crate::errors::{AppError, GenerationFailureKind, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Author of a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

/// One message in a chat-style prompt
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self { role: Role::Assistant, content: content.into() }
    }
}

/// A chat-completion language model
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Complete the conversation and return the assistant's reply text
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;

    /// Get the model name
    fn model_name(&self) -> &str;
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    max_tokens: usize,
    temperature: f32,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    content: Option<String>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

/// A failed call and whether retrying it may succeed
struct CallFailure {
    error: AppError,
    retryable: bool,
}

/// OpenAI-compatible chat-completions client
pub struct OpenAIChatModel {
    client: reqwest::Client,
    endpoint: String,
    api_key: String,
    model: String,
    temperature: f32,
    max_tokens: usize,
    max_retries: u32,
}

impl OpenAIChatModel {
    /// Create a new client for `model`
    pub fn new(config: &LlmConfig, api_key: String, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            endpoint: format!("{}/chat/completions", config.api_base.trim_end_matches('/')),
            api_key,
            model: model.to_string(),
            temperature: config.temperature,
            max_tokens: config.max_tokens,
            max_retries: config.max_retries,
        })
    }

    async fn call_once(&self, messages: &[ChatMessage]) -> std::result::Result<String, CallFailure> {
        let request = ChatRequest {
            model: &self.model,
            messages,
            max_tokens: self.max_tokens,
            temperature: self.temperature,
        };

        let response = self.client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let kind = if e.is_timeout() {
                    GenerationFailureKind::Timeout
                } else {
                    GenerationFailureKind::Provider
                };
                // Connection resets and refusals are worth another attempt
                CallFailure {
                    error: AppError::generation(kind, format!("LLM API request failed: {}", e)),
                    retryable: true,
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(CallFailure {
                error: AppError::generation(
                    classify_status(status.as_u16()),
                    format!("LLM API error {}: {}", status, body),
                ),
                retryable: is_retryable_status(status.as_u16()),
            });
        }

        let chat_response: ChatResponse = response.json().await.map_err(|e| {
            let (kind, retryable) = if e.is_timeout() {
                (GenerationFailureKind::Timeout, true)
            } else {
                (GenerationFailureKind::MalformedResponse, false)
            };
            CallFailure {
                error: AppError::generation(kind, format!("Failed to parse LLM response: {}", e)),
                retryable,
            }
        })?;

        extract_content(chat_response).map_err(|error| CallFailure { error, retryable: false })
    }
}

#[async_trait]
impl LanguageModel for OpenAIChatModel {
    #[tracing::instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let mut attempt = 0;
        loop {
            match self.call_once(messages).await {
                Ok(content) => return Ok(content),
                Err(failure) if attempt < self.max_retries && failure.retryable => {
                    attempt += 1;
                    tracing::warn!(attempt, max_retries = self.max_retries, error = %failure.error, "LLM call failed, retrying");
                    // Exponential backoff
                    tokio::time::sleep(Duration::from_millis(250 * 2_u64.pow(attempt.min(6)))).await;
                }
                Err(failure) => return Err(failure.error),
            }
        }
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Map an HTTP error status to a failure kind
fn classify_status(status: u16) -> GenerationFailureKind {
    match status {
        429 => GenerationFailureKind::RateLimited,
        408 | 504 => GenerationFailureKind::Timeout,
        _ => GenerationFailureKind::Provider,
    }
}

/// Rate limits, timeouts and server-side errors are worth another attempt
fn is_retryable_status(status: u16) -> bool {
    classify_status(status).is_transient() || (500..600).contains(&status)
}

fn extract_content(response: ChatResponse) -> Result<String> {
    let content = response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .unwrap_or_default();

    if content.trim().is_empty() {
        return Err(AppError::generation(
            GenerationFailureKind::EmptyResponse,
            "Empty response from LLM",
        ));
    }
    Ok(content)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_status(429), GenerationFailureKind::RateLimited);
        assert_eq!(classify_status(504), GenerationFailureKind::Timeout);
        assert_eq!(classify_status(401), GenerationFailureKind::Provider);
        assert_eq!(classify_status(500), GenerationFailureKind::Provider);
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(is_retryable_status(503));
        assert!(is_retryable_status(500));
        assert!(is_retryable_status(429));
        assert!(is_retryable_status(408));
        assert!(!is_retryable_status(401));
        assert!(!is_retryable_status(400));
    }

    #[tokio::test]
    async fn test_refused_connection_is_retried_then_reported() {
        // Bind then release a port so nothing is listening on it
        let port = std::net::TcpListener::bind("127.0.0.1:0").unwrap().local_addr().unwrap().port();
        let config = LlmConfig {
            api_base: format!("http://127.0.0.1:{}/v1", port),
            max_retries: 1,
            timeout_secs: 5,
            ..LlmConfig::default()
        };
        let model = OpenAIChatModel::new(&config, "key".into(), "llama3-8b-8192").unwrap();

        let failure = model.call_once(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(failure.retryable);
        assert!(matches!(
            failure.error,
            AppError::Generation { kind: GenerationFailureKind::Provider, .. }
        ));

        let err = model.complete(&[ChatMessage::user("hi")]).await.unwrap_err();
        assert!(matches!(err, AppError::Generation { kind: GenerationFailureKind::Provider, .. }));
    }

    #[test]
    fn test_empty_choice_is_empty_response() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"content":"   "}}]}"#).unwrap();
        let err = extract_content(response).unwrap_err();
        assert!(matches!(
            err,
            AppError::Generation { kind: GenerationFailureKind::EmptyResponse, .. }
        ));

        let response: ChatResponse = serde_json::from_str(r#"{"choices":[]}"#).unwrap();
        assert!(extract_content(response).is_err());
    }

    #[test]
    fn test_content_extracted() {
        let response: ChatResponse =
            serde_json::from_str(r#"{"choices":[{"message":{"role":"assistant","content":"Quenton."}}]}"#)
                .unwrap();
        assert_eq!(extract_content(response).unwrap(), "Quenton.");
    }

    #[test]
    fn test_messages_serialise_with_lowercase_roles() {
        let json = serde_json::to_string(&ChatMessage::assistant("hi")).unwrap();
        assert_eq!(json, r#"{"role":"assistant","content":"hi"}"#);
    }

    #[test]
    fn test_endpoint_built_from_base() {
        let config = LlmConfig {
            api_base: "http://localhost:8080/v1/".into(),
            ..LlmConfig::default()
        };
        let model = OpenAIChatModel::new(&config, "key".into(), "llama3-8b-8192").unwrap();
        assert_eq!(model.endpoint, "http://localhost:8080/v1/chat/completions");
        assert_eq!(model.model_name(), "llama3-8b-8192");
    }
}
