//! Embedding service abstraction
//!
//! Provides a unified interface for embedding providers:
//! - OpenAI-compatible HTTP endpoints (text-embedding-3-small, hosted MiniLM, ...)
//! - A deterministic feature-hashing embedder that runs offline

use crate::config::EmbeddingConfig;
use crate::errors::{AppError, Result};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::sync::Arc;
use std::time::Duration;

/// Trait for embedding generation
///
/// Implementations must be deterministic for a given model and input.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate embedding for a single text
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts (batch)
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the model name
    fn model_name(&self) -> &str;

    /// Get the embedding dimension
    fn dimension(&self) -> usize;
}

/// OpenAI-compatible embedding client
pub struct OpenAIEmbedder {
    client: reqwest::Client,
    api_key: String,
    model: String,
    dimension: usize,
    base_url: String,
    max_retries: u32,
}

#[derive(Serialize)]
struct OpenAIRequest {
    input: Vec<String>,
    model: String,
}

#[derive(Deserialize)]
struct OpenAIResponse {
    data: Vec<OpenAIEmbedding>,
}

#[derive(Deserialize)]
struct OpenAIEmbedding {
    index: usize,
    embedding: Vec<f32>,
}

/// Failure of a single request, tagged with whether it is worth retrying
struct RequestFailure {
    error: AppError,
    retryable: bool,
}

impl OpenAIEmbedder {
    /// Create a new OpenAI embedder
    pub fn new(config: &EmbeddingConfig, api_key: String, model: &str) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AppError::Configuration {
                message: format!("Failed to create HTTP client: {}", e),
            })?;

        Ok(Self {
            client,
            api_key,
            model: model.to_string(),
            dimension: config.dimension,
            base_url: config
                .api_base
                .clone()
                .unwrap_or_else(|| "https://api.openai.com/v1".to_string()),
            max_retries: config.max_retries,
        })
    }

    /// Make request with retry
    async fn request_with_retry(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        let mut last_error = None;

        for attempt in 0..=self.max_retries {
            if attempt > 0 {
                // Exponential backoff
                let delay = Duration::from_millis(100 * 2_u64.pow(attempt.min(6)));
                tokio::time::sleep(delay).await;
            }

            match self.make_request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err(failure) if failure.retryable => {
                    tracing::warn!(
                        attempt = attempt + 1,
                        max_retries = self.max_retries,
                        error = %failure.error,
                        "Embedding request failed, retrying"
                    );
                    last_error = Some(failure.error);
                }
                Err(failure) => return Err(failure.error),
            }
        }

        Err(last_error.unwrap_or_else(|| AppError::Embedding {
            message: "Unknown error after retries".to_string(),
        }))
    }

    async fn make_request(&self, texts: &[String]) -> std::result::Result<Vec<Vec<f32>>, RequestFailure> {
        let url = format!("{}/embeddings", self.base_url);

        let request = OpenAIRequest {
            input: texts.to_vec(),
            model: self.model.clone(),
        };

        let response = self.client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| RequestFailure {
                error: AppError::Embedding {
                    message: format!("Request failed: {}", e),
                },
                retryable: true,
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(RequestFailure {
                error: AppError::Embedding {
                    message: format!("API error {}: {}", status, body),
                },
                retryable: status.as_u16() == 429 || status.is_server_error(),
            });
        }

        let mut result: OpenAIResponse = response.json().await.map_err(|e| RequestFailure {
            error: AppError::Embedding {
                message: format!("Failed to parse response: {}", e),
            },
            retryable: false,
        })?;

        // The API does not promise response order
        result.data.sort_by_key(|e| e.index);

        Ok(result.data.into_iter().map(|e| e.embedding).collect())
    }
}

#[async_trait]
impl Embedder for OpenAIEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        let embeddings = self.request_with_retry(&[text.to_string()]).await?;
        embeddings.into_iter().next().ok_or_else(|| AppError::Embedding {
            message: "Empty response".to_string(),
        })
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        // OpenAI has a limit of 2048 texts per request
        const BATCH_SIZE: usize = 100;

        let mut all_embeddings = Vec::with_capacity(texts.len());

        for chunk in texts.chunks(BATCH_SIZE) {
            let embeddings = self.request_with_retry(chunk).await?;
            all_embeddings.extend(embeddings);
        }

        Ok(all_embeddings)
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Deterministic bag-of-words embedder using signed feature hashing
///
/// Each lowercase alphanumeric token is hashed with SHA-256 into one of
/// `dimension` buckets with a hash-derived sign; the result is L2-normalised.
/// Texts sharing vocabulary land close together, which is enough for
/// offline use and tests.
pub struct HashEmbedder {
    model: String,
    dimension: usize,
}

impl HashEmbedder {
    pub fn new(model: &str, dimension: usize) -> Self {
        Self {
            model: model.to_string(),
            dimension: dimension.max(1),
        }
    }

    fn vectorize(&self, text: &str) -> Vec<f32> {
        let mut vector = vec![0.0f32; self.dimension];

        let lowered = text.to_lowercase();
        let tokens = lowered
            .split(|c: char| !c.is_alphanumeric())
            .filter(|t| t.chars().count() > 1);

        for token in tokens {
            let digest = Sha256::digest(token.as_bytes());
            let mut bucket_bytes = [0u8; 8];
            bucket_bytes.copy_from_slice(&digest[..8]);
            let bucket = (u64::from_le_bytes(bucket_bytes) % self.dimension as u64) as usize;
            let sign = if digest[8] & 1 == 0 { 1.0 } else { -1.0 };
            vector[bucket] += sign;
        }

        let norm = vector.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > f32::EPSILON {
            for value in vector.iter_mut() {
                *value /= norm;
            }
        }

        vector
    }
}

#[async_trait]
impl Embedder for HashEmbedder {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        Ok(self.vectorize(text))
    }

    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        Ok(texts.iter().map(|t| self.vectorize(t)).collect())
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Create an embedder based on configuration
pub fn create_embedder(config: &EmbeddingConfig, model_id: &str) -> Result<Arc<dyn Embedder>> {
    match config.provider.as_str() {
        "openai" => {
            let key = config.resolved_api_key().ok_or_else(|| AppError::Configuration {
                message: "embedding.api_key or OPENAI_API_KEY is required for the openai provider"
                    .to_string(),
            })?;
            Ok(Arc::new(OpenAIEmbedder::new(config, key, model_id)?))
        }
        "hash" => Ok(Arc::new(HashEmbedder::new(model_id, config.dimension))),
        other => Err(AppError::Configuration {
            message: format!("Unknown embedding provider: '{}'. Must be hash or openai.", other),
        }),
    }
}
