//! Service assembly from configuration

use crate::extractive::ExtractiveModel;
use crate::service::{ChatService, ServiceComponents};
use pdfchat_common::config::{AppConfig, LlmConfig};
use pdfchat_common::db::create_repository;
use pdfchat_common::embeddings::create_embedder;
use pdfchat_common::errors::{AppError, Result};
use pdfchat_common::index::InMemoryIndexProvider;
use pdfchat_common::llm::{LanguageModel, OpenAIChatModel};
use std::sync::Arc;
use tracing::{info, warn};

/// Create a language model based on configuration
///
/// The `openai` provider without an API key falls back to the extractive
/// model so the binary still runs offline.
pub fn create_language_model(config: &LlmConfig, model_id: &str) -> Result<Arc<dyn LanguageModel>> {
    match config.provider.as_str() {
        "openai" => match config.resolved_api_key() {
            Some(key) => Ok(Arc::new(OpenAIChatModel::new(config, key, model_id)?)),
            None => {
                warn!("No LLM API key configured (llm.api_key, GROQ_API_KEY or OPENAI_API_KEY), using extractive model");
                Ok(Arc::new(ExtractiveModel::new()))
            }
        },
        "extractive" => Ok(Arc::new(ExtractiveModel::new())),
        other => Err(AppError::Configuration {
            message: format!("Unknown LLM provider: '{}'. Must be openai or extractive.", other),
        }),
    }
}

/// Build a `ChatService` with the providers named in `config`
pub async fn build_service(config: &AppConfig) -> Result<ChatService> {
    let repository = create_repository(&config.database).await?;
    let embedder = create_embedder(&config.embedding, &config.rag.embedding_model_id)?;
    let language_model = create_language_model(&config.llm, &config.rag.generation_model_id)?;

    info!(
        repository = repository.backend_name(),
        embedder = embedder.model_name(),
        dimension = embedder.dimension(),
        language_model = language_model.model_name(),
        distance = ?config.rag.distance,
        "Service components ready"
    );

    Ok(ChatService::new(
        config,
        ServiceComponents {
            repository,
            embedder,
            index_provider: Arc::new(InMemoryIndexProvider::new(config.rag.distance)),
            language_model,
        },
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extractive_provider() {
        let config = LlmConfig {
            provider: "extractive".into(),
            ..LlmConfig::default()
        };
        let model = create_language_model(&config, "llama3-8b-8192").unwrap();
        assert_eq!(model.model_name(), "extractive");
    }

    #[test]
    fn test_openai_with_explicit_key() {
        let config = LlmConfig {
            api_key: Some("test-key".into()),
            ..LlmConfig::default()
        };
        let model = create_language_model(&config, "llama3-8b-8192").unwrap();
        assert_eq!(model.model_name(), "llama3-8b-8192");
    }

    #[test]
    fn test_unknown_provider() {
        let config = LlmConfig {
            provider: "carrier-pigeon".into(),
            ..LlmConfig::default()
        };
        assert!(matches!(
            create_language_model(&config, "m"),
            Err(AppError::Configuration { .. })
        ));
    }

    #[tokio::test]
    async fn test_build_default_service() {
        let mut config = AppConfig::default();
        config.llm.provider = "extractive".into();
        let service = build_service(&config).await.unwrap();
        assert!(service.list_documents().await.unwrap().is_empty());
    }
}
