//! Error types for PDFChat
//!
//! Provides the error taxonomy shared by every stage of the pipeline:
//! - Distinct error types for ingestion, indexing, retrieval, generation and persistence
//! - Error codes for machine-readable client handling
//! - Normalised language model failure kinds

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Result type alias using AppError
pub type Result<T> = std::result::Result<T, AppError>;

/// Error codes for machine-readable error identification
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    // Validation errors (1xxx)
    ValidationError,

    // Resource errors (4xxx)
    DocumentNotFound,
    NotProcessed,

    // Pipeline errors (6xxx)
    IngestionError,
    IndexingError,

    // Persistence errors (7xxx)
    PersistenceError,

    // External service errors (8xxx)
    EmbeddingError,
    GenerationError,

    // Internal errors (9xxx)
    InternalError,
    ConfigurationError,
}

impl ErrorCode {
    /// Get the numeric code for this error
    pub fn as_code(&self) -> u16 {
        match self {
            ErrorCode::ValidationError => 1001,

            ErrorCode::DocumentNotFound => 4001,
            ErrorCode::NotProcessed => 4002,

            ErrorCode::IngestionError => 6001,
            ErrorCode::IndexingError => 6002,

            ErrorCode::PersistenceError => 7001,

            ErrorCode::EmbeddingError => 8001,
            ErrorCode::GenerationError => 8002,

            ErrorCode::InternalError => 9001,
            ErrorCode::ConfigurationError => 9002,
        }
    }
}

/// Why a language model call failed, normalised across providers
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum GenerationFailureKind {
    /// The provider did not answer within the configured timeout
    Timeout,
    /// The provider rejected the call because of rate limits or quota
    RateLimited,
    /// The provider answered with a body we could not decode
    MalformedResponse,
    /// The provider returned an error status or could not be reached
    Provider,
    /// The provider answered with no usable content
    EmptyResponse,
}

impl GenerationFailureKind {
    /// Whether retrying the same call may succeed
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::Timeout | Self::RateLimited)
    }
}

impl fmt::Display for GenerationFailureKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Timeout => "timeout",
            Self::RateLimited => "rate limited",
            Self::MalformedResponse => "malformed response",
            Self::Provider => "provider error",
            Self::EmptyResponse => "empty response",
        };
        f.write_str(label)
    }
}

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Validation errors
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        field: Option<String>
    },

    // Resource errors
    #[error("Document not found: {id}")]
    DocumentNotFound { id: String },

    #[error("Document {document_id} has not been processed yet")]
    NotProcessed { document_id: String },

    // Pipeline errors
    #[error("Ingestion failed: {message}")]
    Ingestion { message: String },

    #[error("Indexing failed: {message}")]
    Indexing { message: String },

    // Persistence errors
    #[error("Persistence error: {message}")]
    Persistence { message: String },

    // External service errors
    #[error("Embedding service error: {message}")]
    Embedding { message: String },

    #[error("Language model error ({kind}): {message}")]
    Generation {
        kind: GenerationFailureKind,
        message: String
    },

    // Internal errors
    #[error("Internal error: {message}")]
    Internal { message: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },

    // Generic
    #[error("{0}")]
    Other(#[from] anyhow::Error),
}

impl AppError {
    /// Get the error code for this error
    pub fn code(&self) -> ErrorCode {
        match self {
            AppError::Validation { .. } => ErrorCode::ValidationError,
            AppError::DocumentNotFound { .. } => ErrorCode::DocumentNotFound,
            AppError::NotProcessed { .. } => ErrorCode::NotProcessed,
            AppError::Ingestion { .. } => ErrorCode::IngestionError,
            AppError::Indexing { .. } => ErrorCode::IndexingError,
            AppError::Persistence { .. } => ErrorCode::PersistenceError,
            AppError::Embedding { .. } => ErrorCode::EmbeddingError,
            AppError::Generation { .. } => ErrorCode::GenerationError,
            AppError::Internal { .. } => ErrorCode::InternalError,
            AppError::Configuration { .. } => ErrorCode::ConfigurationError,
            AppError::Other(_) => ErrorCode::InternalError,
        }
    }

    /// Check if the caller is at fault (bad input or wrong call order)
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            AppError::Validation { .. }
                | AppError::DocumentNotFound { .. }
                | AppError::NotProcessed { .. }
                | AppError::Ingestion { .. }
        )
    }

    /// Shorthand for a generation failure
    pub fn generation(kind: GenerationFailureKind, message: impl Into<String>) -> Self {
        AppError::Generation { kind, message: message.into() }
    }
}

impl From<std::io::Error> for AppError {
    fn from(err: std::io::Error) -> Self {
        AppError::Internal {
            message: err.to_string()
        }
    }
}

impl From<sea_orm::DbErr> for AppError {
    fn from(err: sea_orm::DbErr) -> Self {
        AppError::Persistence {
            message: err.to_string()
        }
    }
}

impl From<config::ConfigError> for AppError {
    fn from(err: config::ConfigError) -> Self {
        AppError::Configuration {
            message: err.to_string()
        }
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        let field = err.field_errors().keys().next().map(|f| f.to_string());
        AppError::Validation {
            message: err.to_string(),
            field
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_code_mapping() {
        let err = AppError::NotProcessed { document_id: "doc".into() };
        assert_eq!(err.code(), ErrorCode::NotProcessed);
        assert_eq!(err.code().as_code(), 4002);
        assert!(err.is_caller_error());
    }

    #[test]
    fn test_generation_error_display() {
        let err = AppError::generation(GenerationFailureKind::RateLimited, "429 from provider");
        assert_eq!(err.code(), ErrorCode::GenerationError);
        assert_eq!(err.to_string(), "Language model error (rate limited): 429 from provider");
        assert!(!err.is_caller_error());
    }

    #[test]
    fn test_transient_failure_kinds() {
        assert!(GenerationFailureKind::Timeout.is_transient());
        assert!(GenerationFailureKind::RateLimited.is_transient());
        assert!(!GenerationFailureKind::Provider.is_transient());
        assert!(!GenerationFailureKind::MalformedResponse.is_transient());
        assert!(!GenerationFailureKind::EmptyResponse.is_transient());
    }

    #[test]
    fn test_db_error_becomes_persistence() {
        let err: AppError = sea_orm::DbErr::Custom("disk full".into()).into();
        assert_eq!(err.code(), ErrorCode::PersistenceError);
    }
}
