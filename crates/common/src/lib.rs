//! PDFChat Common Library
//!
//! Shared code for every PDFChat crate including:
//! - Configuration management
//! - Error types and handling
//! - Domain models (documents, passages, conversation turns)
//! - Embedding and language model abstractions
//! - Vector index abstraction
//! - Persistence (repository pattern)
//! - Metrics and observability

pub mod config;
pub mod db;
pub mod embeddings;
pub mod errors;
pub mod index;
pub mod llm;
pub mod metrics;
pub mod models;

// Re-export commonly used types
pub use errors::{AppError, Result};
pub use config::AppConfig;
pub use db::Repository;
pub use embeddings::Embedder;
pub use index::{IndexProvider, VectorIndex};
pub use llm::LanguageModel;

/// Application version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
