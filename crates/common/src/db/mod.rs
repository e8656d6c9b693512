//! Persistence layer for PDFChat
//!
//! Provides:
//! - The `Repository` trait for documents and their conversation log
//! - An in-memory repository (default, process lifetime)
//! - A SeaORM-backed SQL repository (SQLite), schema created on connect
//! - Connection pool management

mod memory;
pub mod models;
mod repository;

pub use memory::MemoryRepository;
pub use repository::SqlRepository;

use crate::config::DatabaseConfig;
use crate::errors::{AppError, Result};
use crate::models::{ConversationTurn, Document};
use async_trait::async_trait;
use sea_orm::{ConnectOptions, ConnectionTrait, Database, DatabaseConnection, Schema};
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tracing::info;
use uuid::Uuid;

/// Storage for documents and conversation turns
///
/// Turns are append-only; `list_turns` returns them in append order.
#[async_trait]
pub trait Repository: Send + Sync {
    /// Persist a new, unprocessed document
    async fn create_document(&self, title: &str, file_path: &Path) -> Result<Document>;

    /// Find document by ID
    async fn find_document(&self, id: Uuid) -> Result<Option<Document>>;

    /// All documents, newest upload first
    async fn list_documents(&self) -> Result<Vec<Document>>;

    /// Flip the processed flag; fails with `DocumentNotFound` for unknown ids
    async fn mark_processed(&self, id: Uuid) -> Result<()>;

    /// Append one turn to a document's log
    async fn append_turn(
        &self,
        document_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<ConversationTurn>;

    /// A document's turns, oldest first
    async fn list_turns(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>>;

    /// Backend name for logging
    fn backend_name(&self) -> &str;
}

/// Database connection pool wrapper
#[derive(Clone)]
pub struct DbPool {
    pub connection: DatabaseConnection,
}

impl DbPool {
    /// Connect using configuration
    pub async fn new(config: &DatabaseConfig) -> Result<Self> {
        info!(url = %config.url, "Connecting to database...");

        // Every pooled connection to an in-memory SQLite URL would open its own database
        let max_connections = if config.url.contains(":memory:") {
            1
        } else {
            config.max_connections
        };

        let mut opts = ConnectOptions::new(&config.url);
        opts.max_connections(max_connections)
            .min_connections(1)
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .sqlx_logging(false);

        let connection = Database::connect(opts)
            .await
            .map_err(|e| AppError::Persistence {
                message: format!("Failed to connect to database: {}", e),
            })?;

        info!("Database connection established");

        Ok(Self { connection })
    }

    /// Create tables for every entity if they do not exist
    pub async fn ensure_schema(&self) -> Result<()> {
        let backend = self.connection.get_database_backend();
        let schema = Schema::new(backend);

        let mut documents = schema.create_table_from_entity(models::DocumentEntity);
        documents.if_not_exists();
        self.connection.execute(backend.build(&documents)).await?;

        let mut messages = schema.create_table_from_entity(models::ChatMessageEntity);
        messages.if_not_exists();
        self.connection.execute(backend.build(&messages)).await?;

        Ok(())
    }

    /// Ping the database to check connectivity
    pub async fn ping(&self) -> Result<()> {
        self.connection
            .execute_unprepared("SELECT 1")
            .await
            .map_err(|e| AppError::Persistence {
                message: format!("Ping failed: {}", e),
            })?;
        Ok(())
    }
}

/// Create a repository based on configuration
pub async fn create_repository(config: &DatabaseConfig) -> Result<Arc<dyn Repository>> {
    match config.backend.as_str() {
        "memory" => Ok(Arc::new(MemoryRepository::new())),
        "sqlite" => {
            let pool = DbPool::new(config).await?;
            pool.ping().await?;
            pool.ensure_schema().await?;
            Ok(Arc::new(SqlRepository::new(pool)))
        }
        other => Err(AppError::Configuration {
            message: format!("Unknown database backend: '{}'. Must be memory or sqlite.", other),
        }),
    }
}
