//! SQL repository backed by SeaORM

use super::models::*;
use super::{DbPool, Repository};
use crate::errors::{AppError, Result};
use crate::models::{ConversationTurn, Document};
use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, EntityTrait, QueryFilter, QueryOrder, Set,
};
use std::path::{Path, PathBuf};
use uuid::Uuid;

/// Repository for documents and chat messages in a SQL database
#[derive(Clone)]
pub struct SqlRepository {
    pool: DbPool,
}

impl SqlRepository {
    /// Create a new repository with the given connection pool
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    fn conn(&self) -> &DatabaseConnection {
        &self.pool.connection
    }
}

fn parse_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|e| AppError::Persistence {
        message: format!("Stored id '{}' is not a UUID: {}", raw, e),
    })
}

fn to_document(row: DocumentRow) -> Result<Document> {
    Ok(Document {
        id: parse_id(&row.id)?,
        title: row.title,
        file_path: PathBuf::from(row.file_path),
        uploaded_at: row.uploaded_at,
        processed: row.processed,
    })
}

fn to_turn(row: ChatMessageRow) -> Result<ConversationTurn> {
    Ok(ConversationTurn {
        id: i64::from(row.id),
        document_id: parse_id(&row.document_id)?,
        question: row.question,
        answer: row.answer,
        timestamp: row.timestamp,
    })
}

#[async_trait]
impl Repository for SqlRepository {
    // ========================================================================
    // Document Operations
    // ========================================================================

    async fn create_document(&self, title: &str, file_path: &Path) -> Result<Document> {
        let document = DocumentActiveModel {
            id: Set(Uuid::new_v4().to_string()),
            title: Set(title.to_string()),
            file_path: Set(file_path.to_string_lossy().into_owned()),
            uploaded_at: Set(Utc::now()),
            processed: Set(false),
        };

        let row = document.insert(self.conn()).await?;
        to_document(row)
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        DocumentEntity::find_by_id(id.to_string())
            .one(self.conn())
            .await?
            .map(to_document)
            .transpose()
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        DocumentEntity::find()
            .order_by_desc(DocumentColumn::UploadedAt)
            .all(self.conn())
            .await?
            .into_iter()
            .map(to_document)
            .collect()
    }

    async fn mark_processed(&self, id: Uuid) -> Result<()> {
        let row = DocumentEntity::find_by_id(id.to_string())
            .one(self.conn())
            .await?
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })?;

        let mut active: DocumentActiveModel = row.into();
        active.processed = Set(true);
        active.update(self.conn()).await?;
        Ok(())
    }

    // ========================================================================
    // Conversation Operations
    // ========================================================================

    async fn append_turn(
        &self,
        document_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<ConversationTurn> {
        if DocumentEntity::find_by_id(document_id.to_string())
            .one(self.conn())
            .await?
            .is_none()
        {
            return Err(AppError::DocumentNotFound { id: document_id.to_string() });
        }

        let message = ChatMessageActiveModel {
            document_id: Set(document_id.to_string()),
            question: Set(question.to_string()),
            answer: Set(answer.to_string()),
            timestamp: Set(Utc::now()),
            ..Default::default()
        };

        let row = message.insert(self.conn()).await?;
        to_turn(row)
    }

    async fn list_turns(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>> {
        ChatMessageEntity::find()
            .filter(ChatMessageColumn::DocumentId.eq(document_id.to_string()))
            .order_by_asc(ChatMessageColumn::Id)
            .all(self.conn())
            .await?
            .into_iter()
            .map(to_turn)
            .collect()
    }

    fn backend_name(&self) -> &str {
        "sqlite"
    }
}
