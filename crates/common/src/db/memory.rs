//! In-memory repository

use super::Repository;
use crate::errors::{AppError, Result};
use crate::models::{ConversationTurn, Document};
use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::path::Path;
use tokio::sync::RwLock;
use uuid::Uuid;

#[derive(Default)]
struct State {
    documents: HashMap<Uuid, Document>,
    turns: HashMap<Uuid, Vec<ConversationTurn>>,
    next_turn_id: i64,
}

/// Repository that lives for the process lifetime
#[derive(Default)]
pub struct MemoryRepository {
    state: RwLock<State>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn create_document(&self, title: &str, file_path: &Path) -> Result<Document> {
        let document = Document {
            id: Uuid::new_v4(),
            title: title.to_string(),
            file_path: file_path.to_path_buf(),
            uploaded_at: Utc::now(),
            processed: false,
        };

        self.state
            .write()
            .await
            .documents
            .insert(document.id, document.clone());

        Ok(document)
    }

    async fn find_document(&self, id: Uuid) -> Result<Option<Document>> {
        Ok(self.state.read().await.documents.get(&id).cloned())
    }

    async fn list_documents(&self) -> Result<Vec<Document>> {
        let state = self.state.read().await;
        let mut documents: Vec<Document> = state.documents.values().cloned().collect();
        documents.sort_by(|a, b| b.uploaded_at.cmp(&a.uploaded_at));
        Ok(documents)
    }

    async fn mark_processed(&self, id: Uuid) -> Result<()> {
        let mut state = self.state.write().await;
        let document = state
            .documents
            .get_mut(&id)
            .ok_or_else(|| AppError::DocumentNotFound { id: id.to_string() })?;
        document.processed = true;
        Ok(())
    }

    async fn append_turn(
        &self,
        document_id: Uuid,
        question: &str,
        answer: &str,
    ) -> Result<ConversationTurn> {
        let mut state = self.state.write().await;
        if !state.documents.contains_key(&document_id) {
            return Err(AppError::DocumentNotFound { id: document_id.to_string() });
        }

        state.next_turn_id += 1;
        let turn = ConversationTurn {
            id: state.next_turn_id,
            document_id,
            question: question.to_string(),
            answer: answer.to_string(),
            timestamp: Utc::now(),
        };
        state.turns.entry(document_id).or_default().push(turn.clone());

        Ok(turn)
    }

    async fn list_turns(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>> {
        Ok(self
            .state
            .read()
            .await
            .turns
            .get(&document_id)
            .cloned()
            .unwrap_or_default())
    }

    fn backend_name(&self) -> &str {
        "memory"
    }
}
