//! Session store
//!
//! Holds the per-document state shared between requests: the current index
//! snapshot and the conversation history. Injected into the service; there
//! is no global state.
//!
//! Locking:
//! - the session map is only locked for lookups and inserts
//! - each session's history mutex is held for a whole question pipeline,
//!   so turns for one document are appended in arrival order
//! - index snapshots are swapped whole under a short-lived lock

use pdfchat_common::db::Repository;
use pdfchat_common::errors::Result;
use pdfchat_common::index::VectorIndex;
use pdfchat_common::models::ConversationTurn;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard, RwLock};
use tracing::debug;
use uuid::Uuid;

/// State for one document
pub struct DocumentSession {
    document_id: Uuid,
    index: RwLock<Option<Arc<dyn VectorIndex>>>,
    history: Mutex<Vec<ConversationTurn>>,
}

impl DocumentSession {
    fn new(document_id: Uuid, history: Vec<ConversationTurn>) -> Self {
        Self {
            document_id,
            index: RwLock::new(None),
            history: Mutex::new(history),
        }
    }

    /// Current index snapshot, if one has been built in this process
    pub async fn index(&self) -> Option<Arc<dyn VectorIndex>> {
        self.index.read().await.clone()
    }

    /// Replace the index snapshot
    pub async fn install_index(&self, index: Arc<dyn VectorIndex>) {
        debug!(document_id = %self.document_id, passages = index.len(), "Installing index snapshot");
        *self.index.write().await = Some(index);
    }

    /// Lock the history for the duration of a question
    ///
    /// Waiters are served in FIFO order.
    pub async fn lock_history(&self) -> MutexGuard<'_, Vec<ConversationTurn>> {
        self.history.lock().await
    }
}

/// Registry of document sessions
pub struct SessionStore {
    sessions: RwLock<HashMap<Uuid, Arc<DocumentSession>>>,
    repository: Arc<dyn Repository>,
}

impl SessionStore {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            repository,
        }
    }

    /// Existing session for `document_id`, or a new one seeded from the
    /// persisted turn log
    pub async fn get_or_create(&self, document_id: Uuid) -> Result<Arc<DocumentSession>> {
        if let Some(session) = self.get(document_id).await {
            return Ok(session);
        }

        let history = self.repository.list_turns(document_id).await?;
        debug!(document_id = %document_id, seeded_turns = history.len(), "Creating session");

        let mut sessions = self.sessions.write().await;
        let session = sessions
            .entry(document_id)
            .or_insert_with(|| Arc::new(DocumentSession::new(document_id, history)));
        Ok(Arc::clone(session))
    }

    pub async fn get(&self, document_id: Uuid) -> Option<Arc<DocumentSession>> {
        self.sessions.read().await.get(&document_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.len().await == 0
    }
}
