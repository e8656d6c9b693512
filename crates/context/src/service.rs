//! Chat service
//!
//! The entry point callers use: upload a PDF, ask questions about it, read
//! its conversation log. Owns every collaborator through trait objects so
//! providers are chosen at construction time.

use crate::generator::{ChatReply, Generator};
use crate::prompt::PromptBuilder;
use crate::retrieval::Retriever;
use crate::session::{DocumentSession, SessionStore};
use pdfchat_common::config::AppConfig;
use pdfchat_common::db::Repository;
use pdfchat_common::embeddings::Embedder;
use pdfchat_common::errors::{AppError, Result};
use pdfchat_common::index::{IndexProvider, VectorIndex};
use pdfchat_common::llm::LanguageModel;
use pdfchat_common::metrics::{self, QuestionOutcome, StageTimer};
use pdfchat_common::models::{ConversationTurn, Document};
use pdfchat_ingestion::{ChunkingConfig, IndexBuilder, IngestionProcessor};
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use uuid::Uuid;

/// Providers the service is assembled from
pub struct ServiceComponents {
    pub repository: Arc<dyn Repository>,
    pub embedder: Arc<dyn Embedder>,
    pub index_provider: Arc<dyn IndexProvider>,
    pub language_model: Arc<dyn LanguageModel>,
}

/// Question answering over uploaded PDFs
pub struct ChatService {
    repository: Arc<dyn Repository>,
    sessions: SessionStore,
    processor: IngestionProcessor,
    indexer: IndexBuilder,
    retriever: Retriever,
    generator: Generator,
    condense_question: bool,
}

impl ChatService {
    pub fn new(config: &AppConfig, components: ServiceComponents) -> Self {
        let ServiceComponents {
            repository,
            embedder,
            index_provider,
            language_model,
        } = components;

        Self {
            sessions: SessionStore::new(Arc::clone(&repository)),
            repository,
            processor: IngestionProcessor::new(ChunkingConfig::from(&config.rag)),
            indexer: IndexBuilder::new(Arc::clone(&embedder), index_provider, config.embedding.batch_size),
            retriever: Retriever::new(embedder, config.rag.top_k),
            generator: Generator::new(
                language_model,
                PromptBuilder::new(config.llm.system_prompt.clone()),
            ),
            condense_question: config.rag.condense_question,
        }
    }

    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    // ========================================================================
    // Documents
    // ========================================================================

    /// Register a PDF and build its index
    ///
    /// The file type is checked before anything is persisted. If processing
    /// fails the document stays recorded with `processed = false` and the
    /// error is returned.
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn upload(&self, title: &str, path: &Path) -> Result<Document> {
        let title = title.trim();
        if title.is_empty() {
            return Err(AppError::Validation {
                message: "title must not be empty".to_string(),
                field: Some("title".to_string()),
            });
        }
        IngestionProcessor::check_file_type(path)?;

        let document = self.repository.create_document(title, path).await?;
        info!(document_id = %document.id, "Document registered");

        self.process(document.id).await?;

        self.document(document.id).await
    }

    /// Extract, chunk and index a registered document, then mark it processed
    ///
    /// Also used to re-index: the new index replaces the old one atomically.
    #[instrument(skip(self))]
    pub async fn process(&self, document_id: Uuid) -> Result<usize> {
        let document = self.document(document_id).await?;
        let timer = StageTimer::start();

        let session = self.sessions.get_or_create(document_id).await?;
        let result = self.build_index(&document, &session).await;
        metrics::record_ingestion(
            timer.elapsed_secs(),
            result.as_ref().map(|n| *n).unwrap_or(0),
            result.is_ok(),
        );
        let passage_count = result?;

        self.repository.mark_processed(document_id).await?;
        info!(passage_count, "Document processed");
        Ok(passage_count)
    }

    async fn build_index(&self, document: &Document, session: &DocumentSession) -> Result<usize> {
        let passages = self
            .processor
            .process_file(document.id, &document.file_path)
            .await?;
        let index = self.indexer.build(&passages).await?;
        let count = index.len();
        session.install_index(index).await;
        Ok(count)
    }

    /// Find a document or fail with `DocumentNotFound`
    pub async fn document(&self, document_id: Uuid) -> Result<Document> {
        self.repository
            .find_document(document_id)
            .await?
            .ok_or_else(|| AppError::DocumentNotFound {
                id: document_id.to_string(),
            })
    }

    /// All documents, newest first
    pub async fn list_documents(&self) -> Result<Vec<Document>> {
        self.repository.list_documents().await
    }

    // ========================================================================
    // Conversation
    // ========================================================================

    /// Answer a question about a processed document
    ///
    /// Errors are reserved for caller mistakes and infrastructure failures
    /// (`Validation`, `DocumentNotFound`, `NotProcessed`, `Embedding`,
    /// `Persistence`, ...). A failed language model call yields an
    /// `Ok(ChatReply)` with an unavailable status and appends no turn.
    #[instrument(skip(self, question), fields(question_len = question.len()))]
    pub async fn ask(&self, document_id: Uuid, question: &str) -> Result<ChatReply> {
        let result = self.answer(document_id, question).await;

        let outcome = match &result {
            Ok(reply) if reply.is_answered() => QuestionOutcome::Answered,
            Ok(_) => QuestionOutcome::Degraded,
            Err(e) if e.is_caller_error() => {
                debug!(error = %e, "Question rejected");
                QuestionOutcome::Error
            }
            Err(e) => {
                warn!(error = %e, "Question failed");
                QuestionOutcome::Error
            }
        };
        metrics::record_question(outcome);

        result
    }

    async fn answer(&self, document_id: Uuid, question: &str) -> Result<ChatReply> {
        let question = question.trim();
        if question.is_empty() {
            return Err(AppError::Validation {
                message: "question must not be empty".to_string(),
                field: Some("question".to_string()),
            });
        }

        let document = self.document(document_id).await?;
        if !document.processed {
            return Err(AppError::NotProcessed {
                document_id: document_id.to_string(),
            });
        }

        let session = self.sessions.get_or_create(document_id).await?;

        // Held until the turn is appended: one question per document at a time
        let mut history = session.lock_history().await;

        let index = match session.index().await {
            Some(index) => index,
            None => self.rebuild_index(&document, &session).await?,
        };

        // The standalone form drives retrieval and the answer; the log keeps the question as asked
        let standalone = if self.condense_question {
            self.generator.condense(&history, question).await
        } else {
            question.to_string()
        };

        let sources = self
            .retriever
            .retrieve(&document, Some(index.as_ref()), &standalone)
            .await?;

        match self.generator.generate(&sources, &history, &standalone).await {
            Ok(answer) => {
                let turn = self.repository.append_turn(document_id, question, &answer).await?;
                let reply = ChatReply::answered(answer, turn.timestamp, sources);
                history.push(turn);
                Ok(reply)
            }
            Err(AppError::Generation { kind, message }) => {
                warn!(%kind, error = %message, "Language model unavailable, returning degraded reply");
                Ok(ChatReply::unavailable(kind, sources))
            }
            Err(other) => Err(other),
        }
    }

    /// Rebuild a processed document's index from its stored file
    async fn rebuild_index(
        &self,
        document: &Document,
        session: &DocumentSession,
    ) -> Result<Arc<dyn VectorIndex>> {
        info!(document_id = %document.id, "No index in memory, rebuilding from stored file");

        let passages = self
            .processor
            .process_file(document.id, &document.file_path)
            .await?;
        let index = self.indexer.build(&passages).await?;
        session.install_index(Arc::clone(&index)).await;
        Ok(index)
    }

    /// A document's turns in chronological order
    pub async fn turns(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>> {
        self.document(document_id).await?;
        self.repository.list_turns(document_id).await
    }

    /// A document's turns newest first, for display
    pub async fn turns_for_display(&self, document_id: Uuid) -> Result<Vec<ConversationTurn>> {
        let mut turns = self.turns(document_id).await?;
        turns.reverse();
        Ok(turns)
    }
}
