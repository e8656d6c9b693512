//! Passage retrieval
//!
//! Embeds a question and fetches the top-K passages from a document's index.

use pdfchat_common::embeddings::Embedder;
use pdfchat_common::errors::{AppError, Result};
use pdfchat_common::index::VectorIndex;
use pdfchat_common::metrics::{self, StageTimer};
use pdfchat_common::models::{Document, ScoredPassage};
use std::sync::Arc;
use tracing::{debug, instrument};

/// Top-K retriever over per-document indices
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    top_k: usize,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, top_k: usize) -> Self {
        Self { embedder, top_k }
    }

    /// Retrieve passages for `question`
    ///
    /// Fails with `NotProcessed` if the document has no index yet and with
    /// `Embedding` if the question cannot be embedded.
    #[instrument(skip(self, document, index, question), fields(document_id = %document.id, top_k = self.top_k))]
    pub async fn retrieve(
        &self,
        document: &Document,
        index: Option<&dyn VectorIndex>,
        question: &str,
    ) -> Result<Vec<ScoredPassage>> {
        let index = match index {
            Some(index) if document.processed => index,
            _ => {
                return Err(AppError::NotProcessed {
                    document_id: document.id.to_string(),
                })
            }
        };

        let timer = StageTimer::start();
        let result = self.embedder.embed(question).await;
        metrics::record_embedding(timer.elapsed_secs(), self.embedder.model_name(), 1, result.is_ok());

        let vector = result.map_err(|e| match e {
            AppError::Embedding { .. } => e,
            other => AppError::Embedding {
                message: other.to_string(),
            },
        })?;

        let passages = index.query(&vector, self.top_k)?;

        debug!(
            retrieved = passages.len(),
            best_score = passages.first().map(|p| p.score).unwrap_or_default(),
            "Passages retrieved"
        );

        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use pdfchat_common::embeddings::HashEmbedder;
    use pdfchat_common::index::{Distance, InMemoryVectorIndex};
    use pdfchat_common::models::Passage;
    use std::path::PathBuf;
    use uuid::Uuid;

    fn document(processed: bool) -> Document {
        Document {
            id: Uuid::new_v4(),
            title: "Facts".into(),
            file_path: PathBuf::from("facts.pdf"),
            uploaded_at: Utc::now(),
            processed,
        }
    }

    async fn index_for(doc: &Document, embedder: &HashEmbedder, texts: &[&str]) -> InMemoryVectorIndex {
        let mut index = InMemoryVectorIndex::new(embedder.dimension(), Distance::Cosine);
        for (i, text) in texts.iter().enumerate() {
            let passage = Passage {
                document_id: doc.id,
                chunk_index: i,
                page_number: i as u32 + 1,
                text: text.to_string(),
            };
            index.insert(embedder.embed(text).await.unwrap(), passage).unwrap();
        }
        index
    }

    #[tokio::test]
    async fn test_unprocessed_document_rejected() {
        let embedder = Arc::new(HashEmbedder::new("m", 64));
        let retriever = Retriever::new(embedder.clone(), 4);
        let doc = document(false);
        let index = index_for(&doc, &embedder, &["anything"]).await;

        let err = retriever.retrieve(&doc, Some(&index as &dyn VectorIndex), "question").await.unwrap_err();
        assert!(matches!(err, AppError::NotProcessed { .. }));

        let err = retriever.retrieve(&document(true), None, "question").await.unwrap_err();
        assert!(matches!(err, AppError::NotProcessed { .. }));
    }

    #[tokio::test]
    async fn test_top_k_limits_and_orders() {
        let embedder = Arc::new(HashEmbedder::new("m", 256));
        let doc = document(true);
        let index = index_for(
            &doc,
            &embedder,
            &[
                "Quarterly revenue grew in March.",
                "The lighthouse is painted red.",
                "Harbour fees are paid monthly.",
            ],
        )
        .await;

        let retriever = Retriever::new(embedder, 2);
        let results = retriever
            .retrieve(&doc, Some(&index as &dyn VectorIndex), "what colour is the lighthouse painted")
            .await
            .unwrap();
        assert_eq!(results.len(), 2);
        assert_eq!(results[0].passage.page_number, 2);
        assert!(results[0].score >= results[1].score);
    }
}
