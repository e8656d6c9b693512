//! Index builder
//!
//! Embeds passages in batches and loads them into a fresh vector index.
//! The build is all-or-nothing: any failure discards the partial index.

use pdfchat_common::embeddings::Embedder;
use pdfchat_common::errors::{AppError, Result};
use pdfchat_common::index::{IndexProvider, VectorIndex};
use pdfchat_common::metrics::{self, StageTimer};
use pdfchat_common::models::Passage;
use std::sync::Arc;
use tracing::{debug, info, instrument};

/// Builds per-document vector indices
pub struct IndexBuilder {
    embedder: Arc<dyn Embedder>,
    provider: Arc<dyn IndexProvider>,
    batch_size: usize,
}

impl IndexBuilder {
    pub fn new(embedder: Arc<dyn Embedder>, provider: Arc<dyn IndexProvider>, batch_size: usize) -> Self {
        Self {
            embedder,
            provider,
            batch_size: batch_size.max(1),
        }
    }

    pub fn embedder(&self) -> &Arc<dyn Embedder> {
        &self.embedder
    }

    /// Embed every passage and return the finished index
    #[instrument(skip(self, passages), fields(passage_count = passages.len(), provider = self.provider.name()))]
    pub async fn build(&self, passages: &[Passage]) -> Result<Arc<dyn VectorIndex>> {
        if passages.is_empty() {
            return Err(AppError::Indexing {
                message: "no passages to index".to_string(),
            });
        }

        let dimension = self.embedder.dimension();
        let mut index = self.provider.create(dimension);
        let mut processed = 0;

        // Process passages in batches
        for batch in passages.chunks(self.batch_size) {
            debug!(batch_size = batch.len(), processed, total = passages.len(), "Embedding batch");

            let texts: Vec<String> = batch.iter().map(|p| p.text.clone()).collect();

            let timer = StageTimer::start();
            let result = self.embedder.embed_batch(&texts).await;
            metrics::record_embedding(
                timer.elapsed_secs(),
                self.embedder.model_name(),
                batch.len(),
                result.is_ok(),
            );

            let embeddings = result.map_err(|e| AppError::Indexing {
                message: format!("embedding failed: {}", e),
            })?;

            if embeddings.len() != batch.len() {
                return Err(AppError::Indexing {
                    message: format!(
                        "embedder returned {} vectors for {} passages",
                        embeddings.len(),
                        batch.len()
                    ),
                });
            }

            for (passage, vector) in batch.iter().zip(embeddings) {
                if vector.len() != dimension {
                    return Err(AppError::Indexing {
                        message: format!(
                            "vector for chunk {} has {} dimensions, expected {}",
                            passage.chunk_index,
                            vector.len(),
                            dimension
                        ),
                    });
                }
                index.insert(vector, passage.clone())?;
            }

            processed += batch.len();
        }

        info!(indexed = index.len(), dimension, "Index built");

        Ok(Arc::from(index))
    }
}
