//! Ingestion processor
//!
//! Core logic for turning an uploaded PDF into passages: file type check,
//! per-page extraction, and chunking with contiguous chunk indices.

use crate::chunker::{chunk_text_with_overlap, ChunkingConfig};
use crate::errors::IngestionError;
use crate::pdf::extract_pages;
use pdfchat_common::models::Passage;
use std::path::Path;
use tracing::{debug, info, instrument};
use uuid::Uuid;

/// Ingestion processor
#[derive(Debug, Clone, Default)]
pub struct IngestionProcessor {
    chunking_config: ChunkingConfig,
}

impl IngestionProcessor {
    pub fn new(chunking_config: ChunkingConfig) -> Self {
        Self { chunking_config }
    }

    /// Reject anything whose file name does not end in `.pdf` (any case)
    pub fn check_file_type(path: &Path) -> Result<(), IngestionError> {
        let is_pdf = path
            .extension()
            .map(|e| e.eq_ignore_ascii_case("pdf"))
            .unwrap_or(false);

        if is_pdf {
            Ok(())
        } else {
            Err(IngestionError::InvalidFileType {
                path: path.display().to_string(),
            })
        }
    }

    /// Read a PDF from disk and split it into passages
    #[instrument(skip(self), fields(path = %path.display()))]
    pub async fn process_file(
        &self,
        document_id: Uuid,
        path: &Path,
    ) -> Result<Vec<Passage>, IngestionError> {
        Self::check_file_type(path)?;

        let bytes = match tokio::fs::read(path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(IngestionError::FileNotFound(path.display().to_string()));
            }
            Err(e) => return Err(e.into()),
        };

        self.process_bytes(document_id, &bytes, &path.display().to_string())
    }

    /// Split raw PDF bytes into passages
    ///
    /// Fails with `NoExtractableText` when no page yields a passage.
    pub fn process_bytes(
        &self,
        document_id: Uuid,
        bytes: &[u8],
        label: &str,
    ) -> Result<Vec<Passage>, IngestionError> {
        let pages = extract_pages(bytes, label)?;

        let mut passages = Vec::new();
        for page in &pages {
            let chunks = chunk_text_with_overlap(&page.text, &self.chunking_config);
            debug!(page = page.page_number, chunk_count = chunks.len(), "Page chunked");

            for chunk in chunks {
                passages.push(Passage {
                    document_id,
                    chunk_index: passages.len(),
                    page_number: page.page_number,
                    text: chunk.content,
                });
            }
        }

        if passages.is_empty() {
            return Err(IngestionError::NoExtractableText {
                path: label.to_string(),
            });
        }

        info!(
            document_id = %document_id,
            pages_with_text = pages.len(),
            passage_count = passages.len(),
            "PDF split into passages"
        );

        Ok(passages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::build_pdf;
    use pdfchat_common::errors::AppError;
    use tokio_test::{assert_err, block_on};

    #[test]
    fn test_file_type_check() {
        assert!(IngestionProcessor::check_file_type(Path::new("report.pdf")).is_ok());
        assert!(IngestionProcessor::check_file_type(Path::new("REPORT.PDF")).is_ok());
        assert!(matches!(
            IngestionProcessor::check_file_type(Path::new("notes.txt")),
            Err(IngestionError::InvalidFileType { .. })
        ));
        assert!(IngestionProcessor::check_file_type(Path::new("pdf")).is_err());
    }

    #[test]
    fn test_passages_carry_pages_and_contiguous_indices() {
        let long = "Lighthouses guide ships along the rocky northern coast. ".repeat(40);
        let pdf = build_pdf(&[&long, "The second page mentions harbour fees.", &long]);
        let doc_id = Uuid::new_v4();

        let processor = IngestionProcessor::new(ChunkingConfig { chunk_size: 500, chunk_overlap: 100 });
        let passages = processor.process_bytes(doc_id, &pdf, "coast.pdf").unwrap();

        assert!(passages.len() > 3);
        for (i, passage) in passages.iter().enumerate() {
            assert_eq!(passage.chunk_index, i);
            assert_eq!(passage.document_id, doc_id);
            assert!(passage.text.chars().count() <= 500);
        }
        assert!(passages.iter().any(|p| p.page_number == 2 && p.text.contains("harbour")));
        let pages: Vec<u32> = passages.iter().map(|p| p.page_number).collect();
        assert!(pages.windows(2).all(|w| w[0] <= w[1]));
    }

    #[test]
    fn test_no_text_is_error() {
        let pdf = build_pdf(&["", ""]);
        let err = IngestionProcessor::default()
            .process_bytes(Uuid::new_v4(), &pdf, "empty.pdf")
            .unwrap_err();
        assert!(matches!(err, IngestionError::NoExtractableText { .. }));

        let app: AppError = err.into();
        assert!(matches!(app, AppError::Ingestion { .. }));
    }

    #[tokio::test]
    async fn test_process_file_from_disk() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fact.pdf");
        std::fs::write(&path, build_pdf(&["The capital of Zorblax is Quenton."])).unwrap();

        let passages = IngestionProcessor::default()
            .process_file(Uuid::new_v4(), &path)
            .await
            .unwrap();
        assert_eq!(passages.len(), 1);
        assert!(passages[0].text.contains("Quenton"));
    }

    #[test]
    fn test_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let err = assert_err!(block_on(
            IngestionProcessor::default().process_file(Uuid::new_v4(), &dir.path().join("missing.pdf")),
        ));
        assert!(matches!(err, IngestionError::FileNotFound(_)));
    }
}
