//! Ingestion error types

use pdfchat_common::errors::AppError;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum IngestionError {
    #[error("Invalid file type for {path}: only .pdf files are accepted")]
    InvalidFileType { path: String },

    #[error("Invalid PDF {path}: {message}")]
    InvalidPdf { path: String, message: String },

    #[error("No extractable text in {path}")]
    NoExtractableText { path: String },

    #[error("File not found: {0}")]
    FileNotFound(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<IngestionError> for AppError {
    fn from(e: IngestionError) -> Self {
        AppError::Ingestion {
            message: e.to_string(),
        }
    }
}
