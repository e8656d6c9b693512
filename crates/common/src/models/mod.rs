//! Domain models shared across the pipeline
//!
//! These types represent the documents, passages and conversation turns
//! that flow through ingestion, retrieval and generation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use uuid::Uuid;

/// An uploaded PDF and its processing state
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    /// Document ID
    pub id: Uuid,

    /// Human-readable title given at upload
    pub title: String,

    /// Location of the raw PDF
    pub file_path: PathBuf,

    /// Upload timestamp
    pub uploaded_at: DateTime<Utc>,

    /// True once a vector index has been built for this document
    pub processed: bool,
}

/// A contiguous span of extracted text; the retrieval unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Passage {
    /// Owning document
    pub document_id: Uuid,

    /// Position of this passage in the document (0-based, contiguous)
    pub chunk_index: usize,

    /// Page the text was extracted from (1-based)
    pub page_number: u32,

    /// Passage text
    pub text: String,
}

/// A passage paired with its similarity to a query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,

    /// Similarity score, higher is closer
    pub score: f32,
}

/// One question/answer exchange tied to a document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConversationTurn {
    /// Sequence number assigned by the repository; increases with append order
    pub id: i64,

    pub document_id: Uuid,

    pub question: String,

    pub answer: String,

    pub timestamp: DateTime<Utc>,
}

impl ConversationTurn {
    /// The turn as a (question, answer) pair for prompt history
    pub fn as_pair(&self) -> (&str, &str) {
        (&self.question, &self.answer)
    }
}
