//! PDFChat ingestion
//!
//! Provides:
//! - Per-page PDF text extraction
//! - Sliding-window chunking with exact overlap
//! - Passage production with page attribution
//! - Index building from passages (embed in batches, all-or-nothing)

pub mod chunker;
pub mod errors;
pub mod indexer;
pub mod pdf;
pub mod processor;

pub use chunker::ChunkingConfig;
pub use errors::IngestionError;
pub use indexer::IndexBuilder;
pub use processor::IngestionProcessor;
