//! Text chunking module
//!
//! Splits page text into overlapping passages for embedding. Windows are
//! measured in characters; consecutive chunks share exactly `chunk_overlap`
//! characters and no chunk exceeds `chunk_size`.

use pdfchat_common::config::RagConfig;
use tracing::debug;

/// Configuration for text chunking
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChunkingConfig {
    /// Maximum chunk size in characters
    pub chunk_size: usize,
    /// Overlap between consecutive chunks in characters
    pub chunk_overlap: usize,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 1000,
            chunk_overlap: 200,
        }
    }
}

impl From<&RagConfig> for ChunkingConfig {
    fn from(rag: &RagConfig) -> Self {
        Self {
            chunk_size: rag.chunk_size,
            chunk_overlap: rag.chunk_overlap,
        }
    }
}

/// A text chunk with its character span in the source text
#[derive(Debug, Clone, PartialEq)]
pub struct TextChunk {
    pub content: String,
    /// Start character position (inclusive)
    pub start_pos: usize,
    /// End character position (exclusive)
    pub end_pos: usize,
}

/// Chunk text with a sliding window
///
/// The window end is pulled back to just after the last whitespace in the
/// final 20% of the window, when that still leaves room for the overlap.
/// The next window starts `chunk_overlap` characters before the previous end.
pub fn chunk_text_with_overlap(text: &str, config: &ChunkingConfig) -> Vec<TextChunk> {
    let mut chunks = Vec::new();
    let chars: Vec<char> = text.chars().collect();
    let total_len = chars.len();

    if total_len == 0 || config.chunk_size == 0 {
        return chunks;
    }

    // Overlap must leave at least one new character per window
    let overlap = config.chunk_overlap.min(config.chunk_size - 1);
    let mut start = 0;

    loop {
        let mut end = (start + config.chunk_size).min(total_len);

        if end < total_len {
            let lower = (start + config.chunk_size * 4 / 5).max(start + overlap + 1);
            if let Some(cut) = find_word_boundary(&chars, lower, end) {
                end = cut;
            }
        }

        chunks.push(TextChunk {
            content: chars[start..end].iter().collect(),
            start_pos: start,
            end_pos: end,
        });

        if end >= total_len {
            break;
        }

        start = end - overlap;
    }

    debug!(
        input_len = total_len,
        chunk_count = chunks.len(),
        chunk_size = config.chunk_size,
        "Text chunked"
    );

    chunks
}

/// Latest cut position in `lower..end` that directly follows whitespace
fn find_word_boundary(chars: &[char], lower: usize, end: usize) -> Option<usize> {
    if lower >= end {
        return None;
    }
    (lower..end).rev().find(|&cut| chars[cut - 1].is_whitespace())
}
