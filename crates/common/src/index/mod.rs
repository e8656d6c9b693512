//! Vector similarity index
//!
//! Provides:
//! - The `VectorIndex` trait (insert + top-k query) used by retrieval
//! - `IndexProvider`, the factory the indexer uses to start a fresh index
//! - A brute-force in-memory implementation with cosine or L2 scoring

use crate::errors::{AppError, Result};
use crate::models::{Passage, ScoredPassage};
use serde::{Deserialize, Serialize};

/// Distance metric used to rank passages
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Distance {
    /// Cosine similarity in [-1, 1]
    #[default]
    Cosine,
    /// Euclidean distance, reported as `1 / (1 + d)`
    L2,
}

impl Distance {
    /// Score two vectors of equal length; higher is closer for every metric
    pub fn score(&self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            Distance::Cosine => cosine_similarity(a, b),
            Distance::L2 => {
                let d = a
                    .iter()
                    .zip(b.iter())
                    .map(|(x, y)| (x - y) * (x - y))
                    .sum::<f32>()
                    .sqrt();
                1.0 / (1.0 + d)
            }
        }
    }
}

/// Cosine similarity between two vectors; 0.0 for empty or zero-magnitude input
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() || a.is_empty() {
        return 0.0;
    }
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let mag_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let mag_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if mag_a < f32::EPSILON || mag_b < f32::EPSILON {
        0.0
    } else {
        dot / (mag_a * mag_b)
    }
}

/// A per-document nearest-neighbour index over passage embeddings
pub trait VectorIndex: Send + Sync {
    /// Add one passage with its embedding
    fn insert(&mut self, vector: Vec<f32>, passage: Passage) -> Result<()>;

    /// Return at most `k` passages ordered by descending score,
    /// ties broken by ascending chunk index
    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPassage>>;

    /// Number of stored passages
    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Vector dimensionality accepted by this index
    fn dimension(&self) -> usize;
}

/// Creates empty indices
pub trait IndexProvider: Send + Sync {
    fn create(&self, dimension: usize) -> Box<dyn VectorIndex>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

struct IndexEntry {
    vector: Vec<f32>,
    passage: Passage,
}

/// Brute-force in-memory index
pub struct InMemoryVectorIndex {
    dimension: usize,
    distance: Distance,
    entries: Vec<IndexEntry>,
}

impl InMemoryVectorIndex {
    pub fn new(dimension: usize, distance: Distance) -> Self {
        Self {
            dimension,
            distance,
            entries: Vec::new(),
        }
    }
}

impl VectorIndex for InMemoryVectorIndex {
    fn insert(&mut self, vector: Vec<f32>, passage: Passage) -> Result<()> {
        if vector.len() != self.dimension {
            return Err(AppError::Indexing {
                message: format!(
                    "vector for chunk {} has {} dimensions, index expects {}",
                    passage.chunk_index,
                    vector.len(),
                    self.dimension
                ),
            });
        }
        self.entries.push(IndexEntry { vector, passage });
        Ok(())
    }

    fn query(&self, vector: &[f32], k: usize) -> Result<Vec<ScoredPassage>> {
        if vector.len() != self.dimension {
            return Err(AppError::Embedding {
                message: format!(
                    "query vector has {} dimensions, index expects {}",
                    vector.len(),
                    self.dimension
                ),
            });
        }

        let mut scored: Vec<ScoredPassage> = self
            .entries
            .iter()
            .map(|entry| ScoredPassage {
                passage: entry.passage.clone(),
                score: self.distance.score(vector, &entry.vector),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .total_cmp(&a.score)
                .then_with(|| a.passage.chunk_index.cmp(&b.passage.chunk_index))
        });
        scored.truncate(k);

        Ok(scored)
    }

    fn len(&self) -> usize {
        self.entries.len()
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

/// Provider for [`InMemoryVectorIndex`]
#[derive(Debug, Clone, Default)]
pub struct InMemoryIndexProvider {
    distance: Distance,
}

impl InMemoryIndexProvider {
    pub fn new(distance: Distance) -> Self {
        Self { distance }
    }
}

impl IndexProvider for InMemoryIndexProvider {
    fn create(&self, dimension: usize) -> Box<dyn VectorIndex> {
        Box::new(InMemoryVectorIndex::new(dimension, self.distance))
    }

    fn name(&self) -> &str {
        "in-memory"
    }
}
