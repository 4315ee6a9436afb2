//! In-memory vector index with cosine similarity search.
//!
//! The index owns the embedded chunks of exactly one pipeline run. Search is
//! a brute-force linear scan: the corpus is one document's chunks (hundreds
//! at most), where an exact, deterministic ranking is worth more than
//! sub-linear scaling.

use super::types::{Chunk, RetrievalResult};
use std::cmp::Ordering;
use std::sync::{Arc, RwLock};
use thiserror::Error;

/// Errors that can occur when inserting into the index.
#[derive(Debug, Error)]
pub enum IndexError {
    /// The vector's length does not match the dimension established by the
    /// first insertion. This indicates an embedding-model/config
    /// inconsistency and is fatal for the run.
    #[error("embedding dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    /// An empty vector was offered. A zero-length embedding would score 0
    /// against every query and corrupt the ranking.
    #[error("refusing to index an empty embedding")]
    EmptyEmbedding,
}

pub type Result<T> = std::result::Result<T, IndexError>;

/// An in-memory vector index over embedded chunks.
///
/// The index is cheap to clone (`Arc` inside) and thread-safe: insertions
/// serialize through a write lock, queries share a read lock and may run
/// concurrently once the build is complete. Every stored chunk is guaranteed
/// to carry an embedding of the index's dimension, which is fixed by the
/// first insertion.
///
/// # Example
///
/// ```no_run
/// use askdoc_core::{Chunk, VectorIndex};
/// use std::collections::HashMap;
///
/// let index = VectorIndex::new();
/// let chunk = Chunk::new(0, "Hello world", HashMap::new());
/// index.insert(chunk, vec![0.1, 0.2, 0.3]).unwrap();
///
/// let results = index.query(&[0.1, 0.2, 0.3], 5);
/// assert_eq!(results.len(), 1);
/// ```
#[derive(Clone, Default)]
pub struct VectorIndex {
    inner: Arc<RwLock<IndexInner>>,
}

#[derive(Default)]
struct IndexInner {
    chunks: Vec<Chunk>,
    dimension: Option<usize>,
}

impl std::fmt::Debug for VectorIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("VectorIndex")
            .field("count", &self.count())
            .field("dimension", &self.dimension())
            .finish()
    }
}

impl VectorIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Inserts a chunk with its embedding.
    ///
    /// The first insertion establishes the index's dimension; every later
    /// insertion must match it. A failed insertion leaves the index's prior
    /// contents untouched.
    ///
    /// # Errors
    ///
    /// [`IndexError::EmptyEmbedding`] for a zero-length vector,
    /// [`IndexError::DimensionMismatch`] for a wrong-length one.
    pub fn insert(&self, mut chunk: Chunk, embedding: Vec<f32>) -> Result<()> {
        if embedding.is_empty() {
            return Err(IndexError::EmptyEmbedding);
        }

        let mut inner = self.inner.write().unwrap();
        if let Some(expected) = inner.dimension {
            if embedding.len() != expected {
                return Err(IndexError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        } else {
            inner.dimension = Some(embedding.len());
        }

        chunk.embedding = Some(embedding);
        inner.chunks.push(chunk);
        Ok(())
    }

    /// Returns the `k` chunks most similar to the query vector.
    ///
    /// Scores every stored chunk with cosine similarity and returns the
    /// top `k` in descending score order; equal scores are ordered by
    /// ascending chunk id so the ranking is deterministic. If fewer than
    /// `k` chunks are stored, all of them are returned.
    pub fn query(&self, vector: &[f32], k: usize) -> Vec<RetrievalResult> {
        let inner = self.inner.read().unwrap();

        let mut results: Vec<RetrievalResult> = inner
            .chunks
            .iter()
            .map(|chunk| {
                let embedding = chunk.embedding.as_deref().unwrap_or_default();
                RetrievalResult {
                    chunk: chunk.clone(),
                    score: cosine_similarity(vector, embedding),
                }
            })
            .collect();

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(Ordering::Equal)
                .then(a.chunk.id.cmp(&b.chunk.id))
        });

        results.truncate(k);
        results
    }

    /// Number of chunks stored.
    pub fn count(&self) -> usize {
        self.inner.read().unwrap().chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// The embedding dimension established by the first insertion, if any.
    pub fn dimension(&self) -> Option<usize> {
        self.inner.read().unwrap().dimension
    }
}

/// Computes cosine similarity between two vectors.
///
/// Returns values from -1.0 (opposite) to 1.0 (identical), with 0.0 for
/// orthogonal vectors, mismatched lengths, or zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    if a.len() != b.len() {
        return 0.0;
    }

    let dot_product: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let magnitude_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let magnitude_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();

    if magnitude_a == 0.0 || magnitude_b == 0.0 {
        return 0.0;
    }

    dot_product / (magnitude_a * magnitude_b)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn chunk(id: usize, text: &str) -> Chunk {
        Chunk::new(id, text, HashMap::new())
    }

    #[test]
    fn test_cosine_similarity() {
        let a = vec![1.0, 0.0, 0.0];
        let b = vec![1.0, 0.0, 0.0];
        assert_eq!(cosine_similarity(&a, &b), 1.0);

        let a = vec![1.0, 0.0];
        let b = vec![0.0, 1.0];
        assert_eq!(cosine_similarity(&a, &b), 0.0);
    }

    #[test]
    fn test_cosine_similarity_zero_magnitude() {
        assert_eq!(cosine_similarity(&[0.0, 0.0], &[1.0, 1.0]), 0.0);
    }

    #[test]
    fn test_insert_and_query() {
        let index = VectorIndex::new();
        index.insert(chunk(0, "test"), vec![1.0, 0.0, 0.0]).unwrap();

        assert_eq!(index.count(), 1);
        assert_eq!(index.dimension(), Some(3));

        let results = index.query(&[1.0, 0.0, 0.0], 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].score, 1.0);
    }

    #[test]
    fn test_query_orders_by_descending_score() {
        let index = VectorIndex::new();
        index.insert(chunk(0, "dogs"), vec![0.0, 1.0, 0.0]).unwrap();
        index.insert(chunk(1, "cats"), vec![1.0, 0.0, 0.0]).unwrap();
        index
            .insert(chunk(2, "kittens"), vec![0.9, 0.1, 0.0])
            .unwrap();

        let results = index.query(&[1.0, 0.0, 0.0], 3);
        let ids: Vec<usize> = results.iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids, vec![1, 2, 0]);
        assert!(results.windows(2).all(|w| w[0].score >= w[1].score));
    }

    #[test]
    fn test_equal_scores_break_ties_by_ascending_id() {
        let index = VectorIndex::new();
        // Insert out of id order so ordering cannot come from insertion.
        index.insert(chunk(2, "c"), vec![1.0, 0.0]).unwrap();
        index.insert(chunk(0, "a"), vec![1.0, 0.0]).unwrap();
        index.insert(chunk(1, "b"), vec![1.0, 0.0]).unwrap();

        let results = index.query(&[1.0, 0.0], 3);
        let ids: Vec<usize> = results.iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids, vec![0, 1, 2]);
    }

    #[test]
    fn test_query_returns_min_of_k_and_count() {
        let index = VectorIndex::new();
        for id in 0..3 {
            index.insert(chunk(id, "text"), vec![1.0, 0.0]).unwrap();
        }

        assert_eq!(index.query(&[1.0, 0.0], 2).len(), 2);
        assert_eq!(index.query(&[1.0, 0.0], 10).len(), 3);
    }

    #[test]
    fn test_query_on_empty_index_returns_nothing() {
        let index = VectorIndex::new();
        assert!(index.query(&[1.0, 0.0], 5).is_empty());
    }

    #[test]
    fn test_dimension_mismatch_rejected_and_contents_unchanged() {
        let index = VectorIndex::new();
        index.insert(chunk(0, "a"), vec![1.0, 0.0, 0.0]).unwrap();

        let err = index.insert(chunk(1, "b"), vec![1.0, 0.0]).unwrap_err();
        assert!(matches!(
            err,
            IndexError::DimensionMismatch {
                expected: 3,
                actual: 2
            }
        ));

        assert_eq!(index.count(), 1);
        assert_eq!(index.dimension(), Some(3));
        let results = index.query(&[1.0, 0.0, 0.0], 5);
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].chunk.id, 0);
    }

    #[test]
    fn test_empty_embedding_rejected() {
        let index = VectorIndex::new();
        let err = index.insert(chunk(0, "a"), vec![]).unwrap_err();
        assert!(matches!(err, IndexError::EmptyEmbedding));
        assert!(index.is_empty());
    }
}
