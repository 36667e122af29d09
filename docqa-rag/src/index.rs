//! Exact similarity index over chunk embeddings.
//!
//! [`DocumentIndex`] holds one vector per [`Chunk`] and scores every vector
//! against the query on search. It is built once and never mutated; a new
//! set of files means a new index.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::document::{Chunk, SearchResult};
use crate::embedding::EmbeddingConfig;
use crate::error::{RagError, Result};

/// How vectors are compared. Scores are always "higher is closer".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistanceMetric {
    /// Cosine similarity in `[-1, 1]`.
    #[default]
    Cosine,
    /// Euclidean distance mapped to `1 / (1 + d)`, in `(0, 1]`.
    L2,
}

impl DistanceMetric {
    /// Similarity between two vectors of equal length.
    pub fn score(self, a: &[f32], b: &[f32]) -> f32 {
        match self {
            DistanceMetric::Cosine => cosine_similarity(a, b),
            DistanceMetric::L2 => {
                let distance: f32 =
                    a.iter().zip(b.iter()).map(|(x, y)| (x - y) * (x - y)).sum::<f32>().sqrt();
                1.0 / (1.0 + distance)
            }
        }
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// An immutable collection of chunks and their embeddings.
///
/// `vectors[i]` is the embedding of `chunks[i]`. All vectors share one
/// dimension, and the [`EmbeddingConfig`] they were produced with travels
/// with the index so queries can be checked against it.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{DistanceMetric, DocumentIndex, EmbeddingConfig};
///
/// let index = DocumentIndex::build(EmbeddingConfig::default(), DistanceMetric::Cosine, chunks, vectors)?;
/// let results = index.search(&query_vector, 4)?;
/// ```
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentIndex {
    embedding: EmbeddingConfig,
    metric: DistanceMetric,
    dimensions: usize,
    chunks: Vec<Chunk>,
    vectors: Vec<Vec<f32>>,
}

impl DocumentIndex {
    /// Build an index from chunks and their vectors, position by position.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if there are no chunks, if the
    /// number of vectors differs from the number of chunks, or if the
    /// vectors do not all share one non-zero dimension.
    pub fn build(
        embedding: EmbeddingConfig,
        metric: DistanceMetric,
        chunks: Vec<Chunk>,
        vectors: Vec<Vec<f32>>,
    ) -> Result<Self> {
        if chunks.is_empty() {
            return Err(RagError::IndexError("cannot build an index without chunks".to_string()));
        }
        if chunks.len() != vectors.len() {
            return Err(RagError::IndexError(format!(
                "{} chunks but {} vectors",
                chunks.len(),
                vectors.len()
            )));
        }

        let dimensions = vectors[0].len();
        if dimensions == 0 {
            return Err(RagError::IndexError("embedding vectors are empty".to_string()));
        }
        if let Some(position) = vectors.iter().position(|v| v.len() != dimensions) {
            return Err(RagError::IndexError(format!(
                "vector {position} has dimension {}, expected {dimensions}",
                vectors[position].len()
            )));
        }

        debug!(chunk_count = chunks.len(), dimensions, ?metric, "built document index");
        Ok(Self { embedding, metric, dimensions, chunks, vectors })
    }

    /// Return the `top_k` chunks closest to `query`, best first.
    ///
    /// Equal scores keep index order.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::IndexError`] if the query dimension differs from
    /// the index dimension.
    pub fn search(&self, query: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        if query.len() != self.dimensions {
            return Err(RagError::IndexError(format!(
                "query has dimension {}, index expects {}",
                query.len(),
                self.dimensions
            )));
        }

        let mut scored: Vec<SearchResult> = self
            .chunks
            .iter()
            .zip(self.vectors.iter())
            .map(|(chunk, vector)| SearchResult {
                chunk: chunk.clone(),
                score: self.metric.score(vector, query),
            })
            .collect();

        scored.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_k);
        Ok(scored)
    }

    pub fn embedding_config(&self) -> &EmbeddingConfig {
        &self.embedding
    }

    pub fn metric(&self) -> DistanceMetric {
        self.metric
    }

    pub fn dimensions(&self) -> usize {
        self.dimensions
    }

    pub fn len(&self) -> usize {
        self.chunks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.chunks.is_empty()
    }

    pub fn chunks(&self) -> &[Chunk] {
        &self.chunks
    }

    pub fn vectors(&self) -> &[Vec<f32>] {
        &self.vectors
    }

    /// Fail with [`RagError::ConfigMismatch`] unless `expected` equals the
    /// configuration this index was built with.
    pub fn ensure_compatible(&self, expected: &EmbeddingConfig) -> Result<()> {
        if &self.embedding != expected {
            return Err(RagError::ConfigMismatch {
                expected: expected.to_string(),
                found: self.embedding.to_string(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn chunk(id: &str) -> Chunk {
        Chunk {
            id: id.to_string(),
            text: id.to_string(),
            metadata: HashMap::new(),
            document_id: "doc".to_string(),
        }
    }

    fn index(vectors: Vec<Vec<f32>>, metric: DistanceMetric) -> DocumentIndex {
        let chunks = (0..vectors.len()).map(|i| chunk(&format!("c{i}"))).collect();
        DocumentIndex::build(EmbeddingConfig::default(), metric, chunks, vectors).unwrap()
    }

    #[test]
    fn cosine_ranks_closest_first_and_truncates() {
        let index = index(
            vec![vec![0.0, 1.0], vec![1.0, 0.0], vec![0.7, 0.7]],
            DistanceMetric::Cosine,
        );
        let results = index.search(&[1.0, 0.0], 2).unwrap();
        let ids: Vec<&str> = results.iter().map(|r| r.chunk.id.as_str()).collect();
        assert_eq!(ids, vec!["c1", "c2"]);
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[test]
    fn l2_scores_identical_vectors_as_one() {
        let index = index(vec![vec![3.0, 4.0], vec![0.0, 0.0]], DistanceMetric::L2);
        let results = index.search(&[3.0, 4.0], 2).unwrap();
        assert_eq!(results[0].chunk.id, "c0");
        assert!((results[0].score - 1.0).abs() < 1e-6);
        assert!((results[1].score - 1.0 / 6.0).abs() < 1e-6);
    }

    #[test]
    fn ties_keep_insertion_order() {
        let index = index(vec![vec![1.0, 0.0], vec![1.0, 0.0], vec![1.0, 0.0]], DistanceMetric::Cosine);
        let ids: Vec<String> =
            index.search(&[1.0, 0.0], 3).unwrap().into_iter().map(|r| r.chunk.id).collect();
        assert_eq!(ids, vec!["c0", "c1", "c2"]);
    }

    #[test]
    fn rejects_mismatched_dimensions() {
        let err = DocumentIndex::build(
            EmbeddingConfig::default(),
            DistanceMetric::Cosine,
            vec![chunk("a"), chunk("b")],
            vec![vec![1.0, 0.0], vec![1.0]],
        )
        .unwrap_err();
        assert!(matches!(err, RagError::IndexError(_)));

        let index = index(vec![vec![1.0, 0.0]], DistanceMetric::Cosine);
        assert!(index.search(&[1.0, 0.0, 0.0], 1).is_err());
    }

    #[test]
    fn rejects_empty_and_uneven_input() {
        assert!(
            DocumentIndex::build(EmbeddingConfig::default(), DistanceMetric::Cosine, vec![], vec![])
                .is_err()
        );
        assert!(
            DocumentIndex::build(
                EmbeddingConfig::default(),
                DistanceMetric::Cosine,
                vec![chunk("a")],
                vec![]
            )
            .is_err()
        );
    }

    #[test]
    fn compatibility_check_compares_whole_config() {
        let index = index(vec![vec![1.0]], DistanceMetric::Cosine);
        assert!(index.ensure_compatible(&EmbeddingConfig::default()).is_ok());

        let swapped = EmbeddingConfig {
            document_prefix: EmbeddingConfig::default().query_prefix,
            ..EmbeddingConfig::default()
        };
        assert!(matches!(index.ensure_compatible(&swapped), Err(RagError::ConfigMismatch { .. })));
    }
}
