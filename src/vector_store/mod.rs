//! Opaque ANN/exact nearest-neighbour store over fixed-dimension vectors
//! (spec.md §4.2).
//!
//! Generalizes the teacher's `adapters::providers::vector_store::in_memory`
//! (a Milvus-collection-shaped store keyed by `CodeChunk`) into the flat
//! `upsert`/`query`/`delete`/`count` contract the retrieval core needs,
//! keyed by opaque string ids with an arbitrary JSON payload per vector.

pub mod in_memory;

pub use in_memory::InMemoryVectorStore;

use async_trait::async_trait;
use serde_json::Value;
use thiserror::Error;

/// Vector store failures (spec.md §4.2, §7).
#[derive(Error, Debug)]
pub enum StoreError {
    #[error("vector dimension mismatch: expected {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },

    #[error("invalid id {id:?}: ids must match [A-Za-z0-9_.-]+")]
    InvalidId { id: String },

    #[error("batch size mismatch: {ids} ids, {vectors} vectors, {payloads} payloads")]
    BatchSizeMismatch {
        ids: usize,
        vectors: usize,
        payloads: usize,
    },

    #[error("store connection failed: {0}")]
    Connect(String),

    #[error("store operation failed: {0}")]
    Operation(String),
}

/// One hit from `VectorStore::query`.
#[derive(Debug, Clone)]
pub struct VectorMatch {
    pub id: String,
    pub score: f32,
    pub payload: Value,
}

/// Fixed-dimension nearest-neighbour store over opaque string keys.
///
/// Implementations MUST reject vectors whose length doesn't match the
/// store's declared dimension, MUST apply an `upsert` batch atomically (all
/// ids land or none do), and MUST break score ties in `query` by id
/// ascending.
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Insert or replace vectors by id. `ids.len()`, `vectors.len()`, and
    /// `payloads.len()` must match; the whole batch succeeds or fails
    /// together.
    async fn upsert(
        &self,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<Value>,
    ) -> Result<(), StoreError>;

    /// Cosine-similarity nearest neighbours, descending score, ties by id
    /// ascending, truncated to `k`.
    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>, StoreError>;

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    async fn close(&self) -> Result<(), StoreError>;

    fn dimension(&self) -> usize;
}

/// `[A-Za-z0-9_\-\.]+`, checked without pulling in `regex` for a fixed
/// character class.
pub(crate) fn valid_id(id: &str) -> bool {
    !id.is_empty()
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '.')
}

pub(crate) fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        0.0
    } else {
        dot / (norm_a * norm_b)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn id_validation() {
        assert!(valid_id("chunk_1.rs-a"));
        assert!(!valid_id("has space"));
        assert!(!valid_id(""));
        assert!(!valid_id("has/slash"));
    }

    #[test]
    fn cosine_of_identical_vectors_is_one() {
        let v = vec![1.0, 2.0, 3.0];
        assert!((cosine_similarity(&v, &v) - 1.0).abs() < 1e-6);
    }

    #[test]
    fn cosine_of_orthogonal_vectors_is_zero() {
        assert!((cosine_similarity(&[1.0, 0.0], &[0.0, 1.0])).abs() < 1e-6);
    }
}
