//! In-memory `VectorStore`: exact cosine-similarity scan, guarded by the
//! same single-writer/multiple-reader discipline the BM25 index uses.
//!
//! Grounded in the teacher's
//! `adapters::providers::vector_store::in_memory::InMemoryVectorStore`,
//! which held `Vec<(CodeChunk, Embedding)>` behind a mutex and did a linear
//! scan; this version keys by opaque id + JSON payload per spec.md §4.2 and
//! enforces the dimension/id-format/atomic-batch contract explicitly.

use super::{cosine_similarity, valid_id, StoreError, VectorMatch, VectorStore};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tokio::sync::RwLock;

struct Entry {
    vector: Vec<f32>,
    payload: Value,
}

pub struct InMemoryVectorStore {
    dimension: usize,
    entries: RwLock<HashMap<String, Entry>>,
}

impl InMemoryVectorStore {
    pub fn new(dimension: usize) -> Self {
        Self {
            dimension,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn upsert(
        &self,
        ids: Vec<String>,
        vectors: Vec<Vec<f32>>,
        payloads: Vec<Value>,
    ) -> Result<(), StoreError> {
        if ids.len() != vectors.len() || ids.len() != payloads.len() {
            return Err(StoreError::BatchSizeMismatch {
                ids: ids.len(),
                vectors: vectors.len(),
                payloads: payloads.len(),
            });
        }
        for id in &ids {
            if !valid_id(id) {
                return Err(StoreError::InvalidId { id: id.clone() });
            }
        }
        for vector in &vectors {
            if vector.len() != self.dimension {
                return Err(StoreError::DimensionMismatch {
                    expected: self.dimension,
                    actual: vector.len(),
                });
            }
        }

        // Validated above; now commit the whole batch atomically under one
        // write lock so a mid-batch failure can never be observed.
        let mut entries = self.entries.write().await;
        for ((id, vector), payload) in ids.into_iter().zip(vectors).zip(payloads) {
            entries.insert(id, Entry { vector, payload });
        }
        Ok(())
    }

    async fn query(&self, vector: &[f32], k: usize) -> Result<Vec<VectorMatch>, StoreError> {
        if vector.len() != self.dimension {
            return Err(StoreError::DimensionMismatch {
                expected: self.dimension,
                actual: vector.len(),
            });
        }
        let entries = self.entries.read().await;
        let mut scored: Vec<VectorMatch> = entries
            .iter()
            .map(|(id, entry)| VectorMatch {
                id: id.clone(),
                score: cosine_similarity(vector, &entry.vector),
                payload: entry.payload.clone(),
            })
            .collect();

        scored.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        scored.truncate(k);
        Ok(scored)
    }

    async fn delete(&self, ids: &[String]) -> Result<(), StoreError> {
        let mut entries = self.entries.write().await;
        for id in ids {
            entries.remove(id);
        }
        Ok(())
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.len())
    }

    async fn close(&self) -> Result<(), StoreError> {
        Ok(())
    }

    fn dimension(&self) -> usize {
        self.dimension
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn upsert_then_query_returns_inserted_id() {
        let store = InMemoryVectorStore::new(3);
        store
            .upsert(
                vec!["a".to_string()],
                vec![vec![1.0, 0.0, 0.0]],
                vec![json!({"x": 1})],
            )
            .await
            .unwrap();
        let results = store.query(&[1.0, 0.0, 0.0], 5).await.unwrap();
        assert_eq!(results.len(), 1);
        assert_eq!(results[0].id, "a");
        assert!((results[0].score - 1.0).abs() < 1e-6);
    }

    #[tokio::test]
    async fn dimension_mismatch_rejected() {
        let store = InMemoryVectorStore::new(3);
        let err = store
            .upsert(vec!["a".to_string()], vec![vec![1.0, 0.0]], vec![json!({})])
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::DimensionMismatch { .. }));
    }

    #[tokio::test]
    async fn invalid_id_rejects_whole_batch() {
        let store = InMemoryVectorStore::new(2);
        let err = store
            .upsert(
                vec!["ok".to_string(), "bad id".to_string()],
                vec![vec![1.0, 0.0], vec![0.0, 1.0]],
                vec![json!({}), json!({})],
            )
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::InvalidId { .. }));
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn idempotent_upsert_leaves_count_unchanged() {
        let store = InMemoryVectorStore::new(2);
        for _ in 0..2 {
            store
                .upsert(vec!["a".to_string()], vec![vec![1.0, 0.0]], vec![json!({})])
                .await
                .unwrap();
        }
        assert_eq!(store.count().await.unwrap(), 1);
    }

    #[tokio::test]
    async fn delete_removes_entry() {
        let store = InMemoryVectorStore::new(2);
        store
            .upsert(vec!["a".to_string()], vec![vec![1.0, 0.0]], vec![json!({})])
            .await
            .unwrap();
        store.delete(&["a".to_string()]).await.unwrap();
        assert_eq!(store.count().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn ties_break_by_id_ascending() {
        let store = InMemoryVectorStore::new(2);
        store
            .upsert(
                vec!["b".to_string(), "a".to_string()],
                vec![vec![1.0, 0.0], vec![1.0, 0.0]],
                vec![json!({}), json!({})],
            )
            .await
            .unwrap();
        let results = store.query(&[1.0, 0.0], 2).await.unwrap();
        assert_eq!(results[0].id, "a");
        assert_eq!(results[1].id, "b");
    }
}
