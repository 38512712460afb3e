//! Deterministic embedding provider with no network dependency.
//!
//! Grounded in the teacher's `adapters::providers::embedding::null`, used the
//! same way here: tests and offline benchmark runs that need a stable
//! `EmbeddingProvider` without a live backend.

use super::{EmbedError, EmbeddingProvider};
use async_trait::async_trait;

/// Produces a deterministic vector per input text by hashing it, so the same
/// text always embeds to the same vector and distinct texts embed to
/// distinct vectors (not semantically meaningful, just stable).
pub struct NullEmbeddingProvider {
    dimensions: usize,
}

impl NullEmbeddingProvider {
    pub fn new(dimensions: usize) -> Self {
        Self { dimensions }
    }

    fn hash_vector(&self, text: &str) -> Vec<f32> {
        let mut state: u64 = 1469598103934665603; // FNV offset basis
        for byte in text.bytes() {
            state ^= u64::from(byte);
            state = state.wrapping_mul(1099511628211);
        }
        (0..self.dimensions)
            .map(|i| {
                state = state.wrapping_mul(6364136223846793005).wrapping_add(i as u64);
                ((state >> 33) as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for NullEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        Ok(texts.iter().map(|t| self.hash_vector(t)).collect())
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn provider_name(&self) -> &str {
        "null"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn deterministic_across_calls() {
        let provider = NullEmbeddingProvider::new(8);
        let a = provider.embed(&["hello".to_string()]).await.unwrap();
        let b = provider.embed(&["hello".to_string()]).await.unwrap();
        assert_eq!(a, b);
        assert_eq!(a[0].len(), 8);
    }

    #[tokio::test]
    async fn distinct_texts_differ() {
        let provider = NullEmbeddingProvider::new(8);
        let out = provider
            .embed(&["hello".to_string(), "world".to_string()])
            .await
            .unwrap();
        assert_ne!(out[0], out[1]);
    }

    #[tokio::test]
    async fn empty_input_returns_empty() {
        let provider = NullEmbeddingProvider::new(8);
        assert!(provider.embed(&[]).await.unwrap().is_empty());
    }
}
