//! Batched text -> vector embedding (spec.md §4.3).
//!
//! Generalizes the teacher's `domain::ports::embedding::EmbeddingProvider` —
//! a Milvus/collection-shaped trait with a default single-item `embed()`
//! delegating to `embed_batch()` — into the flat contract the retrieval core
//! needs: `embed(texts) -> vectors`, fixed `dimensions()`, and a declared
//! `max_batch_size()`. Concrete providers are grounded in the teacher's
//! `adapters::providers::embedding::{ollama,openai,voyageai,gemini}`, reshaped
//! onto the `native-local` / `openai-compatible` / `cloud-a` / `cloud-b`
//! vocabulary `domain::types::EmbeddingProviderKind` already uses.

pub mod cloud;
pub mod native_local;
pub mod null;
pub mod openai_compatible;

pub use cloud::{CloudAEmbeddingProvider, CloudBEmbeddingProvider};
pub use native_local::NativeLocalEmbeddingProvider;
pub use null::NullEmbeddingProvider;
pub use openai_compatible::OpenAiCompatibleEmbeddingProvider;

use async_trait::async_trait;
use thiserror::Error;

/// Embedding backend failures (spec.md §4.3, §7).
#[derive(Error, Debug)]
pub enum EmbedError {
    #[error("connection refused: {host}")]
    ConnectionRefused { host: String },

    #[error("request to {host} timed out after {timeout_ms}ms")]
    Timeout { host: String, timeout_ms: u64 },

    #[error("embedding backend returned HTTP {status}: {message}")]
    Status { status: u16, message: String },

    #[error("malformed embedding response: {0}")]
    Malformed(String),

    #[error("embedding request failed: {0}")]
    Request(String),
}

/// Batched text -> vector mapping with a declared fixed dimension.
///
/// Implementations MUST preserve input order in the output, MUST split
/// inputs larger than `max_batch_size()` into multiple backend requests, and
/// MUST fail fast: the first failing batch aborts the remaining ones with no
/// partial result returned. An empty input returns an empty result with no
/// network call.
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Embed a batch of texts, one vector per input, same order as input.
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError>;

    /// Fixed output dimensionality for every vector this provider returns.
    fn dimensions(&self) -> usize;

    /// Maximum number of texts sent to the backend in a single request.
    fn max_batch_size(&self) -> usize {
        crate::infrastructure::constants::EMBEDDING_DEFAULT_MAX_BATCH_SIZE
    }

    fn provider_name(&self) -> &str;
}

/// Splits `texts` into chunks of at most `batch_size`, invoking `send_batch`
/// for each in order and failing fast on the first error. Each batch's
/// response is validated to carry exactly as many vectors as it was sent
/// texts, regardless of any provider-side reordering `send_batch` already
/// resolved internally (e.g. by a response `index` field).
pub(crate) async fn embed_in_batches<F, Fut>(
    texts: &[String],
    batch_size: usize,
    mut send_batch: F,
) -> Result<Vec<Vec<f32>>, EmbedError>
where
    F: FnMut(Vec<String>) -> Fut,
    Fut: std::future::Future<Output = Result<Vec<Vec<f32>>, EmbedError>>,
{
    if texts.is_empty() {
        return Ok(Vec::new());
    }
    let batch_size = batch_size.max(1);
    let mut out = Vec::with_capacity(texts.len());
    for chunk in texts.chunks(batch_size) {
        let vectors = send_batch(chunk.to_vec()).await?;
        if vectors.len() != chunk.len() {
            return Err(EmbedError::Malformed(format!(
                "expected {} vectors for batch, backend returned {}",
                chunk.len(),
                vectors.len()
            )));
        }
        out.extend(vectors);
    }
    Ok(out)
}

/// Classifies a `reqwest::Error` into the connection/timeout buckets spec.md
/// §4.3 names, carrying the target host in the message.
pub(crate) fn classify_reqwest_error(err: &reqwest::Error, host: &str, timeout_ms: u64) -> EmbedError {
    if err.is_timeout() {
        EmbedError::Timeout {
            host: host.to_string(),
            timeout_ms,
        }
    } else if err.is_connect() {
        EmbedError::ConnectionRefused {
            host: host.to_string(),
        }
    } else {
        EmbedError::Request(err.to_string())
    }
}

/// Reads a non-2xx `reqwest::Response` into a `Status` error, preferring a
/// server-provided JSON `message`/`error` field when decodable.
pub(crate) async fn status_error(response: reqwest::Response) -> EmbedError {
    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();
    let message = serde_json::from_str::<serde_json::Value>(&body)
        .ok()
        .and_then(|v| {
            v.get("message")
                .or_else(|| v.get("error"))
                .and_then(|m| m.as_str().map(str::to_string))
        })
        .unwrap_or(body);
    EmbedError::Status { status, message }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn empty_input_short_circuits() {
        let mut calls = 0;
        let result = embed_in_batches(&[], 10, |_batch| {
            calls += 1;
            async move { Ok(vec![]) }
        })
        .await
        .unwrap();
        assert!(result.is_empty());
        assert_eq!(calls, 0);
    }

    #[tokio::test]
    async fn splits_into_batches_of_max_size() {
        let texts: Vec<String> = (0..5).map(|i| i.to_string()).collect();
        let mut seen_batch_sizes = Vec::new();
        let result = embed_in_batches(&texts, 2, |batch| {
            seen_batch_sizes.push(batch.len());
            async move { Ok(batch.iter().map(|_| vec![1.0]).collect()) }
        })
        .await
        .unwrap();
        assert_eq!(result.len(), 5);
        assert_eq!(seen_batch_sizes, vec![2, 2, 1]);
    }

    #[tokio::test]
    async fn first_failing_batch_aborts_the_rest() {
        let texts: Vec<String> = (0..4).map(|i| i.to_string()).collect();
        let mut calls = 0;
        let err = embed_in_batches(&texts, 2, |batch| {
            calls += 1;
            let call = calls;
            async move {
                if call == 1 {
                    Err(EmbedError::Request("boom".to_string()))
                } else {
                    Ok(batch.iter().map(|_| vec![1.0]).collect())
                }
            }
        })
        .await
        .unwrap_err();
        assert!(matches!(err, EmbedError::Request(_)));
        assert_eq!(calls, 1);
    }
}
