//! `openai-compatible` embedding provider: `POST {base_url}/v1/embeddings`
//! with `{model, input: [texts...]}`, response `{data: [{embedding, index}]}`.
//!
//! Grounded in the teacher's `adapters::providers::embedding::openai`. Unlike
//! the teacher's version, responses are re-assembled by the server-supplied
//! `index` field per text (spec.md §4.3), so a server that reorders its
//! response is tolerated.

use super::{classify_reqwest_error, embed_in_batches, status_error, EmbedError, EmbeddingProvider};
use crate::adapters::http_client::SharedHttpClient;
use async_trait::async_trait;
use std::time::Duration;

pub struct OpenAiCompatibleEmbeddingProvider {
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    max_batch_size: usize,
    timeout: Duration,
    http_client: SharedHttpClient,
}

impl OpenAiCompatibleEmbeddingProvider {
    pub fn new(
        api_key: String,
        base_url: Option<String>,
        model: String,
        dimensions: usize,
        timeout: Duration,
        http_client: SharedHttpClient,
    ) -> Self {
        Self {
            api_key,
            base_url: base_url
                .unwrap_or_else(|| "https://api.openai.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            dimensions,
            max_batch_size: 100,
            timeout,
            http_client,
        }
    }

    async fn send_batch(&self, batch: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        let client = self
            .http_client
            .client_with_timeout(self.timeout)
            .unwrap_or_else(|_| self.http_client.client().clone());

        let payload = serde_json::json!({
            "model": self.model,
            "input": batch,
        });

        let response = client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&payload)
            .send()
            .await
            .map_err(|e| classify_reqwest_error(&e, &self.base_url, self.timeout.as_millis() as u64))?;

        if !response.status().is_success() {
            return Err(status_error(response).await);
        }

        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| EmbedError::Malformed(e.to_string()))?;

        let data = body
            .get("data")
            .and_then(|v| v.as_array())
            .ok_or_else(|| EmbedError::Malformed("missing `data` array".to_string()))?;

        if data.len() != batch.len() {
            return Err(EmbedError::Malformed(format!(
                "expected {} embeddings, got {}",
                batch.len(),
                data.len()
            )));
        }

        // Re-assemble by `index` so a reordered response is tolerated.
        let mut by_index: Vec<Option<Vec<f32>>> = vec![None; batch.len()];
        for entry in data {
            let index = entry
                .get("index")
                .and_then(serde_json::Value::as_u64)
                .ok_or_else(|| EmbedError::Malformed("embedding entry missing `index`".to_string()))?
                as usize;
            let vector = entry
                .get("embedding")
                .and_then(|v| v.as_array())
                .ok_or_else(|| EmbedError::Malformed("embedding entry missing `embedding`".to_string()))?
                .iter()
                .filter_map(|f| f.as_f64())
                .map(|f| f as f32)
                .collect();
            if index >= by_index.len() {
                return Err(EmbedError::Malformed(format!("embedding index {index} out of range")));
            }
            by_index[index] = Some(vector);
        }

        by_index
            .into_iter()
            .enumerate()
            .map(|(i, v)| v.ok_or_else(|| EmbedError::Malformed(format!("missing embedding at index {i}"))))
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for OpenAiCompatibleEmbeddingProvider {
    async fn embed(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, EmbedError> {
        embed_in_batches(texts, self.max_batch_size, |batch| self.send_batch(batch)).await
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn max_batch_size(&self) -> usize {
        self.max_batch_size
    }

    fn provider_name(&self) -> &str {
        "openai-compatible"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http_client::HttpClientPool;
    use std::sync::Arc;

    fn provider(base_url: String) -> OpenAiCompatibleEmbeddingProvider {
        OpenAiCompatibleEmbeddingProvider::new(
            "test-key".to_string(),
            Some(base_url),
            "text-embedding-3-small".to_string(),
            3,
            Duration::from_secs(5),
            Arc::new(HttpClientPool::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn reassembles_by_server_supplied_index() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer test-key")
            .with_status(200)
            .with_body(
                r#"{"data": [
                    {"index": 1, "embedding": [0.4, 0.5, 0.6]},
                    {"index": 0, "embedding": [0.1, 0.2, 0.3]}
                ]}"#,
            )
            .create_async()
            .await;

        let provider = provider(server.url());
        let out = provider
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap();
        assert_eq!(out[0], vec![0.1, 0.2, 0.3]);
        assert_eq!(out[1], vec![0.4, 0.5, 0.6]);
    }

    #[tokio::test]
    async fn mismatched_count_is_malformed() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .with_status(200)
            .with_body(r#"{"data": [{"index": 0, "embedding": [0.1, 0.2, 0.3]}]}"#)
            .create_async()
            .await;

        let provider = provider(server.url());
        let err = provider
            .embed(&["first".to_string(), "second".to_string()])
            .await
            .unwrap_err();
        assert!(matches!(err, EmbedError::Malformed(_)));
    }
}
