//! `native-local` embedding provider: talks to a locally-hosted backend that
//! speaks the same wire format `model_lifecycle` manages (spec.md §6):
//! `POST {base_url}/api/embed` with `{model, input: [texts...]}`.
//!
//! Grounded in the teacher's `adapters::providers::embedding::ollama`, which
//! issued one `/api/embeddings` request per text; this provider batches
//! instead, since the backend's `/api/embed` endpoint accepts an `input`
//! array natively.

use super::{classify_reqwest_error, embed_in_batches, status_error, EmbedError, EmbeddingProvider};
use crate::adapters::http_client::SharedHttpClient;
use async_trait::async_trait;
use std::time::Duration;

pub struct NativeLocalEmbeddingProvider {
    base_url: String,
    model: String,
    dimensions: usize,
    max_batch_size: usize,
    timeout: Duration,
    http_client: SharedHttpClient,
}

impl NativeLocalEmbeddingProvider {
    pub fn new(
        base_url: String,
        model: String,
        dimensions: usize,
        timeout: Duration,
        http_client: SharedHttpClient,
    ) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model,
            dimensions,
            max_batch_size: 100,
            timeout,
            http_client,
        }
    }

    pub fn with_max_batch_size(mut self, max_batch_size: usize) -> Self {
        self.max_batch_size = max_batch_size;
        self
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
            .post(format!("{}/api/embed", self.base_url))
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

        let embeddings = body
            .get("embeddings")
            .and_then(|v| v.as_array())
            .ok_or_else(|| EmbedError::Malformed("missing `embeddings` array".to_string()))?;

        embeddings
            .iter()
            .map(|vec| {
                vec.as_array()
                    .ok_or_else(|| EmbedError::Malformed("embedding entry is not an array".to_string()))
                    .map(|floats| floats.iter().filter_map(|f| f.as_f64()).map(|f| f as f32).collect())
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for NativeLocalEmbeddingProvider {
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
        "native-local"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http_client::HttpClientPool;
    use std::sync::Arc;

    fn provider(base_url: String) -> NativeLocalEmbeddingProvider {
        NativeLocalEmbeddingProvider::new(
            base_url,
            "nomic-embed-text".to_string(),
            4,
            Duration::from_secs(5),
            Arc::new(HttpClientPool::new().unwrap()),
        )
    }

    #[tokio::test]
    async fn embeds_batch_via_embed_endpoint() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embed")
            .with_status(200)
            .with_body(r#"{"embeddings": [[0.1, 0.2, 0.3, 0.4], [0.5, 0.6, 0.7, 0.8]]}"#)
            .create_async()
            .await;

        let provider = provider(server.url());
        let out = provider
            .embed(&["foo".to_string(), "bar".to_string()])
            .await
            .unwrap();
        assert_eq!(out.len(), 2);
        assert_eq!(out[0], vec![0.1, 0.2, 0.3, 0.4]);
    }

    #[tokio::test]
    async fn non_2xx_status_surfaces_as_embed_error() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/api/embed")
            .with_status(500)
            .with_body(r#"{"error": "boom"}"#)
            .create_async()
            .await;

        let provider = provider(server.url());
        let err = provider.embed(&["foo".to_string()]).await.unwrap_err();
        assert!(matches!(err, EmbedError::Status { .. }));
    }

    #[tokio::test]
    async fn empty_input_short_circuits_without_a_request() {
        let mut server = mockito::Server::new_async().await;
        let mock = server.mock("POST", "/api/embed").expect(0).create_async().await;

        let provider = provider(server.url());
        let out = provider.embed(&[]).await.unwrap();
        assert!(out.is_empty());
        mock.assert_async().await;
    }
}
