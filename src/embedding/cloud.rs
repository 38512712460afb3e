//! Hosted embedding API providers (`cloud-a`, `cloud-b`), grounded in the
//! teacher's `adapters::providers::embedding::{voyageai,gemini}`: each talks
//! to one vendor's native (non-OpenAI-compatible) embeddings endpoint.
//! Neither vendor is named here; the wire shapes below are representative of
//! what those two providers actually sent.

use super::{classify_reqwest_error, embed_in_batches, status_error, EmbedError, EmbeddingProvider};
use crate::adapters::http_client::SharedHttpClient;
use async_trait::async_trait;
use std::time::Duration;

/// `cloud-a`: `POST {base_url}/v1/embeddings` with `{input: [texts...],
/// model}`, response `{data: [{embedding}]}` (no reordering index; the
/// vendor preserves request order).
pub struct CloudAEmbeddingProvider {
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    max_batch_size: usize,
    timeout: Duration,
    http_client: SharedHttpClient,
}

impl CloudAEmbeddingProvider {
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
                .unwrap_or_else(|| "https://api.cloud-a.example.com".to_string())
                .trim_end_matches('/')
                .to_string(),
            model,
            dimensions,
            max_batch_size: 128,
            timeout,
            http_client,
        }
    }

    async fn send_batch(&self, batch: Vec<String>) -> Result<Vec<Vec<f32>>, EmbedError> {
        let client = self
            .http_client
            .client_with_timeout(self.timeout)
            .unwrap_or_else(|_| self.http_client.client().clone());

        let response = client
            .post(format!("{}/v1/embeddings", self.base_url))
            .bearer_auth(&self.api_key)
            .json(&serde_json::json!({ "input": batch, "model": self.model }))
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

        body.get("data")
            .and_then(|v| v.as_array())
            .ok_or_else(|| EmbedError::Malformed("missing `data` array".to_string()))?
            .iter()
            .map(|entry| {
                entry
                    .get("embedding")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| EmbedError::Malformed("entry missing `embedding`".to_string()))
                    .map(|v| v.iter().filter_map(|f| f.as_f64()).map(|f| f as f32).collect())
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for CloudAEmbeddingProvider {
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
        "cloud-a"
    }
}

/// `cloud-b`: batches each go to `POST {base_url}/v1/models/{model}:batchEmbed`
/// with `{requests: [{content: text}, ...]}`, response `{embeddings:
/// [{values: [...]}]}`, auth via an API-key query parameter.
pub struct CloudBEmbeddingProvider {
    api_key: String,
    base_url: String,
    model: String,
    dimensions: usize,
    max_batch_size: usize,
    timeout: Duration,
    http_client: SharedHttpClient,
}

impl CloudBEmbeddingProvider {
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
                .unwrap_or_else(|| "https://api.cloud-b.example.com".to_string())
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

        let requests: Vec<_> = batch.iter().map(|text| serde_json::json!({ "content": text })).collect();

        let response = client
            .post(format!(
                "{}/v1/models/{}:batchEmbed?key={}",
                self.base_url, self.model, self.api_key
            ))
            .json(&serde_json::json!({ "requests": requests }))
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

        body.get("embeddings")
            .and_then(|v| v.as_array())
            .ok_or_else(|| EmbedError::Malformed("missing `embeddings` array".to_string()))?
            .iter()
            .map(|entry| {
                entry
                    .get("values")
                    .and_then(|v| v.as_array())
                    .ok_or_else(|| EmbedError::Malformed("entry missing `values`".to_string()))
                    .map(|v| v.iter().filter_map(|f| f.as_f64()).map(|f| f as f32).collect())
            })
            .collect()
    }
}

#[async_trait]
impl EmbeddingProvider for CloudBEmbeddingProvider {
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
        "cloud-b"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::adapters::http_client::HttpClientPool;
    use std::sync::Arc;

    #[tokio::test]
    async fn cloud_a_embeds_in_request_order() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/embeddings")
            .match_header("authorization", "Bearer key-a")
            .with_status(200)
            .with_body(r#"{"data": [{"embedding": [0.1, 0.2]}, {"embedding": [0.3, 0.4]}]}"#)
            .create_async()
            .await;

        let provider = CloudAEmbeddingProvider::new(
            "key-a".to_string(),
            Some(server.url()),
            "cloud-a-model".to_string(),
            2,
            Duration::from_secs(5),
            Arc::new(HttpClientPool::new().unwrap()),
        );
        let out = provider
            .embed(&["a".to_string(), "b".to_string()])
            .await
            .unwrap();
        assert_eq!(out, vec![vec![0.1, 0.2], vec![0.3, 0.4]]);
    }

    #[tokio::test]
    async fn cloud_b_reads_values_from_batch_embed_response() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", "/v1/models/cloud-b-model:batchEmbed")
            .match_query(mockito::Matcher::Any)
            .with_status(200)
            .with_body(r#"{"embeddings": [{"values": [0.5, 0.6]}]}"#)
            .create_async()
            .await;

        let provider = CloudBEmbeddingProvider::new(
            "key-b".to_string(),
            Some(server.url()),
            "cloud-b-model".to_string(),
            2,
            Duration::from_secs(5),
            Arc::new(HttpClientPool::new().unwrap()),
        );
        let out = provider.embed(&["a".to_string()]).await.unwrap();
        assert_eq!(out, vec![vec![0.5, 0.6]]);
    }

    #[tokio::test]
    async fn connection_refused_names_the_host() {
        let provider = CloudAEmbeddingProvider::new(
            "key".to_string(),
            Some("http://127.0.0.1:1".to_string()),
            "m".to_string(),
            2,
            Duration::from_millis(200),
            Arc::new(HttpClientPool::new().unwrap()),
        );
        let err = provider.embed(&["a".to_string()]).await.unwrap_err();
        match err {
            EmbedError::ConnectionRefused { host } => assert!(host.contains("127.0.0.1")),
            other => panic!("expected ConnectionRefused, got {other:?}"),
        }
    }
}
