//! Orchestrates BM25 + vector retrieval and fuses ranks (spec.md §4.6).
//!
//! Supersedes the teacher's `adapters::hybrid_search` / `core::hybrid_search`
//! (a `Vec<CodeChunk>`-based BM25 scorer re-built per query, fused by a
//! sigmoid-normalized weighted average against semantic results the caller
//! had to supply already embedded). This version owns its `Bm25Index` and
//! `VectorStore`, embeds the query itself, issues both retrieval legs
//! concurrently, and fuses by Reciprocal Rank Fusion instead of a weighted
//! score average.

mod fuse;

pub use fuse::reciprocal_rank_fusion;

use crate::bm25::Bm25Index;
use crate::domain::error::{Error, Result};
use crate::domain::types::{ChunkType, CodeChunk, Language, Query, SearchMethod, SearchResult};
use crate::embedding::EmbeddingProvider;
use crate::rerank::ReRanker;
use crate::infrastructure::constants::{RRF_DEFAULT_BM25_WEIGHT, RRF_DEFAULT_VECTOR_WEIGHT, RRF_K};
use crate::vector_store::VectorStore;
use std::sync::Arc;

/// Reciprocal Rank Fusion constant (spec.md §4.6).
pub const K_RRF: f64 = RRF_K;

/// Fusion weight defaults (spec.md §4.6, `.coderag.yaml` `search.*`).
#[derive(Debug, Clone, Copy)]
pub struct HybridSearchConfig {
    pub default_vector_weight: f32,
    pub default_bm25_weight: f32,
}

impl Default for HybridSearchConfig {
    fn default() -> Self {
        Self {
            default_vector_weight: RRF_DEFAULT_VECTOR_WEIGHT,
            default_bm25_weight: RRF_DEFAULT_BM25_WEIGHT,
        }
    }
}

/// Orchestrates the two retrieval legs and an optional re-ranking pass.
pub struct HybridSearch {
    bm25: Arc<Bm25Index>,
    vector_store: Arc<dyn VectorStore>,
    embedder: Arc<dyn EmbeddingProvider>,
    reranker: Option<Arc<dyn ReRanker>>,
    config: HybridSearchConfig,
}

impl HybridSearch {
    pub fn new(
        bm25: Arc<Bm25Index>,
        vector_store: Arc<dyn VectorStore>,
        embedder: Arc<dyn EmbeddingProvider>,
    ) -> Self {
        Self {
            bm25,
            vector_store,
            embedder,
            reranker: None,
            config: HybridSearchConfig::default(),
        }
    }

    pub fn with_reranker(mut self, reranker: Arc<dyn ReRanker>) -> Self {
        self.reranker = Some(reranker);
        self
    }

    pub fn with_config(mut self, config: HybridSearchConfig) -> Self {
        self.config = config;
        self
    }

    /// Upsert chunks into both indices, keeping BM25 doc count and
    /// VectorStore count equal after a successful ingest (spec.md §3).
    pub async fn index_chunks(&self, chunks: Vec<CodeChunk>) -> Result<()> {
        if chunks.is_empty() {
            return Ok(());
        }
        let texts: Vec<String> = chunks.iter().map(CodeChunk::indexable_text).collect();
        let vectors = self.embedder.embed(&texts).await?;

        let ids: Vec<String> = chunks.iter().map(|c| c.id.clone()).collect();
        let payloads: Vec<serde_json::Value> = chunks.iter().map(chunk_to_payload).collect();

        self.vector_store
            .upsert(ids, vectors, payloads)
            .await
            .map_err(Error::Store)?;
        self.bm25.add(chunks).await;
        Ok(())
    }

    pub async fn remove_chunks(&self, ids: &[String]) -> Result<()> {
        self.bm25.remove(ids).await;
        self.vector_store.delete(ids).await.map_err(Error::Store)?;
        Ok(())
    }

    /// Run the full hybrid pipeline for `query` (spec.md §4.6 steps 1-6).
    pub async fn search(&self, query: &Query) -> Result<Vec<SearchResult>> {
        let fan_out_k = query.top_k.saturating_mul(2).max(1);

        let qvecs = self.embedder.embed(std::slice::from_ref(&query.text)).await?;
        let qvec = qvecs
            .into_iter()
            .next()
            .ok_or_else(|| Error::Embed(crate::embedding::EmbedError::Malformed(
                "embedding provider returned no vector for query".to_string(),
            )))?;
        if qvec.is_empty() {
            return Err(Error::Embed(crate::embedding::EmbedError::Malformed(
                "query embedding is empty".to_string(),
            )));
        }

        let (vector_hits, bm25_hits) = tokio::join!(
            self.vector_store.query(&qvec, fan_out_k),
            self.bm25.search(&query.text, fan_out_k),
        );
        let vector_hits = vector_hits.map_err(Error::Store)?;

        let (vector_weight, bm25_weight) = query.resolve_weights(
            self.config.default_vector_weight,
            self.config.default_bm25_weight,
        );

        let fused = reciprocal_rank_fusion(&bm25_hits, &vector_hits, bm25_weight, vector_weight);
        tracing::debug!(
            "hybrid_search: fused {} bm25 hit(s) + {} vector hit(s) -> {} candidate(s) (w_bm25={bm25_weight}, w_vector={vector_weight})",
            bm25_hits.len(),
            vector_hits.len(),
            fused.len(),
        );

        let mut results: Vec<SearchResult> = fused
            .into_iter()
            .map(|(id, score)| {
                let chunk = bm25_hits
                    .iter()
                    .find(|r| r.id == id)
                    .and_then(|r| r.chunk.clone())
                    .or_else(|| {
                        vector_hits
                            .iter()
                            .find(|m| m.id == id)
                            .and_then(|m| payload_to_chunk(&m.payload))
                    });
                SearchResult {
                    id: id.clone(),
                    file_path: chunk.as_ref().map(|c| c.file_path.clone()).unwrap_or_default(),
                    start_line: chunk.as_ref().map(|c| c.start_line).unwrap_or(0),
                    content: chunk.as_ref().map(|c| c.content.clone()).unwrap_or_default(),
                    score: score as f32,
                    method: SearchMethod::Hybrid,
                    chunk,
                    metadata: serde_json::Value::Null,
                }
            })
            .collect();

        if let Some(filters) = &query.filters {
            results.retain(|r| matches_filters(r, filters));
        }

        results.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.id.cmp(&b.id))
        });
        results.truncate(query.top_k);

        if let Some(reranker) = &self.reranker {
            results = reranker
                .rerank(&query.text, results.clone())
                .await
                .unwrap_or_else(|e| {
                    tracing::warn!("hybrid_search: re-rank failed ({e}), falling back to fused order");
                    results
                });
        }

        Ok(results)
    }
}

fn matches_filters(result: &SearchResult, filters: &crate::domain::types::QueryFilters) -> bool {
    let Some(chunk) = &result.chunk else {
        return filters.language.is_none()
            && filters.file_path_substring.is_none()
            && filters.chunk_type.is_none();
    };
    if let Some(language) = &filters.language {
        if &chunk.language != language {
            return false;
        }
    }
    if let Some(substr) = &filters.file_path_substring {
        if !chunk.file_path.contains(substr.as_str()) {
            return false;
        }
    }
    if let Some(chunk_type) = &filters.chunk_type {
        if &chunk.chunk_type != chunk_type {
            return false;
        }
    }
    true
}

/// Chunk payload round-trippable JSON stored with each vector (spec.md §6).
fn chunk_to_payload(chunk: &CodeChunk) -> serde_json::Value {
    serde_json::to_value(chunk).unwrap_or(serde_json::Value::Null)
}

fn payload_to_chunk(payload: &serde_json::Value) -> Option<CodeChunk> {
    if payload.is_null() {
        return None;
    }
    serde_json::from_value(payload.clone()).ok().or_else(|| {
        Some(CodeChunk {
            id: payload.get("id")?.as_str()?.to_string(),
            content: payload.get("content")?.as_str().unwrap_or_default().to_string(),
            nl_summary: payload
                .get("nl_summary")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            file_path: payload
                .get("file_path")
                .and_then(|v| v.as_str())
                .unwrap_or_default()
                .to_string(),
            start_line: payload.get("start_line").and_then(|v| v.as_u64()).unwrap_or(1) as u32,
            end_line: payload.get("end_line").and_then(|v| v.as_u64()).unwrap_or(1) as u32,
            language: Language::Unknown,
            chunk_type: ChunkType::Block,
            name: payload.get("name").and_then(|v| v.as_str()).unwrap_or_default().to_string(),
            declarations: vec![],
            imports: vec![],
            exports: vec![],
            metadata: serde_json::Value::Null,
        })
    })
}
