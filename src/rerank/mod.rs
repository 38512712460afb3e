//! Optional re-ranking of a fused candidate list (spec.md §4.5).
//!
//! New trait — the teacher has no re-ranking stage. Two reference
//! implementations are provided: `NoopReRanker` (identity, used when no
//! re-ranker is configured) and `LexicalOverlapReRanker`, which re-scores by
//! query/content token overlap using the same tokenizer `bm25` uses, useful
//! as a cheap re-ranker when no external re-ranking model is wired up.

use crate::bm25::tokenize;
use crate::domain::types::SearchResult;
use async_trait::async_trait;
use std::collections::HashSet;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ReRankError {
    #[error("re-ranker request failed: {0}")]
    Request(String),
}

/// Reorders a candidate list given the original query text.
///
/// Per spec.md §4.5, a failing re-rank MUST NOT surface as an error to
/// callers of the search pipeline: `hybrid_search` calls `rerank` and falls
/// back to the unranked list itself on `Err`, so this trait is free to
/// return errors without callers needing additional recovery logic.
#[async_trait]
pub trait ReRanker: Send + Sync {
    async fn rerank(
        &self,
        query: &str,
        candidates: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, ReRankError>;
}

/// Returns candidates unchanged; the default when no re-ranker is configured.
pub struct NoopReRanker;

#[async_trait]
impl ReRanker for NoopReRanker {
    async fn rerank(
        &self,
        _query: &str,
        candidates: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, ReRankError> {
        Ok(candidates)
    }
}

/// Re-scores each candidate by the fraction of query tokens present in its
/// content, then sorts descending, ties broken by original relative order.
pub struct LexicalOverlapReRanker;

#[async_trait]
impl ReRanker for LexicalOverlapReRanker {
    async fn rerank(
        &self,
        query: &str,
        mut candidates: Vec<SearchResult>,
    ) -> Result<Vec<SearchResult>, ReRankError> {
        let query_terms: HashSet<String> = tokenize(query).into_iter().collect();
        if query_terms.is_empty() {
            return Ok(candidates);
        }

        let mut scored: Vec<(usize, f32)> = candidates
            .iter()
            .enumerate()
            .map(|(i, c)| {
                let content_terms: HashSet<String> = tokenize(&c.content).into_iter().collect();
                let overlap = query_terms.intersection(&content_terms).count() as f32;
                (i, overlap / query_terms.len() as f32)
            })
            .collect();

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.cmp(&b.0))
        });

        let reordered = scored
            .into_iter()
            .map(|(i, _)| std::mem::replace(&mut candidates[i], dummy_result()))
            .collect();
        Ok(reordered)
    }
}

fn dummy_result() -> SearchResult {
    SearchResult {
        id: String::new(),
        file_path: String::new(),
        start_line: 0,
        content: String::new(),
        score: 0.0,
        method: crate::domain::types::SearchMethod::Hybrid,
        chunk: None,
        metadata: serde_json::Value::Null,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SearchMethod;

    fn result(id: &str, content: &str) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            file_path: String::new(),
            start_line: 1,
            content: content.to_string(),
            score: 0.0,
            method: SearchMethod::Hybrid,
            chunk: None,
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn noop_reranker_preserves_order() {
        let candidates = vec![result("a", "x"), result("b", "y")];
        let out = NoopReRanker.rerank("query", candidates.clone()).await.unwrap();
        assert_eq!(out, candidates);
    }

    #[tokio::test]
    async fn lexical_overlap_promotes_better_match() {
        let candidates = vec![
            result("low", "unrelated text entirely"),
            result("high", "parseConfigFile reads settings"),
        ];
        let out = LexicalOverlapReRanker
            .rerank("parse config settings", candidates)
            .await
            .unwrap();
        assert_eq!(out[0].id, "high");
    }
}
