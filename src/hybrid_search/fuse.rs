//! Reciprocal Rank Fusion (spec.md §4.6, §8).

use crate::domain::types::SearchResult;
use crate::vector_store::VectorMatch;
use std::collections::HashMap;

use super::K_RRF;

/// Fuses two ranked lists by RRF: for each source, walk its list in order
/// assigning rank `r` starting at 0, and add `weight * 1/(K_RRF + r)` to a
/// running per-id score table. Weights are not normalized (spec.md §9):
/// callers setting both weights to 1.0 get double the scale of 0.5/0.5.
///
/// Returns `(id, fused_score)` pairs in unspecified order; callers sort.
pub fn reciprocal_rank_fusion(
    bm25_hits: &[SearchResult],
    vector_hits: &[VectorMatch],
    bm25_weight: f32,
    vector_weight: f32,
) -> Vec<(String, f64)> {
    let mut scores: HashMap<String, f64> = HashMap::new();

    for (rank, hit) in bm25_hits.iter().enumerate() {
        *scores.entry(hit.id.clone()).or_insert(0.0) +=
            f64::from(bm25_weight) / (K_RRF + rank as f64);
    }
    for (rank, hit) in vector_hits.iter().enumerate() {
        *scores.entry(hit.id.clone()).or_insert(0.0) +=
            f64::from(vector_weight) / (K_RRF + rank as f64);
    }

    scores.into_iter().collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::SearchMethod;

    fn bm25_result(id: &str) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            file_path: String::new(),
            start_line: 1,
            content: String::new(),
            score: 0.0,
            method: SearchMethod::Bm25,
            chunk: None,
            metadata: serde_json::Value::Null,
        }
    }

    fn vec_match(id: &str) -> VectorMatch {
        VectorMatch {
            id: id.to_string(),
            score: 0.0,
            payload: serde_json::Value::Null,
        }
    }

    /// spec.md §8 scenario 1: vector `[c1(0), c2(1), c3(2)]`, bm25 `[c2(0),
    /// c4(1), c1(2)]`, weights 0.7/0.3 -> final order c1, c2, c3, c4.
    #[test]
    fn fusion_with_overlap_matches_normative_scenario() {
        let vector_hits = vec![vec_match("c1"), vec_match("c2"), vec_match("c3")];
        let bm25_hits = vec![bm25_result("c2"), bm25_result("c4"), bm25_result("c1")];

        let fused = reciprocal_rank_fusion(&bm25_hits, &vector_hits, 0.3, 0.7);
        let mut fused: HashMap<String, f64> = fused.into_iter().collect();

        let c1 = fused.remove("c1").unwrap();
        let c2 = fused.remove("c2").unwrap();
        let c3 = fused.remove("c3").unwrap();
        let c4 = fused.remove("c4").unwrap();

        assert!((c1 - (0.7 / 61.0 + 0.3 / 63.0)).abs() < 1e-9);
        assert!((c2 - (0.7 / 62.0 + 0.3 / 61.0)).abs() < 1e-9);
        assert!((c3 - 0.7 / 62.0).abs() < 1e-9);
        assert!((c4 - 0.3 / 62.0).abs() < 1e-9);

        let mut order = vec![("c1", c1), ("c2", c2), ("c3", c3), ("c4", c4)];
        order.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap());
        let ids: Vec<&str> = order.iter().map(|(id, _)| *id).collect();
        assert_eq!(ids, vec!["c1", "c2", "c3", "c4"]);
    }

    /// A chunk appearing only in the BM25 list at rank `r`: fused score is
    /// exactly `bm25_weight * 1/(60+r)` (spec.md §8 fusion algebra).
    #[test]
    fn bm25_only_chunk_matches_exact_algebra() {
        let bm25_hits = vec![bm25_result("a"), bm25_result("only")];
        let fused = reciprocal_rank_fusion(&bm25_hits, &[], 0.3, 0.7);
        let only = fused.into_iter().find(|(id, _)| id == "only").unwrap().1;
        assert!((only - 0.3 / 61.0).abs() < 1e-9);
    }
}
