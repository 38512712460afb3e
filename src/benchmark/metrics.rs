//! IR metric definitions (spec.md §4.8, normative).

use crate::infrastructure::constants::{BENCHMARK_METRIC_CUTOFF, BENCHMARK_PRECISION_CUTOFF};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

/// One query's retrieved ranked chunk ids, paired with its expected set.
pub struct QueryOutcome<'a> {
    pub retrieved: &'a [String],
    pub expected: &'a HashSet<String>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct Metrics {
    pub precision_at_5: f64,
    pub precision_at_10: f64,
    pub recall_at_10: f64,
    pub mrr: f64,
    pub ndcg_at_10: f64,
}

fn precision_at_k(retrieved: &[String], expected: &HashSet<String>, k: usize) -> f64 {
    if k == 0 {
        return 0.0;
    }
    let hits = retrieved.iter().take(k).filter(|id| expected.contains(*id)).count();
    hits as f64 / k as f64
}

fn recall_at_10(retrieved: &[String], expected: &HashSet<String>) -> f64 {
    if expected.is_empty() {
        return 0.0;
    }
    let hits = retrieved
        .iter()
        .take(BENCHMARK_METRIC_CUTOFF)
        .filter(|id| expected.contains(*id))
        .count();
    hits as f64 / expected.len() as f64
}

fn reciprocal_rank(retrieved: &[String], expected: &HashSet<String>) -> f64 {
    retrieved
        .iter()
        .position(|id| expected.contains(id))
        .map_or(0.0, |pos| 1.0 / (pos + 1) as f64)
}

fn ndcg_at_10(retrieved: &[String], expected: &HashSet<String>) -> f64 {
    let dcg: f64 = retrieved
        .iter()
        .take(BENCHMARK_METRIC_CUTOFF)
        .enumerate()
        .map(|(i, id)| {
            let rel = if expected.contains(id) { 1.0 } else { 0.0 };
            rel / (i as f64 + 2.0).log2()
        })
        .sum();

    let ideal_hits = expected.len().min(BENCHMARK_METRIC_CUTOFF);
    let idcg: f64 = (0..ideal_hits).map(|i| 1.0 / (i as f64 + 2.0).log2()).sum();

    if idcg == 0.0 {
        0.0
    } else {
        dcg / idcg
    }
}

/// Per-query metrics for one `QueryOutcome`.
pub fn compute(outcome: &QueryOutcome) -> Metrics {
    Metrics {
        precision_at_5: precision_at_k(outcome.retrieved, outcome.expected, BENCHMARK_PRECISION_CUTOFF),
        precision_at_10: precision_at_k(outcome.retrieved, outcome.expected, BENCHMARK_METRIC_CUTOFF),
        recall_at_10: recall_at_10(outcome.retrieved, outcome.expected),
        mrr: reciprocal_rank(outcome.retrieved, outcome.expected),
        ndcg_at_10: ndcg_at_10(outcome.retrieved, outcome.expected),
    }
}

/// Arithmetic mean across a set of per-query metrics; `0.0` fields for an
/// empty set.
pub fn average(all: &[Metrics]) -> Metrics {
    if all.is_empty() {
        return Metrics::default();
    }
    let n = all.len() as f64;
    Metrics {
        precision_at_5: all.iter().map(|m| m.precision_at_5).sum::<f64>() / n,
        precision_at_10: all.iter().map(|m| m.precision_at_10).sum::<f64>() / n,
        recall_at_10: all.iter().map(|m| m.recall_at_10).sum::<f64>() / n,
        mrr: all.iter().map(|m| m.mrr).sum::<f64>() / n,
        ndcg_at_10: all.iter().map(|m| m.ndcg_at_10).sum::<f64>() / n,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_retrieval_gives_all_zero_metrics() {
        let expected = HashSet::from(["a".to_string()]);
        let outcome = QueryOutcome {
            retrieved: &[],
            expected: &expected,
        };
        let metrics = compute(&outcome);
        assert_eq!(metrics.precision_at_5, 0.0);
        assert_eq!(metrics.recall_at_10, 0.0);
        assert_eq!(metrics.mrr, 0.0);
        assert_eq!(metrics.ndcg_at_10, 0.0);
    }

    #[test]
    fn perfect_retrieval_gives_ndcg_one() {
        let expected = HashSet::from(["a".to_string()]);
        let retrieved = vec!["a".to_string()];
        let outcome = QueryOutcome {
            retrieved: &retrieved,
            expected: &expected,
        };
        let metrics = compute(&outcome);
        assert!((metrics.ndcg_at_10 - 1.0).abs() < 1e-9);
        assert!((metrics.mrr - 1.0).abs() < 1e-9);
    }

    #[test]
    fn mrr_counts_first_relevant_rank() {
        let expected = HashSet::from(["b".to_string()]);
        let retrieved = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        let outcome = QueryOutcome {
            retrieved: &retrieved,
            expected: &expected,
        };
        assert!((compute(&outcome).mrr - 0.5).abs() < 1e-9);
    }
}
