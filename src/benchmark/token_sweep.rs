//! Optional token-budget sweep (spec.md §4.8): run each query at a series
//! of budgets, greedily filling results until the budget is exceeded, and
//! report MRR / Recall / noise-ratio / duration per budget.

use super::metrics::{self, QueryOutcome};
use crate::context::{CharsPerFourEstimator, TokenEstimator};
use crate::domain::types::{BenchmarkQuery, SearchResult};
use serde::{Deserialize, Serialize};
use std::time::Instant;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BudgetOutcome {
    pub budget: usize,
    pub mrr: f64,
    pub recall_at_10: f64,
    /// Fraction of included chunks that are not in the query's expected set.
    pub noise_ratio: f64,
    pub duration_ms: u64,
}

/// Greedily includes ranked results in order until the next one would
/// exceed `budget`, then computes metrics + noise ratio against that subset.
pub fn sweep_one(query: &BenchmarkQuery, ranked: &[SearchResult], budgets: &[usize]) -> Vec<BudgetOutcome> {
    let estimator = CharsPerFourEstimator;
    budgets
        .iter()
        .map(|&budget| {
            let start = Instant::now();
            let mut used = 0usize;
            let mut included: Vec<String> = Vec::new();
            for result in ranked {
                let tokens = estimator.estimate(&result.content);
                if used + tokens > budget {
                    break;
                }
                used += tokens;
                included.push(result.id.clone());
            }

            let outcome = QueryOutcome {
                retrieved: &included,
                expected: &query.expected_chunk_ids,
            };
            let computed = metrics::compute(&outcome);

            let noise_ratio = if included.is_empty() {
                0.0
            } else {
                let noisy = included
                    .iter()
                    .filter(|id| !query.expected_chunk_ids.contains(*id))
                    .count();
                noisy as f64 / included.len() as f64
            };

            BudgetOutcome {
                budget,
                mrr: computed.mrr,
                recall_at_10: computed.recall_at_10,
                noise_ratio,
                duration_ms: start.elapsed().as_millis() as u64,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{QueryType, SearchMethod};
    use std::collections::HashSet;

    fn result(id: &str, content: &str) -> SearchResult {
        SearchResult {
            id: id.to_string(),
            file_path: String::new(),
            start_line: 1,
            content: content.to_string(),
            score: 1.0,
            method: SearchMethod::Hybrid,
            chunk: None,
            metadata: serde_json::Value::Null,
        }
    }

    #[test]
    fn smaller_budget_includes_fewer_results() {
        let query = BenchmarkQuery {
            query: "x".to_string(),
            expected_chunk_ids: HashSet::from(["a".to_string()]),
            query_type: QueryType::Keyword,
        };
        let ranked = vec![result("a", &"x".repeat(40)), result("b", &"y".repeat(40))];
        let outcomes = sweep_one(&query, &ranked, &[10, 1000]);
        assert!(outcomes[0].mrr <= outcomes[1].mrr + f64::EPSILON);
    }
}
