//! Auto-generates queries from the index and computes IR metrics end-to-end
//! (spec.md §4.8). New module — the teacher has no benchmark harness; this
//! is grounded in the query-generator and metric definitions spec.md §4.8
//! gives normatively, using `bm25::tokenize` and `context::DependencyGraphProvider`
//! as its only internal dependencies.

mod generators;
pub mod grep_baseline;
mod metrics;
mod rng;
pub mod token_sweep;

pub use grep_baseline::{GrepComparison, GrepComparisonEntry};
pub use metrics::Metrics;
pub use token_sweep::BudgetOutcome;

use crate::context::DependencyGraphProvider;
use crate::domain::types::{BenchmarkQuery, CodeChunk, QueryType, SearchResult};
use async_trait::async_trait;
use rng::SeededRng;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum BenchmarkError {
    #[error("benchmark generation failed: {0}")]
    Generation(String),

    #[error("metric computation failed: {0}")]
    Metrics(String),
}

/// Anything the benchmark runner can query for ranked chunk ids. Lets the
/// runner be driven by a real `HybridSearch` or, per spec.md §8 scenario 6,
/// a stub that always returns empty.
#[async_trait]
pub trait Searcher: Send + Sync {
    async fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult>;
}

#[async_trait]
impl Searcher for crate::hybrid_search::HybridSearch {
    async fn search(&self, query: &str, top_k: usize) -> Vec<SearchResult> {
        crate::hybrid_search::HybridSearch::search(self, &crate::domain::types::Query::new(query).with_top_k(top_k))
            .await
            .unwrap_or_default()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkMetadata {
    pub total_queries: usize,
    pub total_chunks_in_index: usize,
    pub duration_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueryTypeBreakdown {
    pub query_type: QueryType,
    pub metrics: Metrics,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BenchmarkReport {
    pub metadata: BenchmarkMetadata,
    pub aggregate: Metrics,
    pub by_query_type: Vec<QueryTypeBreakdown>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub grep_comparison: Option<GrepComparison>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub token_efficiency: Option<Vec<BudgetOutcome>>,
}

pub struct BenchmarkRunner;

impl BenchmarkRunner {
    /// Generate `n` queries deterministically from `chunks` + `graph` for
    /// `seed` (spec.md §8 scenario 6: same seed -> same list). Caller/import
    /// generators silently produce nothing if the graph has no matching
    /// edges (spec.md §9).
    pub async fn generate_queries(
        chunks: &[CodeChunk],
        graph: &dyn DependencyGraphProvider,
        seed: u64,
        n: usize,
    ) -> Vec<BenchmarkQuery> {
        let mut rng = SeededRng::new(seed);
        let mut queries = Vec::with_capacity(n);

        // Round-robins across the five generator kinds so a mixed corpus
        // gets a mixed query_type distribution rather than all-keyword.
        let kinds = [
            QueryType::Keyword,
            QueryType::Summary,
            QueryType::Caller,
            QueryType::Test,
            QueryType::Import,
        ];

        let mut attempts = 0usize;
        let max_attempts = n.saturating_mul(kinds.len()).max(kinds.len());
        while queries.len() < n && attempts < max_attempts {
            let kind = kinds[attempts % kinds.len()];
            attempts += 1;
            let generated = match kind {
                QueryType::Keyword => generators::generate_keyword(chunks, &mut rng),
                QueryType::Summary => generators::generate_summary(chunks, &mut rng),
                QueryType::Caller => generators::generate_caller(graph, &mut rng).await,
                QueryType::Test => generators::generate_test(graph, &mut rng).await,
                QueryType::Import => generators::generate_import(graph, &mut rng).await,
            };
            if let Some(query) = generated {
                queries.push(query);
            }
        }
        queries
    }

    /// Run every query through `searcher`, computing aggregate and
    /// per-query-type metrics.
    pub async fn run(
        queries: &[BenchmarkQuery],
        searcher: &dyn Searcher,
        total_chunks_in_index: usize,
    ) -> BenchmarkReport {
        tracing::info!(
            "benchmark: running {} quer{} over {total_chunks_in_index} chunk(s)",
            queries.len(),
            if queries.len() == 1 { "y" } else { "ies" },
        );
        let start = Instant::now();
        let mut per_query_metrics = Vec::with_capacity(queries.len());
        let mut by_type: std::collections::HashMap<QueryType, Vec<Metrics>> = std::collections::HashMap::new();

        for query in queries {
            let results = searcher.search(&query.query, 10).await;
            let retrieved: Vec<String> = results.into_iter().map(|r| r.id).collect();
            let outcome = metrics::QueryOutcome {
                retrieved: &retrieved,
                expected: &query.expected_chunk_ids,
            };
            let computed = metrics::compute(&outcome);
            per_query_metrics.push(computed);
            by_type.entry(query.query_type).or_default().push(computed);
        }

        let mut by_query_type: Vec<QueryTypeBreakdown> = by_type
            .into_iter()
            .map(|(query_type, metrics)| QueryTypeBreakdown {
                query_type,
                metrics: metrics::average(&metrics),
            })
            .collect();
        by_query_type.sort_by_key(|b| b.query_type.to_string());
        tracing::debug!(
            "benchmark: finished in {}ms (mrr={:.4})",
            start.elapsed().as_millis(),
            metrics::average(&per_query_metrics).mrr,
        );

        BenchmarkReport {
            metadata: BenchmarkMetadata {
                total_queries: queries.len(),
                total_chunks_in_index,
                duration_ms: start.elapsed().as_millis() as u64,
            },
            aggregate: metrics::average(&per_query_metrics),
            by_query_type,
            grep_comparison: None,
            token_efficiency: None,
        }
    }

    /// Attach an optional grep baseline comparison to an already-computed
    /// report by re-running each query's engine result set against a
    /// regex search over `workspace_root`.
    pub async fn with_grep_baseline(
        mut report: BenchmarkReport,
        queries: &[BenchmarkQuery],
        searcher: &dyn Searcher,
        workspace_root: &Path,
    ) -> BenchmarkReport {
        let mut entries = Vec::with_capacity(queries.len());
        for query in queries {
            let results = searcher.search(&query.query, 10).await;
            let engine_files: HashSet<String> = results.into_iter().map(|r| r.file_path).collect();
            entries.push(grep_baseline::compare(workspace_root, &query.query, &engine_files));
        }
        report.grep_comparison = Some(GrepComparison { entries });
        report
    }

    /// Attach an optional token-budget sweep: for each query, the ranked
    /// results are greedily filled per budget and metrics recomputed.
    pub async fn with_token_sweep(
        mut report: BenchmarkReport,
        queries: &[BenchmarkQuery],
        searcher: &dyn Searcher,
        budgets: &[usize],
    ) -> BenchmarkReport {
        let mut per_budget: std::collections::HashMap<usize, Vec<BudgetOutcome>> = std::collections::HashMap::new();
        for query in queries {
            let results = searcher.search(&query.query, 50).await;
            for outcome in token_sweep::sweep_one(query, &results, budgets) {
                per_budget.entry(outcome.budget).or_default().push(outcome);
            }
        }

        let mut aggregated: Vec<BudgetOutcome> = per_budget
            .into_iter()
            .map(|(budget, outcomes)| {
                let n = outcomes.len().max(1) as f64;
                BudgetOutcome {
                    budget,
                    mrr: outcomes.iter().map(|o| o.mrr).sum::<f64>() / n,
                    recall_at_10: outcomes.iter().map(|o| o.recall_at_10).sum::<f64>() / n,
                    noise_ratio: outcomes.iter().map(|o| o.noise_ratio).sum::<f64>() / n,
                    duration_ms: outcomes.iter().map(|o| o.duration_ms).sum(),
                }
            })
            .collect();
        aggregated.sort_by_key(|o| o.budget);

        report.token_efficiency = Some(aggregated);
        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::InMemoryDependencyGraph;
    use crate::domain::types::{ChunkType, Language};

    fn chunk(id: &str, name: &str) -> CodeChunk {
        CodeChunk {
            id: id.to_string(),
            content: "fn body() {}".to_string(),
            nl_summary: format!("summary for {id}"),
            file_path: format!("{id}.rs"),
            start_line: 1,
            end_line: 1,
            language: Language::Rust,
            chunk_type: ChunkType::Function,
            name: name.to_string(),
            declarations: vec![],
            imports: vec![],
            exports: vec![],
            metadata: serde_json::json!({}),
        }
    }

    struct EmptySearcher;

    #[async_trait]
    impl Searcher for EmptySearcher {
        async fn search(&self, _query: &str, _top_k: usize) -> Vec<SearchResult> {
            Vec::new()
        }
    }

    #[tokio::test]
    async fn generation_is_deterministic_for_same_seed() {
        let chunks: Vec<CodeChunk> = (0..20).map(|i| chunk(&format!("c{i}"), &format!("name{i}"))).collect();
        let graph = InMemoryDependencyGraph::default();

        let first = BenchmarkRunner::generate_queries(&chunks, &graph, 42, 10).await;
        let second = BenchmarkRunner::generate_queries(&chunks, &graph, 42, 10).await;
        assert_eq!(first, second);
    }

    #[tokio::test]
    async fn stub_searcher_returning_empty_gives_zero_metrics() {
        let chunks: Vec<CodeChunk> = (0..5).map(|i| chunk(&format!("c{i}"), &format!("name{i}"))).collect();
        let graph = InMemoryDependencyGraph::default();
        let queries = BenchmarkRunner::generate_queries(&chunks, &graph, 7, 5).await;

        let report = BenchmarkRunner::run(&queries, &EmptySearcher, chunks.len()).await;
        assert_eq!(report.aggregate.precision_at_5, 0.0);
        assert_eq!(report.aggregate.precision_at_10, 0.0);
        assert_eq!(report.aggregate.recall_at_10, 0.0);
        assert_eq!(report.aggregate.mrr, 0.0);
        assert_eq!(report.aggregate.ndcg_at_10, 0.0);
    }
}
