//! Assembles a context bundle from ranked chunks under a token budget
//! (spec.md §4.7).
//!
//! New module — the teacher has no equivalent; it's grounded in the
//! dependency-graph edge vocabulary (`imports`/`exports`/`declarations`)
//! already on `domain::types::CodeChunk`, and in the teacher's
//! `application::context` for where a "context assembly" use case lives in
//! this layout.

mod estimator;
mod graph;

pub use estimator::{CharsPerFourEstimator, TokenEstimator};
pub use graph::{DependencyEdge, DependencyGraphProvider, EdgeKind, InMemoryDependencyGraph};

use crate::domain::types::{CodeChunk, SearchResult};
use std::collections::HashSet;
use std::sync::Arc;

/// Filters applied before expansion (spec.md §4.7).
#[derive(Debug, Clone, Default)]
pub struct ExpansionFilters {
    pub include_tests: bool,
    pub include_interfaces: bool,
}

/// Result of `ContextExpander::expand`.
#[derive(Debug, Clone)]
pub struct ContextBundle {
    pub context_text: String,
    pub token_count: usize,
    pub truncated: bool,
    pub primary_chunks_used: usize,
}

pub struct ContextExpander {
    graph: Arc<dyn DependencyGraphProvider>,
    estimator: Arc<dyn TokenEstimator>,
}

impl ContextExpander {
    pub fn new(graph: Arc<dyn DependencyGraphProvider>) -> Self {
        Self {
            graph,
            estimator: Arc::new(CharsPerFourEstimator),
        }
    }

    pub fn with_estimator(mut self, estimator: Arc<dyn TokenEstimator>) -> Self {
        self.estimator = estimator;
        self
    }

    /// Collect primary chunks, walk the dependency graph for first-order
    /// related chunks (imports/callers/tests), and greedily concatenate
    /// content until `token_budget` is exhausted.
    pub async fn expand(
        &self,
        ranked: &[SearchResult],
        token_budget: usize,
        filters: &ExpansionFilters,
    ) -> ContextBundle {
        let primaries: Vec<&CodeChunk> = ranked.iter().filter_map(|r| r.chunk.as_ref()).collect();

        let mut seen: HashSet<String> = HashSet::new();
        let mut pieces: Vec<String> = Vec::new();
        let mut token_count = 0usize;
        let mut truncated = false;
        let mut primary_chunks_used = 0usize;

        for chunk in &primaries {
            if !self.try_append(chunk, &mut seen, &mut pieces, &mut token_count, token_budget) {
                truncated = true;
                break;
            }
            primary_chunks_used += 1;

            for edge in self.graph.related(&chunk.id).await {
                if !filters.include_tests && edge.kind == EdgeKind::Test {
                    continue;
                }
                if !filters.include_interfaces
                    && matches!(edge.chunk.chunk_type, crate::domain::types::ChunkType::Interface)
                {
                    continue;
                }
                if !self.try_append(&edge.chunk, &mut seen, &mut pieces, &mut token_count, token_budget) {
                    truncated = true;
                    break;
                }
            }
            if truncated {
                break;
            }
        }

        // Any primary chunk beyond the one that overflowed the budget never
        // got a chance to run; that's also truncation.
        if !truncated && primary_chunks_used < primaries.len() {
            truncated = true;
        }

        ContextBundle {
            context_text: pieces.join("\n\n"),
            token_count,
            truncated,
            primary_chunks_used,
        }
    }

    fn try_append(
        &self,
        chunk: &CodeChunk,
        seen: &mut HashSet<String>,
        pieces: &mut Vec<String>,
        token_count: &mut usize,
        budget: usize,
    ) -> bool {
        if seen.contains(&chunk.id) {
            return true;
        }
        let tokens = self.estimator.estimate(&chunk.content);
        if *token_count + tokens > budget {
            return false;
        }
        seen.insert(chunk.id.clone());
        pieces.push(chunk.content.clone());
        *token_count += tokens;
        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::{ChunkType, Language, SearchMethod};

    fn chunk(id: &str, content: &str) -> CodeChunk {
        CodeChunk {
            id: id.to_string(),
            content: content.to_string(),
            nl_summary: String::new(),
            file_path: format!("{id}.rs"),
            start_line: 1,
            end_line: 1,
            language: Language::Rust,
            chunk_type: ChunkType::Function,
            name: id.to_string(),
            declarations: vec![],
            imports: vec![],
            exports: vec![],
            metadata: serde_json::json!({}),
        }
    }

    fn result(chunk: CodeChunk) -> SearchResult {
        SearchResult {
            id: chunk.id.clone(),
            file_path: chunk.file_path.clone(),
            start_line: chunk.start_line,
            content: chunk.content.clone(),
            score: 1.0,
            method: SearchMethod::Hybrid,
            chunk: Some(chunk),
            metadata: serde_json::Value::Null,
        }
    }

    #[tokio::test]
    async fn expands_within_budget_without_truncation() {
        let graph = Arc::new(InMemoryDependencyGraph::default());
        let expander = ContextExpander::new(graph);
        let ranked = vec![result(chunk("a", "short content"))];

        let bundle = expander.expand(&ranked, 1000, &ExpansionFilters::default()).await;
        assert!(!bundle.truncated);
        assert_eq!(bundle.primary_chunks_used, 1);
        assert!(bundle.context_text.contains("short content"));
    }

    #[tokio::test]
    async fn truncates_when_budget_exceeded() {
        let graph = Arc::new(InMemoryDependencyGraph::default());
        let expander = ContextExpander::new(graph);
        let ranked = vec![
            result(chunk("a", &"x".repeat(40))),
            result(chunk("b", &"y".repeat(40))),
        ];

        // budget fits exactly one chunk's ~10 tokens (40 chars / 4)
        let bundle = expander.expand(&ranked, 10, &ExpansionFilters::default()).await;
        assert!(bundle.truncated);
        assert_eq!(bundle.primary_chunks_used, 1);
    }

    #[tokio::test]
    async fn test_edges_excluded_unless_include_tests() {
        let mut graph = InMemoryDependencyGraph::default();
        graph.add_edge("a", EdgeKind::Test, chunk("a_test", "test content"));
        let graph = Arc::new(graph);
        let expander = ContextExpander::new(graph);
        let ranked = vec![result(chunk("a", "primary"))];

        let without = expander.expand(&ranked, 1000, &ExpansionFilters::default()).await;
        assert!(!without.context_text.contains("test content"));

        let filters = ExpansionFilters {
            include_tests: true,
            include_interfaces: false,
        };
        let with = expander.expand(&ranked, 1000, &filters).await;
        assert!(with.context_text.contains("test content"));
    }
}
