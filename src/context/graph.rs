//! Dependency-graph collaborator interface (spec.md §2: "external
//! collaborator" the retrieval core depends on but does not own).
//!
//! The in-memory implementation here is a test/reference adapter; a real
//! deployment loads the persisted graph the ingestion pipeline writes
//! (spec.md §1 excludes the graph's persistence format from this core).

use crate::domain::types::CodeChunk;
use async_trait::async_trait;
use std::collections::HashMap;

/// Directed edge kinds the context expander and benchmark query generators
/// care about (spec.md GLOSSARY: "directed edges between chunks for
/// imports, calls, tests").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EdgeKind {
    Import,
    Caller,
    Test,
}

/// A first-order related chunk reached via one edge from some source chunk.
#[derive(Debug, Clone)]
pub struct DependencyEdge {
    pub kind: EdgeKind,
    pub chunk: CodeChunk,
}

/// First-order graph walk: related chunks for a given chunk id.
///
/// Per spec.md §9 open question, a missing/unloaded graph is tolerated
/// silently: implementations should return an empty list rather than an
/// error when the graph isn't available.
#[async_trait]
pub trait DependencyGraphProvider: Send + Sync {
    async fn related(&self, chunk_id: &str) -> Vec<DependencyEdge>;

    /// Every `(source_chunk_id, edge)` pair in the graph, for the benchmark
    /// query generators that need to enumerate caller/import edges rather
    /// than walk from a single chunk. Per spec.md §9, a provider backed by a
    /// graph that failed to load returns an empty list rather than an
    /// error; the caller/import generators then simply produce no queries
    /// of those types.
    async fn all_edges(&self) -> Vec<(String, DependencyEdge)> {
        Vec::new()
    }

    /// Resolve a bare chunk id (as seen on the source side of `all_edges`)
    /// back into its full `CodeChunk`, for generators that need the source
    /// node's own content/name rather than the edge target's. Returns
    /// `None` when the provider has no chunk registry (e.g. a pure
    /// edge-walking adapter).
    async fn get_chunk(&self, _chunk_id: &str) -> Option<CodeChunk> {
        None
    }
}

/// Reference adapter: edges and their source chunks held in memory.
#[derive(Default)]
pub struct InMemoryDependencyGraph {
    edges: HashMap<String, Vec<DependencyEdge>>,
    chunks: HashMap<String, CodeChunk>,
}

impl InMemoryDependencyGraph {
    pub fn add_edge(&mut self, from: &str, kind: EdgeKind, to: CodeChunk) {
        self.edges
            .entry(from.to_string())
            .or_default()
            .push(DependencyEdge { kind, chunk: to });
    }

    /// Register a chunk so it can be resolved by id via `get_chunk`, e.g.
    /// the non-test source chunk of a `Test` edge.
    pub fn add_chunk(&mut self, chunk: CodeChunk) {
        self.chunks.insert(chunk.id.clone(), chunk);
    }
}

#[async_trait]
impl DependencyGraphProvider for InMemoryDependencyGraph {
    async fn related(&self, chunk_id: &str) -> Vec<DependencyEdge> {
        self.edges.get(chunk_id).cloned().unwrap_or_default()
    }

    async fn all_edges(&self) -> Vec<(String, DependencyEdge)> {
        self.edges
            .iter()
            .flat_map(|(from, edges)| edges.iter().map(move |e| (from.clone(), e.clone())))
            .collect()
    }

    async fn get_chunk(&self, chunk_id: &str) -> Option<CodeChunk> {
        self.chunks.get(chunk_id).cloned()
    }
}
