//! Query generators (spec.md §4.8): deterministically derive a benchmark
//! query + expected answer set from the indexed chunk corpus and the
//! dependency graph.

use super::rng::SeededRng;
use crate::context::{DependencyGraphProvider, EdgeKind};
use crate::domain::types::{BenchmarkQuery, CodeChunk, QueryType};
use std::collections::HashSet;

/// A salient identifier for a chunk: its declared name, else its first
/// declaration, else the longest alphabetic token in its content.
fn salient_identifier(chunk: &CodeChunk) -> Option<String> {
    if !chunk.name.is_empty() {
        return Some(chunk.name.clone());
    }
    if let Some(first) = chunk.declarations.first() {
        return Some(first.clone());
    }
    chunk
        .content
        .split(|c: char| !c.is_alphanumeric() && c != '_')
        .filter(|w| w.len() >= 4)
        .max_by_key(|w| w.len())
        .map(str::to_string)
}

pub fn generate_keyword(chunks: &[CodeChunk], rng: &mut SeededRng) -> Option<BenchmarkQuery> {
    if chunks.is_empty() {
        return None;
    }
    let order = rng.shuffled_indices(chunks.len());
    for idx in order {
        let chunk = &chunks[idx];
        if let Some(identifier) = salient_identifier(chunk) {
            return Some(BenchmarkQuery {
                query: identifier,
                expected_chunk_ids: HashSet::from([chunk.id.clone()]),
                query_type: QueryType::Keyword,
            });
        }
    }
    None
}

pub fn generate_summary(chunks: &[CodeChunk], rng: &mut SeededRng) -> Option<BenchmarkQuery> {
    if chunks.is_empty() {
        return None;
    }
    let order = rng.shuffled_indices(chunks.len());
    for idx in order {
        let chunk = &chunks[idx];
        if !chunk.nl_summary.trim().is_empty() {
            return Some(BenchmarkQuery {
                query: chunk.nl_summary.clone(),
                expected_chunk_ids: HashSet::from([chunk.id.clone()]),
                query_type: QueryType::Summary,
            });
        }
    }
    None
}

/// `caller`: given an edge `A -> B` of kind `Caller` (A calls B), query for
/// a keyword unique to B, expecting both A and B (spec.md §4.8).
pub async fn generate_caller(
    graph: &dyn DependencyGraphProvider,
    rng: &mut SeededRng,
) -> Option<BenchmarkQuery> {
    let edges: Vec<_> = graph
        .all_edges()
        .await
        .into_iter()
        .filter(|(_, edge)| edge.kind == EdgeKind::Caller)
        .collect();
    if edges.is_empty() {
        return None;
    }
    let idx = rng.next_index(edges.len());
    let (caller_id, edge) = &edges[idx];
    let identifier = salient_identifier(&edge.chunk)?;
    Some(BenchmarkQuery {
        query: identifier,
        expected_chunk_ids: HashSet::from([caller_id.clone(), edge.chunk.id.clone()]),
        query_type: QueryType::Caller,
    })
}

/// `test`: for a non-test chunk with a `Test` edge to its test chunk, query
/// on the non-test chunk's name, expecting the test chunk.
pub async fn generate_test(
    graph: &dyn DependencyGraphProvider,
    rng: &mut SeededRng,
) -> Option<BenchmarkQuery> {
    let edges: Vec<_> = graph
        .all_edges()
        .await
        .into_iter()
        .filter(|(_, edge)| edge.kind == EdgeKind::Test)
        .collect();
    if edges.is_empty() {
        return None;
    }
    let idx = rng.next_index(edges.len());
    let (source_id, edge) = &edges[idx];
    let source_chunk = graph.get_chunk(source_id).await;
    let identifier = source_chunk
        .as_ref()
        .and_then(salient_identifier)
        .or_else(|| Some(source_id.clone()))?;
    Some(BenchmarkQuery {
        query: identifier,
        expected_chunk_ids: HashSet::from([edge.chunk.id.clone()]),
        query_type: QueryType::Test,
    })
}

/// `import`: given an edge `A -> B` of kind `Import` (A imports symbol B),
/// use B's name as the query, expecting the importer A.
pub async fn generate_import(
    graph: &dyn DependencyGraphProvider,
    rng: &mut SeededRng,
) -> Option<BenchmarkQuery> {
    let edges: Vec<_> = graph
        .all_edges()
        .await
        .into_iter()
        .filter(|(_, edge)| edge.kind == EdgeKind::Import)
        .collect();
    if edges.is_empty() {
        return None;
    }
    let idx = rng.next_index(edges.len());
    let (importer_id, edge) = &edges[idx];
    let identifier = salient_identifier(&edge.chunk)?;
    Some(BenchmarkQuery {
        query: identifier,
        expected_chunk_ids: HashSet::from([importer_id.clone()]),
        query_type: QueryType::Import,
    })
}
