//! # Code Retrieval Engine
//!
//! A local hybrid code retrieval engine for AI coding assistants: it answers
//! natural-language queries over an already-chunked source tree by fusing
//! lexical (BM25) and dense (vector) retrieval, optionally re-ranking and
//! expanding results along a dependency graph under a token budget.
//!
//! ## Scope
//!
//! This crate owns the retrieval core:
//!
//! - [`bm25`] — the sparse lexical index.
//! - [`vector_store`] — the dense vector store port plus an in-memory
//!   reference implementation.
//! - [`embedding`] — the embedding-provider port plus concrete HTTP-backed
//!   providers.
//! - [`model_lifecycle`] — auto-detection/start/health/stop of a local
//!   embedding backend and its model.
//! - [`rerank`] — the optional re-ranking stage.
//! - [`hybrid_search`] — reciprocal-rank-fusion orchestration across BM25
//!   and the vector store.
//! - [`context`] — dependency-graph-aware context bundling under a token
//!   budget.
//! - [`benchmark`] — deterministic query generation and IR-metric scoring.
//!
//! Source parsing/chunking, the byte-addressable persistence backends
//! behind [`vector_store::VectorStore`], CLI/HTTP transports, and
//! issue-tracker/docs ingestion are external collaborators this crate does
//! not own; it exposes the ports they plug into ([`domain::types::Chunk`],
//! [`vector_store::VectorStore`]) and nothing more.
//!
//! ## Quick start
//!
//! ```no_run
//! use coderag_engine::bm25::Bm25Index;
//! use coderag_engine::domain::types::Query;
//! use coderag_engine::hybrid_search::HybridSearch;
//! use coderag_engine::vector_store::in_memory::InMemoryVectorStore;
//! use coderag_engine::embedding::null::NullEmbeddingProvider;
//! use std::sync::Arc;
//!
//! # async fn run() -> coderag_engine::domain::error::Result<()> {
//! let bm25 = Arc::new(Bm25Index::new());
//! let vectors = Arc::new(InMemoryVectorStore::new(384));
//! let embedder = Arc::new(NullEmbeddingProvider::new(384));
//! let search = HybridSearch::new(bm25, vectors, embedder);
//!
//! let query = Query::new("parse config file");
//! let _results = search.search(&query).await?;
//! # Ok(())
//! # }
//! ```

pub mod adapters;
pub mod benchmark;
pub mod bm25;
pub mod context;
pub mod domain;
pub mod embedding;
pub mod engine_config;
pub mod hybrid_search;
pub mod infrastructure;
pub mod model_lifecycle;
pub mod rerank;
pub mod vector_store;

// Re-export core types for public API
pub use domain::error::{Error, Result};
pub use domain::types::*;

// Re-export the retrieval engine's primary entry points
pub use benchmark::BenchmarkRunner;
pub use context::ContextExpander;
pub use hybrid_search::HybridSearch;
pub use model_lifecycle::ModelLifecycleManager;
