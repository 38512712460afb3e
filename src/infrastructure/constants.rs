//! Shared magic numbers for the retrieval core.
//!
//! Centralizes configuration of timeout values, limits, and other
//! cross-module defaults to ensure consistency and enable easy
//! customization, the same way the teacher keeps these constants in one
//! place instead of scattering them per-module.

use std::time::Duration;

// ============================================================================
// BM25 tokenizer
// ============================================================================

/// Tokens shorter than this are dropped during tokenization (spec.md §4.1).
pub const BM25_TOKEN_MIN_LENGTH: usize = 2;

// ============================================================================
// Retrieval core configuration
// ============================================================================

/// Reciprocal Rank Fusion constant `k` (spec.md §4.6).
pub const RRF_K: f64 = 60.0;

/// Default RRF weight applied to vector-store ranks.
pub const RRF_DEFAULT_VECTOR_WEIGHT: f32 = 0.7;

/// Default RRF weight applied to BM25 ranks.
pub const RRF_DEFAULT_BM25_WEIGHT: f32 = 0.3;

/// Default `Query::top_k` when the caller doesn't specify one.
pub const QUERY_DEFAULT_TOP_K: usize = 10;

/// Upper bound accepted for `Query::top_k`.
pub const QUERY_MAX_TOP_K: usize = 100;

/// Default maximum batch size for `EmbeddingProvider::embed` (spec.md §4.3).
pub const EMBEDDING_DEFAULT_MAX_BATCH_SIZE: usize = 100;

/// Cadence at which `ModelLifecycleManager` polls the health endpoint while
/// waiting for a managed backend to come up.
pub const MODEL_LIFECYCLE_HEALTH_POLL_INTERVAL: Duration = Duration::from_millis(500);

/// Default ceiling on how long `ModelLifecycleManager` waits for a managed
/// backend to become healthy before failing the start attempt.
pub const MODEL_LIFECYCLE_HEALTH_TIMEOUT: Duration = Duration::from_secs(60);

/// `k` cutoff used for nDCG@k / Recall@k in `benchmark::metrics`.
pub const BENCHMARK_METRIC_CUTOFF: usize = 10;

/// `k` cutoff used for Precision@k in `benchmark::metrics`.
pub const BENCHMARK_PRECISION_CUTOFF: usize = 5;
