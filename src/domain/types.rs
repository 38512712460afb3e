//! Core domain entities for the code retrieval engine
//!
//! These are the business entities the chunk producer, the two retrieval
//! indices, and the benchmark runner all share. None of them own any I/O;
//! they are plain data with invariants enforced via `validator`, the same
//! way the teacher annotates its domain structs.

use crate::infrastructure::constants::QUERY_DEFAULT_TOP_K;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use validator::Validate;

/// AI semantic embedding for a single chunk.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default, Validate)]
pub struct Embedding {
    /// The embedding vector values
    #[validate(length(min = 1, message = "Embedding vector cannot be empty"))]
    pub vector: Vec<f32>,
    /// Name of the model that generated this embedding
    #[validate(length(min = 1, message = "Model name cannot be empty"))]
    pub model: String,
    /// Dimensionality of the embedding vector
    #[validate(range(min = 1, message = "Dimensions must be positive"))]
    pub dimensions: usize,
}

/// The kind of source construct a chunk represents.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ChunkType {
    Function,
    Class,
    Method,
    Interface,
    Module,
    Block,
    /// Any construct the producer doesn't map onto the variants above.
    Other(String),
}

impl std::fmt::Display for ChunkType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Function => write!(f, "function"),
            Self::Class => write!(f, "class"),
            Self::Method => write!(f, "method"),
            Self::Interface => write!(f, "interface"),
            Self::Module => write!(f, "module"),
            Self::Block => write!(f, "block"),
            Self::Other(s) => write!(f, "{s}"),
        }
    }
}

/// An indexed unit of code, produced by an external chunking collaborator.
///
/// Immutable once indexed; a re-index removes the previous chunk by `id`
/// and adds the replacement rather than mutating in place.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Validate)]
pub struct CodeChunk {
    /// Unique identifier for this code chunk
    #[validate(length(min = 1, message = "ID cannot be empty"))]
    pub id: String,
    /// The actual code content
    #[validate(length(
        min = 1,
        max = 10000,
        message = "Content must be between 1 and 10000 characters"
    ))]
    pub content: String,
    /// Natural-language summary produced by the ingestion pipeline
    #[serde(default)]
    pub nl_summary: String,
    /// Path to the source file
    #[validate(length(min = 1, message = "File path cannot be empty"))]
    pub file_path: String,
    /// Starting line number in the source file
    #[validate(range(min = 1, message = "Start line must be positive"))]
    pub start_line: u32,
    /// Ending line number in the source file
    #[validate(range(min = 1, message = "End line must be positive"))]
    pub end_line: u32,
    /// Programming language of the code
    pub language: Language,
    pub chunk_type: ChunkType,
    /// Declared/primary symbol name (function name, class name, ...)
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub declarations: Vec<String>,
    #[serde(default)]
    pub imports: Vec<String>,
    #[serde(default)]
    pub exports: Vec<String>,
    /// Additional metadata as JSON (context, AST info, etc.)
    pub metadata: serde_json::Value,
}

impl CodeChunk {
    /// Text the BM25 index tokenizes: content + summary + name + path.
    pub fn indexable_text(&self) -> String {
        format!(
            "{} {} {} {}",
            self.content, self.nl_summary, self.name, self.file_path
        )
    }
}

/// Supported programming languages
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
pub enum Language {
    Rust,
    Python,
    JavaScript,
    TypeScript,
    Go,
    Java,
    C,
    Cpp,
    CSharp,
    Php,
    Ruby,
    Swift,
    Kotlin,
    Scala,
    Haskell,
    Shell,
    SQL,
    HTML,
    XML,
    JSON,
    YAML,
    TOML,
    Markdown,
    PlainText,
    #[default]
    Unknown,
}

/// System operation types for metrics and rate limiting
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum OperationType {
    Indexing,
    Search,
    Embedding,
    Maintenance,
    Other(String),
}

impl std::fmt::Display for OperationType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            OperationType::Indexing => write!(f, "indexing"),
            OperationType::Search => write!(f, "search"),
            OperationType::Embedding => write!(f, "embedding"),
            OperationType::Maintenance => write!(f, "maintenance"),
            OperationType::Other(s) => write!(f, "{}", s),
        }
    }
}

impl From<&str> for OperationType {
    fn from(s: &str) -> Self {
        match s.to_lowercase().as_str() {
            "indexing" => OperationType::Indexing,
            "search" => OperationType::Search,
            "embedding" => OperationType::Embedding,
            "maintenance" => OperationType::Maintenance,
            _ => OperationType::Other(s.to_string()),
        }
    }
}

// =============================================================================
// Provider Kind Enums (Type-Safe Provider Selection)
// =============================================================================

/// Type-safe embedding provider selection.
///
/// Replaces string-based provider selection with compile-time type safety.
/// Invalid provider names are caught at config deserialization time. Variant
/// names match the `.coderag.yaml` `embedding.provider` vocabulary exactly.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum EmbeddingProviderKind {
    /// A locally-hosted service speaking the native embedding HTTP API.
    #[default]
    NativeLocal,
    /// Any service exposing an OpenAI-compatible `/v1/embeddings` endpoint.
    OpenAiCompatible,
    /// Hosted embedding API, vendor A.
    CloudA,
    /// Hosted embedding API, vendor B.
    CloudB,
}

impl std::fmt::Display for EmbeddingProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::NativeLocal => write!(f, "native-local"),
            Self::OpenAiCompatible => write!(f, "openai-compatible"),
            Self::CloudA => write!(f, "cloud-a"),
            Self::CloudB => write!(f, "cloud-b"),
        }
    }
}

impl EmbeddingProviderKind {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "native-local" => Some(Self::NativeLocal),
            "openai-compatible" => Some(Self::OpenAiCompatible),
            "cloud-a" => Some(Self::CloudA),
            "cloud-b" => Some(Self::CloudB),
            _ => None,
        }
    }

    pub fn supported_providers() -> &'static [&'static str] {
        &["native-local", "openai-compatible", "cloud-a", "cloud-b"]
    }
}

/// Type-safe vector store provider selection
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum VectorStoreProviderKind {
    /// In-memory vector store (the only shipped adapter)
    #[serde(rename = "in-memory")]
    #[default]
    InMemory,
}

impl std::fmt::Display for VectorStoreProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::InMemory => write!(f, "in-memory"),
        }
    }
}

impl VectorStoreProviderKind {
    pub fn from_string(s: &str) -> Option<Self> {
        match s.to_lowercase().as_str() {
            "in-memory" | "inmemory" => Some(Self::InMemory),
            _ => None,
        }
    }

    pub fn supported_providers() -> Vec<&'static str> {
        vec!["in-memory"]
    }
}

/// Query performance metrics tracking
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct QueryPerformanceMetrics {
    pub total_queries: u64,
    pub average_latency: f64,
    pub p99_latency: f64,
    pub success_rate: f64,
}

/// Cache performance metrics tracking
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheMetrics {
    pub hits: u64,
    pub misses: u64,
    pub hit_rate: f64,
    pub size: u64,
}

impl Language {
    pub fn from_extension(ext: &str) -> Self {
        match ext.to_lowercase().as_str() {
            "rs" => Language::Rust,
            "py" => Language::Python,
            "js" | "jsx" | "mjs" => Language::JavaScript,
            "ts" | "tsx" => Language::TypeScript,
            "go" => Language::Go,
            "java" => Language::Java,
            "c" | "h" => Language::C,
            "cpp" | "cc" | "cxx" | "hpp" => Language::Cpp,
            "cs" => Language::CSharp,
            "php" => Language::Php,
            "rb" => Language::Ruby,
            "swift" => Language::Swift,
            "kt" | "kts" => Language::Kotlin,
            "scala" => Language::Scala,
            "hs" => Language::Haskell,
            "sh" | "bash" | "zsh" | "fish" => Language::Shell,
            "sql" => Language::SQL,
            "html" | "htm" => Language::HTML,
            "xml" => Language::XML,
            "json" => Language::JSON,
            "yaml" | "yml" => Language::YAML,
            "toml" => Language::TOML,
            "md" | "markdown" => Language::Markdown,
            "txt" | "text" => Language::PlainText,
            _ => Language::Unknown,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Language::Rust => "Rust",
            Language::Python => "Python",
            Language::JavaScript => "JavaScript",
            Language::TypeScript => "TypeScript",
            Language::Go => "Go",
            Language::Java => "Java",
            Language::C => "C",
            Language::Cpp => "Cpp",
            Language::CSharp => "CSharp",
            Language::Php => "Php",
            Language::Ruby => "Ruby",
            Language::Swift => "Swift",
            Language::Kotlin => "Kotlin",
            Language::Scala => "Scala",
            Language::Haskell => "Haskell",
            Language::Shell => "Shell",
            Language::SQL => "SQL",
            Language::HTML => "HTML",
            Language::XML => "XML",
            Language::JSON => "JSON",
            Language::YAML => "YAML",
            Language::TOML => "TOML",
            Language::Markdown => "Markdown",
            Language::PlainText => "PlainText",
            Language::Unknown => "Unknown",
        }
    }
}

impl std::fmt::Display for Language {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl std::str::FromStr for Language {
    type Err = ();

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "Rust" => Ok(Language::Rust),
            "Python" => Ok(Language::Python),
            "JavaScript" => Ok(Language::JavaScript),
            "TypeScript" => Ok(Language::TypeScript),
            "Go" => Ok(Language::Go),
            "Java" => Ok(Language::Java),
            "C" => Ok(Language::C),
            "Cpp" => Ok(Language::Cpp),
            "CSharp" => Ok(Language::CSharp),
            "Php" => Ok(Language::Php),
            "Ruby" => Ok(Language::Ruby),
            "Swift" => Ok(Language::Swift),
            "Kotlin" => Ok(Language::Kotlin),
            "Scala" => Ok(Language::Scala),
            "Haskell" => Ok(Language::Haskell),
            "Shell" => Ok(Language::Shell),
            "SQL" => Ok(Language::SQL),
            "HTML" => Ok(Language::HTML),
            "XML" => Ok(Language::XML),
            "JSON" => Ok(Language::JSON),
            "YAML" => Ok(Language::YAML),
            "TOML" => Ok(Language::TOML),
            "Markdown" => Ok(Language::Markdown),
            "PlainText" => Ok(Language::PlainText),
            _ => Ok(Language::Unknown),
        }
    }
}

/// Which retrieval path produced a `SearchResult`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SearchMethod {
    Bm25,
    Vector,
    Hybrid,
}

/// A transient, non-persisted retrieval result.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SearchResult {
    pub id: String,
    pub file_path: String,
    pub start_line: u32,
    pub content: String,
    pub score: f32,
    pub method: SearchMethod,
    /// Hydrated chunk data, when available from the index that produced this result.
    pub chunk: Option<CodeChunk>,
    pub metadata: serde_json::Value,
}

/// Indexing statistics
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexingStats {
    pub total_files: u32,
    pub indexed_files: u32,
    pub total_chunks: u32,
    pub duration_ms: u64,
}

/// Configuration for embedding providers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct EmbeddingConfig {
    #[validate(length(min = 1))]
    pub provider: String,
    #[validate(length(min = 1))]
    pub model: String,
    pub api_key: Option<String>,
    pub base_url: Option<String>,
    pub dimensions: Option<usize>,
    pub max_tokens: Option<usize>,
    /// Maximum chunks sent in a single embed request; the rest are split into
    /// additional batches.
    pub max_batch_size: Option<usize>,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            provider: "native-local".to_string(),
            model: "nomic-embed-text".to_string(),
            api_key: None,
            base_url: None,
            dimensions: Some(768),
            max_tokens: None,
            max_batch_size: Some(100),
        }
    }
}

/// Configuration for vector store providers
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct VectorStoreConfig {
    #[validate(length(min = 1))]
    pub provider: String,
    pub address: Option<String>,
    pub token: Option<String>,
    pub collection: Option<String>,
    pub dimensions: Option<usize>,
    pub timeout_secs: Option<u64>,
}

impl Default for VectorStoreConfig {
    fn default() -> Self {
        Self {
            provider: "in-memory".to_string(),
            address: None,
            token: None,
            collection: None,
            dimensions: Some(768),
            timeout_secs: Some(30),
        }
    }
}

/// Optional post-fusion filters applied before truncation to `top_k`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QueryFilters {
    pub language: Option<Language>,
    pub file_path_substring: Option<String>,
    pub chunk_type: Option<ChunkType>,
}

/// A natural-language retrieval request.
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct Query {
    #[validate(length(min = 1, message = "Query text cannot be empty"))]
    pub text: String,
    #[validate(range(min = 1, max = 100, message = "top_k must be in 1..=100"))]
    pub top_k: usize,
    pub vector_weight: Option<f32>,
    pub bm25_weight: Option<f32>,
    #[serde(default)]
    pub filters: Option<QueryFilters>,
}

impl Query {
    pub fn new(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            top_k: QUERY_DEFAULT_TOP_K,
            vector_weight: None,
            bm25_weight: None,
            filters: None,
        }
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Resolve weights: if only one is given, the other defaults to
    /// `1 - w`; if neither is given, fall back to `defaults`.
    pub fn resolve_weights(&self, default_vector: f32, default_bm25: f32) -> (f32, f32) {
        match (self.vector_weight, self.bm25_weight) {
            (Some(v), Some(b)) => (v, b),
            (Some(v), None) => (v, 1.0 - v),
            (None, Some(b)) => (1.0 - b, b),
            (None, None) => (default_vector, default_bm25),
        }
    }
}

/// How the embedding backend is hosted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendType {
    Native,
    Containerized,
}

/// Snapshot of the managed embedding backend's state.
///
/// The live `std::process::Child`/container handle isn't `Clone`, so it's
/// held privately by `ModelLifecycleManager`; this struct carries only the
/// introspectable pid/container id.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BackendInfo {
    pub backend_type: BackendType,
    pub base_url: String,
    pub process_pid: Option<u32>,
    pub container_id: Option<String>,
    pub managed_by_us: bool,
}

/// The kind of query a benchmark generator produced.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum QueryType {
    Keyword,
    Caller,
    Test,
    Import,
    Summary,
}

impl std::fmt::Display for QueryType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Keyword => write!(f, "keyword"),
            Self::Caller => write!(f, "caller"),
            Self::Test => write!(f, "test"),
            Self::Import => write!(f, "import"),
            Self::Summary => write!(f, "summary"),
        }
    }
}

/// A deterministically-generated benchmark query with its expected answer set.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BenchmarkQuery {
    pub query: String,
    pub expected_chunk_ids: HashSet<String>,
    pub query_type: QueryType,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_weight_resolution() {
        let q = Query::new("x");
        assert_eq!(q.resolve_weights(0.7, 0.3), (0.7, 0.3));

        let q = Query {
            vector_weight: Some(1.0),
            ..Query::new("x")
        };
        assert_eq!(q.resolve_weights(0.7, 0.3), (1.0, 0.0));

        let q = Query {
            bm25_weight: Some(0.4),
            ..Query::new("x")
        };
        assert_eq!(q.resolve_weights(0.7, 0.3), (0.6, 0.4));
    }

    #[test]
    fn language_roundtrip_from_extension() {
        assert_eq!(Language::from_extension("rs"), Language::Rust);
        assert_eq!(Language::from_extension("PY"), Language::Python);
        assert_eq!(Language::from_extension("weird"), Language::Unknown);
    }

    #[test]
    fn chunk_indexable_text_joins_fields() {
        let chunk = CodeChunk {
            id: "1".into(),
            content: "fn parseConfigFile() {}".into(),
            nl_summary: "parses a config file".into(),
            file_path: "src/config.rs".into(),
            language: Language::Rust,
            start_line: 1,
            end_line: 3,
            chunk_type: ChunkType::Function,
            name: "parseConfigFile".into(),
            declarations: vec![],
            imports: vec![],
            exports: vec![],
            metadata: serde_json::json!({}),
        };
        let text = chunk.indexable_text();
        assert!(text.contains("parseConfigFile"));
        assert!(text.contains("parses a config file"));
        assert!(text.contains("src/config.rs"));
    }
}
