//! Error handling types
//!
//! A single `thiserror`-derived enum carries every fallible outcome across
//! module boundaries. Each of the six kinds spec.md §7 names wraps a small
//! message-carrying sub-error owned by its module, the same way the
//! original crate kept `VectorDb`/`Embedding`/`Config` as flat
//! `{ message: String }` variants.

use thiserror::Error;

/// Result type alias for operations that can fail
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for the code retrieval engine
#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {source}")]
    Io {
        #[from]
        source: std::io::Error,
    },

    #[error("JSON error: {source}")]
    Json {
        #[from]
        source: serde_json::Error,
    },

    #[error("Generic error: {0}")]
    Generic(#[from] Box<dyn std::error::Error + Send + Sync>),

    #[error("UTF-8 encoding error: {0}")]
    Utf8(#[from] std::string::FromUtf8Error),

    #[error("String error: {0}")]
    String(String),

    #[error("Not found: {resource}")]
    NotFound { resource: String },

    #[error("Invalid argument: {message}")]
    InvalidArgument { message: String },

    #[error("Configuration error: {message}")]
    Config { message: String },

    #[error("Internal error: {message}")]
    Internal { message: String },

    /// Embedding provider failures: connect, timeout, HTTP status, malformed response.
    #[error("Embedding error: {0}")]
    Embed(#[from] crate::embedding::EmbedError),

    /// VectorStore failures: connect, upsert, query, delete, count, invalid id.
    #[error("Vector store error: {0}")]
    Store(#[from] crate::vector_store::StoreError),

    /// BM25 persistence failures.
    #[error("Index error: {0}")]
    Index(#[from] crate::bm25::IndexError),

    /// Backend detection/start failures.
    #[error("Model lifecycle error: {0}")]
    ModelLifecycle(#[from] crate::model_lifecycle::ModelLifecycleError),

    /// Benchmark generator/metric-computation failures.
    #[error("Benchmark error: {0}")]
    Benchmark(#[from] crate::benchmark::BenchmarkError),

    /// Operation interrupted by a cancellation signal.
    #[error("operation cancelled")]
    Cancelled,
}

impl Error {
    /// Create a generic error
    pub fn generic<S: Into<String>>(message: S) -> Self {
        Self::Generic(message.into().into())
    }

    /// Create a not found error
    pub fn not_found<S: Into<String>>(resource: S) -> Self {
        Self::NotFound {
            resource: resource.into(),
        }
    }

    /// Create an invalid argument error
    pub fn invalid_argument<S: Into<String>>(message: S) -> Self {
        Self::InvalidArgument {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn config<S: Into<String>>(message: S) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal<S: Into<String>>(message: S) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }
}

impl From<&str> for Error {
    fn from(s: &str) -> Self {
        Self::String(s.to_string())
    }
}

impl From<String> for Error {
    fn from(s: String) -> Self {
        Self::String(s)
    }
}

impl From<figment::Error> for Error {
    fn from(err: figment::Error) -> Self {
        Self::Config {
            message: err.to_string(),
        }
    }
}
