//! Error kinds shared by the retrieval pipeline.
//!
//! None of these types know about HTTP status codes; the serving layer maps
//! them in `server::error`.

use std::time::Duration;

use thiserror::Error;

use crate::rag::pipeline::QueryStage;
use crate::rag::similarity::Metric;

#[derive(Debug, Error)]
pub enum EmbeddingError {
    #[error("embedding service unreachable: {0}")]
    Transport(String),
    #[error("embedding service timed out after {0:?}")]
    Timeout(Duration),
    #[error("embedding service returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("malformed embedding response: {0}")]
    Malformed(String),
}

impl EmbeddingError {
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            EmbeddingError::Timeout(timeout)
        } else if err.is_decode() {
            EmbeddingError::Malformed(err.to_string())
        } else {
            EmbeddingError::Transport(err.to_string())
        }
    }

    /// Transient failures worth another attempt under an explicit retry policy.
    pub fn is_transient(&self) -> bool {
        match self {
            EmbeddingError::Transport(_) | EmbeddingError::Timeout(_) => true,
            EmbeddingError::Status { status, .. } => *status == 429 || *status >= 500,
            EmbeddingError::Malformed(_) => false,
        }
    }
}

#[derive(Debug, Error)]
pub enum GenerationError {
    #[error("generation service unreachable: {0}")]
    Transport(String),
    #[error("generation service timed out after {0:?}")]
    Timeout(Duration),
    #[error("generation service returned {status}: {detail}")]
    Status { status: u16, detail: String },
    #[error("malformed generation response: {0}")]
    Malformed(String),
}

impl GenerationError {
    pub fn from_reqwest(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            GenerationError::Timeout(timeout)
        } else if err.is_decode() {
            GenerationError::Malformed(err.to_string())
        } else {
            GenerationError::Transport(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("vector index unavailable: {0}")]
    Unavailable(String),
    #[error("index was created with metric '{existing}', refusing to open it as '{requested}'")]
    MetricMismatch { existing: Metric, requested: Metric },
    #[error("vector dimension mismatch: index holds {expected}, got {actual}")]
    DimensionMismatch { expected: usize, actual: usize },
    #[error("corrupt index data: {0}")]
    Corrupt(String),
}

impl StoreError {
    pub fn unavailable<E: std::fmt::Display>(err: E) -> Self {
        StoreError::Unavailable(err.to_string())
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Invalid config at '{path}': {reason}")]
    Invalid { path: String, reason: String },
    #[error("failed to read config {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to parse config {path}: {reason}")]
    Parse { path: String, reason: String },
}

impl ConfigError {
    pub fn invalid(path: impl Into<String>, reason: impl Into<String>) -> Self {
        ConfigError::Invalid {
            path: path.into(),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Error)]
pub enum TokenizerError {
    #[error("failed to load tokenizer from {path}: {reason}")]
    Load { path: String, reason: String },
    #[error("failed to encode text: {0}")]
    Encode(String),
    #[error("token span {start}..{end} does not fall on character boundaries")]
    Span { start: usize, end: usize },
}

/// Terminal failure of one question/answer cycle.
#[derive(Debug, Error)]
pub enum QueryError {
    #[error(transparent)]
    Embedding(#[from] EmbeddingError),
    #[error(transparent)]
    Store(#[from] StoreError),
    #[error(transparent)]
    Generation(#[from] GenerationError),
}

impl QueryError {
    pub fn kind(&self) -> &'static str {
        match self {
            QueryError::Embedding(_) => "embedding_error",
            QueryError::Store(_) => "store_error",
            QueryError::Generation(_) => "generation_error",
        }
    }

    pub fn failed_stage(&self) -> QueryStage {
        match self {
            QueryError::Embedding(_) => QueryStage::EmbeddingQuery,
            QueryError::Store(_) => QueryStage::Retrieving,
            QueryError::Generation(_) => QueryStage::Generating,
        }
    }
}

/// Why a single document could not be indexed.
#[derive(Debug, Error)]
pub enum DocumentError {
    #[error("tokenization failed: {0}")]
    Tokenize(#[from] TokenizerError),
    #[error("chunk {chunk_index} could not be embedded: {source}")]
    Embedding {
        chunk_index: usize,
        #[source]
        source: EmbeddingError,
    },
    #[error("upsert failed: {0}")]
    Store(#[from] StoreError),
}
