//! Nearest-neighbor storage interface shared by the index backends.
//!
//! Two backends implement it: `SqliteVectorIndex` (durable) and
//! `MemoryVectorIndex` (ephemeral). Both fix their similarity metric when
//! created and apply each upsert batch atomically.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::chunker::Chunk;
use super::similarity::Metric;
use crate::core::errors::StoreError;

/// Attribution stored alongside every entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChunkMetadata {
    pub source_id: String,
    pub chunk_index: usize,
}

/// One embedded chunk, keyed by `chunk_id`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IndexEntry {
    pub chunk_id: String,
    pub vector: Vec<f32>,
    pub document_text: String,
    pub metadata: ChunkMetadata,
}

impl IndexEntry {
    pub fn from_chunk(chunk: Chunk, vector: Vec<f32>) -> Self {
        Self {
            chunk_id: chunk.id,
            vector,
            document_text: chunk.text,
            metadata: ChunkMetadata {
                source_id: chunk.source_id,
                chunk_index: chunk.chunk_index,
            },
        }
    }
}

/// Result of a similarity search.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchHit {
    pub chunk_id: String,
    pub document_text: String,
    pub metadata: ChunkMetadata,
    /// Similarity score (higher = better).
    pub score: f32,
}

/// Where an index lives.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexLocation {
    Persistent(PathBuf),
    InMemory,
}

impl fmt::Display for IndexLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IndexLocation::Persistent(path) => write!(f, "{}", path.display()),
            IndexLocation::InMemory => f.write_str(":memory:"),
        }
    }
}

#[async_trait]
pub trait VectorIndex: Send + Sync {
    /// Metric fixed when the index was created.
    fn metric(&self) -> Metric;

    fn location(&self) -> &IndexLocation;

    /// Inserts or replaces entries by `chunk_id`. The whole batch lands or none of it.
    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, StoreError>;

    /// Up to `top_k` entries, highest score first.
    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, StoreError>;

    async fn count(&self) -> Result<usize, StoreError>;

    /// Releases underlying handles. Safe to call more than once.
    async fn close(&self);
}

/// Rejects batches that mix dimensions or disagree with the index.
pub(crate) fn check_batch_dimension(
    entries: &[IndexEntry],
    expected: Option<usize>,
) -> Result<Option<usize>, StoreError> {
    let mut dimension = expected;
    for entry in entries {
        let actual = entry.vector.len();
        if actual == 0 {
            return Err(StoreError::DimensionMismatch {
                expected: dimension.unwrap_or(0),
                actual,
            });
        }
        match dimension {
            Some(expected) if expected != actual => {
                return Err(StoreError::DimensionMismatch { expected, actual });
            }
            Some(_) => {}
            None => dimension = Some(actual),
        }
    }
    Ok(dimension)
}
