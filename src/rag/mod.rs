//! Retrieval-augmented question answering.
//!
//! - `Chunker`: token windows over documents
//! - `Indexer`: chunk → embed → upsert for a corpus
//! - `VectorIndex`: nearest-neighbor storage (`SqliteVectorIndex`, `MemoryVectorIndex`)
//! - `Retriever` / `QueryPipeline`: question → grounded answer with sources

pub mod chunker;
pub mod corpus;
pub mod indexer;
pub mod memory;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod similarity;
pub mod sqlite;
pub mod store;
pub mod tokenizer;

#[cfg(test)]
mod tests;

use std::sync::Arc;

pub use chunker::{Chunk, Chunker, Document};
pub use corpus::load_documents;
pub use indexer::{DocumentReport, DocumentStatus, IndexReport, IndexTotals, Indexer};
pub use memory::MemoryVectorIndex;
pub use pipeline::{QueryAnswer, QueryPipeline, QueryStage};
pub use prompt::{build_prompt, ContextBudget};
pub use retriever::Retriever;
pub use similarity::Metric;
pub use sqlite::SqliteVectorIndex;
pub use store::{ChunkMetadata, IndexEntry, IndexLocation, SearchHit, VectorIndex};
pub use tokenizer::{build_tokenizer, Tokenizer};

use crate::core::errors::StoreError;

/// Opens the index backend for `location`.
pub async fn open_index(
    location: &IndexLocation,
    metric: Metric,
) -> Result<Arc<dyn VectorIndex>, StoreError> {
    match location {
        IndexLocation::Persistent(path) => {
            let index = SqliteVectorIndex::create_or_open(path.clone(), metric).await?;
            Ok(Arc::new(index))
        }
        IndexLocation::InMemory => Ok(Arc::new(MemoryVectorIndex::new(metric))),
    }
}
