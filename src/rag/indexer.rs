//! Batch indexing: chunk → embed → upsert, one atomic batch per document.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use futures_util::stream::{self, StreamExt};
use serde::Serialize;

use super::chunker::{Chunk, Chunker, Document};
use super::store::{IndexEntry, VectorIndex};
use crate::core::errors::DocumentError;
use crate::llm::Embedder;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum DocumentStatus {
    Indexed { chunks: usize },
    Skipped,
    Failed { error: String },
}

#[derive(Debug, Clone, Serialize)]
pub struct DocumentReport {
    pub source_id: String,
    #[serde(flatten)]
    pub status: DocumentStatus,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct IndexTotals {
    pub documents: usize,
    pub indexed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub chunks: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct IndexReport {
    pub documents: Vec<DocumentReport>,
    pub totals: IndexTotals,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
}

pub struct Indexer {
    chunker: Arc<Chunker>,
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    concurrency: usize,
}

impl Indexer {
    pub fn new(
        chunker: Arc<Chunker>,
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        concurrency: usize,
    ) -> Self {
        Self {
            chunker,
            embedder,
            index,
            concurrency: concurrency.max(1),
        }
    }

    /// Indexes every document. A failing document is recorded in the report
    /// and the run moves on to the next one.
    pub async fn index(&self, documents: &[Document]) -> IndexReport {
        let started_at = Utc::now();
        tracing::info!(
            documents = documents.len(),
            tokenizer = self.chunker.tokenizer_name(),
            chunk_size = self.chunker.chunk_size(),
            overlap = self.chunker.overlap(),
            embed_model = self.embedder.model(),
            "indexing corpus"
        );

        let mut reports = Vec::with_capacity(documents.len());
        let mut totals = IndexTotals {
            documents: documents.len(),
            ..Default::default()
        };

        for document in documents {
            let status = match self.index_document(document).await {
                Ok(0) => {
                    tracing::warn!(source_id = %document.source_id, "document produced no chunks; skipped");
                    totals.skipped += 1;
                    DocumentStatus::Skipped
                }
                Ok(chunks) => {
                    tracing::info!(source_id = %document.source_id, chunks, "indexed document");
                    totals.indexed += 1;
                    totals.chunks += chunks;
                    DocumentStatus::Indexed { chunks }
                }
                Err(err) => {
                    tracing::warn!(source_id = %document.source_id, error = %err, "failed to index document");
                    totals.failed += 1;
                    DocumentStatus::Failed {
                        error: err.to_string(),
                    }
                }
            };

            reports.push(DocumentReport {
                source_id: document.source_id.clone(),
                status,
            });
        }

        IndexReport {
            documents: reports,
            totals,
            started_at,
            finished_at: Utc::now(),
        }
    }

    /// Indexes one document and returns how many chunks were written.
    ///
    /// Nothing is written unless every chunk was embedded.
    pub async fn index_document(&self, document: &Document) -> Result<usize, DocumentError> {
        let chunks = self.chunker.chunk_document(document)?;
        if chunks.is_empty() {
            return Ok(0);
        }

        let vectors = self.embed_chunks(&chunks).await?;
        let entries: Vec<IndexEntry> = chunks
            .into_iter()
            .zip(vectors)
            .map(|(chunk, vector)| IndexEntry::from_chunk(chunk, vector))
            .collect();

        Ok(self.index.upsert(entries).await?)
    }

    /// Embeds up to `concurrency` chunks at a time. Results are slotted back by
    /// chunk index, whatever order the calls complete in.
    async fn embed_chunks(&self, chunks: &[Chunk]) -> Result<Vec<Vec<f32>>, DocumentError> {
        let embedder = &self.embedder;
        let mut slots: Vec<Option<Vec<f32>>> = vec![None; chunks.len()];

        let mut pending = stream::iter(chunks.iter().enumerate().map(|(slot, chunk)| async move {
            (slot, chunk.chunk_index, embedder.embed(&chunk.text).await)
        }))
        .buffer_unordered(self.concurrency);

        while let Some((slot, chunk_index, result)) = pending.next().await {
            let vector = result.map_err(|source| DocumentError::Embedding {
                chunk_index,
                source,
            })?;
            slots[slot] = Some(vector);
        }

        Ok(slots.into_iter().flatten().collect())
    }
}
