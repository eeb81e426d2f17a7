//! Ephemeral vector index for tests and throwaway runs. Nothing is persisted.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::similarity::{sort_descending, Metric};
use super::store::{check_batch_dimension, IndexEntry, IndexLocation, SearchHit, VectorIndex};
use crate::core::errors::StoreError;

#[derive(Default)]
struct Entries {
    // insertion order, so ties rank the same way as the SQLite backend
    order: Vec<String>,
    by_id: HashMap<String, IndexEntry>,
    dimension: Option<usize>,
}

pub struct MemoryVectorIndex {
    metric: Metric,
    location: IndexLocation,
    entries: RwLock<Entries>,
}

impl MemoryVectorIndex {
    pub fn new(metric: Metric) -> Self {
        Self {
            metric,
            location: IndexLocation::InMemory,
            entries: RwLock::new(Entries::default()),
        }
    }
}

#[async_trait]
impl VectorIndex for MemoryVectorIndex {
    fn metric(&self) -> Metric {
        self.metric
    }

    fn location(&self) -> &IndexLocation {
        &self.location
    }

    async fn upsert(&self, entries: Vec<IndexEntry>) -> Result<usize, StoreError> {
        let mut state = self.entries.write().await;
        state.dimension = check_batch_dimension(&entries, state.dimension)?;

        let written = entries.len();
        for entry in entries {
            if !state.by_id.contains_key(&entry.chunk_id) {
                state.order.push(entry.chunk_id.clone());
            }
            state.by_id.insert(entry.chunk_id.clone(), entry);
        }
        Ok(written)
    }

    async fn query(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, StoreError> {
        let state = self.entries.read().await;
        if top_k == 0 || state.by_id.is_empty() {
            return Ok(Vec::new());
        }
        if let Some(expected) = state.dimension.filter(|d| *d != vector.len()) {
            return Err(StoreError::DimensionMismatch {
                expected,
                actual: vector.len(),
            });
        }

        let mut hits: Vec<SearchHit> = state
            .order
            .iter()
            .filter_map(|id| state.by_id.get(id))
            .map(|entry| SearchHit {
                chunk_id: entry.chunk_id.clone(),
                document_text: entry.document_text.clone(),
                metadata: entry.metadata.clone(),
                score: self.metric.score(vector, &entry.vector),
            })
            .collect();

        sort_descending(&mut hits, |hit| hit.score);
        hits.truncate(top_k);
        Ok(hits)
    }

    async fn count(&self) -> Result<usize, StoreError> {
        Ok(self.entries.read().await.by_id.len())
    }

    async fn close(&self) {}
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rag::store::ChunkMetadata;

    fn entry(id: &str, vector: Vec<f32>) -> IndexEntry {
        IndexEntry {
            chunk_id: id.to_string(),
            vector,
            document_text: format!("text of {}", id),
            metadata: ChunkMetadata {
                source_id: "mem".to_string(),
                chunk_index: 0,
            },
        }
    }

    #[tokio::test]
    async fn ranks_by_metric_and_respects_top_k() {
        let index = MemoryVectorIndex::new(Metric::Cosine);
        index
            .upsert(vec![
                entry("a", vec![0.8, 0.2]),
                entry("b", vec![0.1, 0.9]),
                entry("c", vec![0.9, 0.0]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["c", "a"]);

        let all = index.query(&[1.0, 0.0], 10).await.unwrap();
        assert_eq!(all.len(), 3);
        assert!(all.windows(2).all(|pair| pair[0].score >= pair[1].score));
    }

    #[tokio::test]
    async fn upsert_is_last_write_wins() {
        let index = MemoryVectorIndex::new(Metric::Cosine);
        index.upsert(vec![entry("a", vec![1.0, 0.0])]).await.unwrap();
        index.upsert(vec![entry("a", vec![0.0, 1.0])]).await.unwrap();

        assert_eq!(index.count().await.unwrap(), 1);
        let hits = index.query(&[0.0, 1.0], 1).await.unwrap();
        assert!(hits[0].score > 0.99);
    }

    #[tokio::test]
    async fn overflowing_vector_ranks_last() {
        let index = MemoryVectorIndex::new(Metric::Cosine);
        index
            .upsert(vec![
                entry("weak", vec![1.0, 0.0]),
                entry("huge", vec![3e38, 3e38]),
                entry("best", vec![1.0, 1.0]),
            ])
            .await
            .unwrap();

        let hits = index.query(&[1.0, 1.0], 3).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["best", "weak", "huge"]);

        let top = index.query(&[1.0, 1.0], 1).await.unwrap();
        assert_eq!(top[0].chunk_id, "best");
    }

    #[tokio::test]
    async fn reupsert_keeps_tie_order() {
        let index = MemoryVectorIndex::new(Metric::Cosine);
        index
            .upsert(vec![entry("a", vec![1.0, 0.0]), entry("b", vec![1.0, 0.0])])
            .await
            .unwrap();
        index.upsert(vec![entry("a", vec![1.0, 0.0])]).await.unwrap();

        let hits = index.query(&[1.0, 0.0], 2).await.unwrap();
        let ids: Vec<&str> = hits.iter().map(|h| h.chunk_id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[tokio::test]
    async fn rejected_batch_leaves_index_untouched() {
        let index = MemoryVectorIndex::new(Metric::Cosine);
        index.upsert(vec![entry("a", vec![1.0, 0.0])]).await.unwrap();

        let result = index
            .upsert(vec![entry("b", vec![1.0, 0.0]), entry("c", vec![1.0])])
            .await;
        assert!(result.is_err());
        assert_eq!(index.count().await.unwrap(), 1);
    }
}
