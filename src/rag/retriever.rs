use std::sync::Arc;

use super::store::{SearchHit, VectorIndex};
use crate::core::errors::QueryError;
use crate::llm::Embedder;

/// Embeds a question and looks up its nearest chunks.
#[derive(Clone)]
pub struct Retriever {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
}

impl Retriever {
    pub fn new(embedder: Arc<dyn Embedder>, index: Arc<dyn VectorIndex>) -> Self {
        Self { embedder, index }
    }

    /// Returns at most `top_k` hits, best first. An empty index yields an
    /// empty list.
    pub async fn retrieve(&self, question: &str, top_k: usize) -> Result<Vec<SearchHit>, QueryError> {
        let vector = self.embed_question(question).await?;
        self.search(&vector, top_k).await
    }

    pub(crate) async fn embed_question(&self, question: &str) -> Result<Vec<f32>, QueryError> {
        Ok(self.embedder.embed(question).await?)
    }

    pub(crate) async fn search(&self, vector: &[f32], top_k: usize) -> Result<Vec<SearchHit>, QueryError> {
        let hits = self.index.query(vector, top_k).await?;
        tracing::debug!(top_k, hits = hits.len(), "retrieved chunks");
        Ok(hits)
    }
}
