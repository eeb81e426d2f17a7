use async_trait::async_trait;

use crate::core::errors::{EmbeddingError, GenerationError};

/// Text → vector capability. Implementations make one upstream call per invocation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Model identifier reported on the health surface.
    fn model(&self) -> &str;

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}

/// Prompt → answer capability. Non-streaming.
#[async_trait]
pub trait Generator: Send + Sync {
    fn model(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError>;
}
