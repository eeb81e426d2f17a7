//! Opt-in retry policy around an embedder.
//!
//! Embedding calls are one-shot by default. When `embedding.max_retries` is
//! set, the application wraps its embedder in `RetryingEmbedder`, which retries
//! transient failures (transport errors, timeouts, 429 and 5xx) with
//! exponential backoff. Malformed responses and other 4xx are returned as is.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;

use super::provider::Embedder;
use crate::core::errors::EmbeddingError;

pub struct RetryingEmbedder {
    inner: Arc<dyn Embedder>,
    max_retries: usize,
    base_backoff: Duration,
}

impl RetryingEmbedder {
    pub fn new(inner: Arc<dyn Embedder>, max_retries: usize, base_backoff: Duration) -> Self {
        Self {
            inner,
            max_retries,
            base_backoff,
        }
    }

    fn backoff(&self, attempt: usize) -> Duration {
        let capped = attempt.min(5) as u32;
        self.base_backoff * (1 << capped)
    }
}

#[async_trait]
impl Embedder for RetryingEmbedder {
    fn model(&self) -> &str {
        self.inner.model()
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let mut attempt = 0usize;
        loop {
            match self.inner.embed(text).await {
                Ok(vector) => return Ok(vector),
                Err(err) if err.is_transient() && attempt < self.max_retries => {
                    attempt += 1;
                    let delay = self.backoff(attempt);
                    tracing::warn!(
                        attempt,
                        max_retries = self.max_retries,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "embedding call failed; retrying"
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(err) => return Err(err),
            }
        }
    }
}
