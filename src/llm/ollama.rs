use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;

use super::provider::{Embedder, Generator};
use super::types::{upstream_detail, EmbeddingRequest, EmbeddingResponse, GenerateRequest, GenerateResponse};
use crate::core::errors::{EmbeddingError, GenerationError};

/// Answer used when the generation service replies without a `response` field.
pub const NO_RESPONSE_FALLBACK: &str = "(no response)";

/// Client for `POST /api/embeddings`.
#[derive(Clone)]
pub struct OllamaEmbedder {
    url: String,
    model: String,
    timeout: Duration,
    client: Client,
}

impl OllamaEmbedder {
    pub fn new(client: Client, url: String, model: String, timeout: Duration) -> Self {
        Self {
            url,
            model,
            timeout,
            client,
        }
    }
}

#[async_trait]
impl Embedder for OllamaEmbedder {
    fn model(&self) -> &str {
        &self.model
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        let res = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&EmbeddingRequest {
                model: &self.model,
                prompt: text,
            })
            .send()
            .await
            .map_err(|e| EmbeddingError::from_reqwest(e, self.timeout))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| EmbeddingError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                detail: upstream_detail(&body),
            });
        }

        let payload: EmbeddingResponse =
            serde_json::from_str(&body).map_err(|e| EmbeddingError::Malformed(e.to_string()))?;

        match payload.embedding {
            Some(vector) if !vector.is_empty() => Ok(vector),
            Some(_) => Err(EmbeddingError::Malformed("empty 'embedding' field".to_string())),
            None => Err(EmbeddingError::Malformed("missing 'embedding' field".to_string())),
        }
    }
}

/// Client for `POST /api/generate` with streaming disabled.
#[derive(Clone)]
pub struct OllamaGenerator {
    url: String,
    model: String,
    timeout: Duration,
    client: Client,
}

impl OllamaGenerator {
    pub fn new(client: Client, url: String, model: String, timeout: Duration) -> Self {
        Self {
            url,
            model,
            timeout,
            client,
        }
    }
}

#[async_trait]
impl Generator for OllamaGenerator {
    fn model(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        let res = self
            .client
            .post(&self.url)
            .timeout(self.timeout)
            .json(&GenerateRequest {
                model: &self.model,
                prompt,
                stream: false,
            })
            .send()
            .await
            .map_err(|e| GenerationError::from_reqwest(e, self.timeout))?;

        let status = res.status();
        let body = res
            .text()
            .await
            .map_err(|e| GenerationError::from_reqwest(e, self.timeout))?;

        if !status.is_success() {
            return Err(GenerationError::Status {
                status: status.as_u16(),
                detail: upstream_detail(&body),
            });
        }

        let payload: GenerateResponse =
            serde_json::from_str(&body).map_err(|e| GenerationError::Malformed(e.to_string()))?;

        Ok(payload
            .response
            .unwrap_or_else(|| NO_RESPONSE_FALLBACK.to_string()))
    }
}
