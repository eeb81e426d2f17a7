//! Wire payloads of the Ollama-compatible embedding and generation endpoints.

use serde::{Deserialize, Serialize};

#[derive(Debug, Serialize)]
pub struct EmbeddingRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct EmbeddingResponse {
    /// Required; absence is reported as a malformed response.
    #[serde(default)]
    pub embedding: Option<Vec<f32>>,
}

#[derive(Debug, Serialize)]
pub struct GenerateRequest<'a> {
    pub model: &'a str,
    pub prompt: &'a str,
    pub stream: bool,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    /// Optional; absence maps to the documented fallback answer.
    #[serde(default)]
    pub response: Option<String>,
}

/// Error body Ollama sends with non-success statuses.
#[derive(Debug, Deserialize)]
pub struct UpstreamErrorBody {
    pub error: String,
}

/// Prefers the `error` field of a JSON error body, falling back to the raw text.
pub fn upstream_detail(body: &str) -> String {
    match serde_json::from_str::<UpstreamErrorBody>(body) {
        Ok(parsed) => parsed.error,
        Err(_) => body.trim().to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generate_request_always_disables_streaming() {
        let body = serde_json::to_value(GenerateRequest {
            model: "llama3",
            prompt: "hi",
            stream: false,
        })
        .unwrap();
        assert_eq!(
            body,
            serde_json::json!({"model": "llama3", "prompt": "hi", "stream": false})
        );
    }

    #[test]
    fn missing_fields_deserialize_to_none() {
        let embedding: EmbeddingResponse = serde_json::from_str("{}").unwrap();
        assert!(embedding.embedding.is_none());
        let generated: GenerateResponse = serde_json::from_str(r#"{"done": true}"#).unwrap();
        assert!(generated.response.is_none());
    }

    #[test]
    fn upstream_detail_unwraps_error_bodies() {
        assert_eq!(upstream_detail(r#"{"error":"model 'x' not found"}"#), "model 'x' not found");
        assert_eq!(upstream_detail("  Bad Gateway \n"), "Bad Gateway");
    }
}
