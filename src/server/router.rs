use axum::http::{header, HeaderValue, Method};
use axum::routing::{get, post};
use axum::Router;
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::core::config::defaults::default_local_origins;
use crate::server::handlers::{chat, health};
use crate::state::AppState;

/// Builds the HTTP surface:
/// - `GET /health`: index and model summary
/// - `POST /chat`: `{q}` → `{answer, sources}`
pub fn router(state: Arc<AppState>) -> Router {
    let cors_layer = build_cors_layer(&state.config.server.cors_allowed_origins);
    Router::new()
        .route("/health", get(health::health))
        .route("/chat", post(chat::chat))
        .with_state(state)
        .layer(cors_layer)
        .layer(TraceLayer::new_for_http())
}

fn build_cors_layer(configured: &[String]) -> CorsLayer {
    let allowed_origins = resolve_allowed_origins(configured)
        .into_iter()
        .filter_map(|origin| HeaderValue::from_str(&origin).ok())
        .collect::<Vec<_>>();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(allowed_origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::ACCEPT, header::CONTENT_TYPE])
}

fn resolve_allowed_origins(configured: &[String]) -> Vec<String> {
    let origins = configured
        .iter()
        .map(|item| item.trim())
        .filter(|item| !item.is_empty())
        .map(|item| item.to_string())
        .collect::<Vec<_>>();

    if origins.is_empty() {
        return default_local_origins();
    }

    origins
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use serde_json::{json, Value};

    use crate::core::config::{AppPaths, RagConfig};
    use crate::core::errors::{EmbeddingError, GenerationError};
    use crate::llm::{Embedder, Generator};
    use crate::rag::{build_tokenizer, Chunker, Document, MemoryVectorIndex, Metric, VectorIndex};

    struct LengthEmbedder {
        fail: bool,
    }

    #[async_trait]
    impl Embedder for LengthEmbedder {
        fn model(&self) -> &str {
            "fake-embed"
        }

        async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
            if self.fail {
                return Err(EmbeddingError::Status {
                    status: 404,
                    detail: "model not found".to_string(),
                });
            }
            Ok(vec![1.0, text.len() as f32 / 100.0])
        }
    }

    struct SlowGenerator {
        delay: Duration,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Generator for SlowGenerator {
        fn model(&self) -> &str {
            "fake-gen"
        }

        async fn generate(&self, _prompt: &str) -> Result<String, GenerationError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            Ok("It is blue.".to_string())
        }
    }

    async fn spawn_app(fail_embedding: bool, generator_delay: Duration) -> (String, Arc<AppState>) {
        let root = tempfile::tempdir().unwrap();
        let paths = Arc::new(AppPaths::from_root(root.path()));
        let mut config = RagConfig::default();
        config.index.in_memory = true;
        config.server.query_timeout_secs = 1;

        let chunker = Arc::new(Chunker::new(build_tokenizer(None).unwrap(), 400, 60).unwrap());
        let index: Arc<dyn VectorIndex> = Arc::new(MemoryVectorIndex::new(Metric::Cosine));
        let state = AppState::assemble(
            paths,
            config,
            chunker,
            Arc::new(LengthEmbedder {
                fail: fail_embedding,
            }),
            Arc::new(SlowGenerator {
                delay: generator_delay,
                calls: AtomicUsize::new(0),
            }),
            index,
        );

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let app = router(state.clone());
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{}", addr), state)
    }

    async fn post_chat(base: &str, body: Value) -> (u16, Value) {
        let res = reqwest::Client::new()
            .post(format!("{}/chat", base))
            .json(&body)
            .send()
            .await
            .unwrap();
        let status = res.status().as_u16();
        (status, res.json().await.unwrap())
    }

    #[tokio::test]
    async fn health_reports_index_and_models() {
        let (base, state) = spawn_app(false, Duration::ZERO).await;
        state
            .indexer()
            .index(&[Document::new("sky.txt", "The sky is blue.")])
            .await;

        let body: Value = reqwest::get(format!("{}/health", base))
            .await
            .unwrap()
            .json()
            .await
            .unwrap();
        let uptime = body["uptime_secs"].as_i64().unwrap();
        assert!((0..60).contains(&uptime));

        let mut summary = body.clone();
        summary.as_object_mut().unwrap().remove("uptime_secs");
        assert_eq!(
            summary,
            json!({
                "status": "ok",
                "docs_count": 1,
                "persist_dir": ":memory:",
                "gen_model": "fake-gen",
                "embed_model": "fake-embed",
                "top_k": 3
            })
        );
    }

    #[tokio::test]
    async fn chat_returns_answer_and_sources() {
        let (base, state) = spawn_app(false, Duration::ZERO).await;
        state
            .indexer()
            .index(&[Document::new("sky.txt", "The sky is blue.")])
            .await;

        let (status, body) = post_chat(&base, json!({ "q": "What colour is the sky?" })).await;
        assert_eq!(status, 200);
        assert_eq!(body["answer"], "It is blue.");
        assert_eq!(body["sources"], json!([{ "source_id": "sky.txt", "chunk_index": 0 }]));
    }

    #[tokio::test]
    async fn empty_question_is_rejected() {
        let (base, _) = spawn_app(false, Duration::ZERO).await;
        let (status, body) = post_chat(&base, json!({ "q": "   " })).await;
        assert_eq!(status, 400);
        assert_eq!(body["error"], "bad_request");
    }

    #[tokio::test]
    async fn embedding_failure_maps_to_bad_gateway() {
        let (base, _) = spawn_app(true, Duration::ZERO).await;
        let (status, body) = post_chat(&base, json!({ "q": "anything" })).await;
        assert_eq!(status, 502);
        assert_eq!(body["error"], "embedding_error");
        assert!(body["detail"].as_str().unwrap().contains("model not found"));
    }

    #[tokio::test]
    async fn slow_generation_maps_to_gateway_timeout() {
        let (base, _) = spawn_app(false, Duration::from_secs(3)).await;
        let (status, body) = post_chat(&base, json!({ "q": "anything" })).await;
        assert_eq!(status, 504);
        assert_eq!(body["error"], "timeout");
    }

    #[test]
    fn blank_origin_list_falls_back_to_local_defaults() {
        assert_eq!(resolve_allowed_origins(&[" ".to_string()]), default_local_origins());
        assert_eq!(
            resolve_allowed_origins(&["http://example.test".to_string()]),
            vec!["http://example.test".to_string()]
        );
    }
}
