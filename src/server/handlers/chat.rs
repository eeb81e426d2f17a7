use std::sync::Arc;
use std::time::Duration;

use axum::extract::State;
use axum::Json;
use serde::Deserialize;

use crate::rag::QueryAnswer;
use crate::server::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct ChatRequest {
    pub q: String,
}

/// Answers one question. The whole pipeline runs under
/// `server.query_timeout_secs`; on expiry the in-flight calls are dropped.
pub async fn chat(
    State(state): State<Arc<AppState>>,
    Json(request): Json<ChatRequest>,
) -> Result<Json<QueryAnswer>, ApiError> {
    if request.q.trim().is_empty() {
        return Err(ApiError::BadRequest("question must not be empty".to_string()));
    }

    let limit = Duration::from_secs(state.config.server.query_timeout_secs);
    match tokio::time::timeout(limit, state.pipeline.answer(&request.q)).await {
        Ok(result) => Ok(Json(result?)),
        Err(_) => Err(ApiError::Timeout(limit)),
    }
}
