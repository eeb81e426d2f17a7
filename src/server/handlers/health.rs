use std::sync::Arc;

use axum::extract::State;
use axum::Json;
use chrono::Utc;
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    /// `None` when the index cannot be counted.
    pub docs_count: Option<usize>,
    pub persist_dir: String,
    pub gen_model: String,
    pub embed_model: String,
    pub top_k: usize,
    pub uptime_secs: i64,
}

pub async fn health(State(state): State<Arc<AppState>>) -> Json<HealthResponse> {
    let docs_count = match state.index.count().await {
        Ok(count) => Some(count),
        Err(err) => {
            tracing::warn!(error = %err, "failed to count index entries for health check");
            None
        }
    };

    Json(HealthResponse {
        status: "ok",
        docs_count,
        persist_dir: state.config.persist_dir(&state.paths),
        gen_model: state.generator.model().to_string(),
        embed_model: state.embedder.model().to_string(),
        top_k: state.pipeline.top_k(),
        uptime_secs: (Utc::now() - state.started_at).num_seconds().max(0),
    })
}
