//! Question → answer state machine.
//!
//! `EMBEDDING_QUERY → RETRIEVING → BUILDING_PROMPT → GENERATING → DONE`, with
//! `FAILED` reachable from every stage that calls out to a service.

use std::fmt;
use std::sync::Arc;

use serde::Serialize;
use tracing::Instrument;
use uuid::Uuid;

use super::prompt::{build_prompt, ContextBudget};
use super::retriever::Retriever;
use super::store::ChunkMetadata;
use crate::core::errors::QueryError;
use crate::llm::Generator;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum QueryStage {
    EmbeddingQuery,
    Retrieving,
    BuildingPrompt,
    Generating,
    Done,
    Failed,
}

impl QueryStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            QueryStage::EmbeddingQuery => "EMBEDDING_QUERY",
            QueryStage::Retrieving => "RETRIEVING",
            QueryStage::BuildingPrompt => "BUILDING_PROMPT",
            QueryStage::Generating => "GENERATING",
            QueryStage::Done => "DONE",
            QueryStage::Failed => "FAILED",
        }
    }
}

impl fmt::Display for QueryStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct QueryAnswer {
    pub answer: String,
    pub sources: Vec<ChunkMetadata>,
}

pub struct QueryPipeline {
    retriever: Retriever,
    generator: Arc<dyn Generator>,
    top_k: usize,
    budget: ContextBudget,
}

impl QueryPipeline {
    pub fn new(
        retriever: Retriever,
        generator: Arc<dyn Generator>,
        top_k: usize,
        budget: ContextBudget,
    ) -> Self {
        Self {
            retriever,
            generator,
            top_k,
            budget,
        }
    }

    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Runs one question through every stage under its own request span.
    pub async fn answer(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        let span = tracing::info_span!("query", request_id = %Uuid::new_v4());
        self.run(question).instrument(span).await
    }

    async fn run(&self, question: &str) -> Result<QueryAnswer, QueryError> {
        let mut stage = QueryStage::EmbeddingQuery;
        tracing::debug!(%stage, "query started");

        let vector = self
            .retriever
            .embed_question(question)
            .await
            .map_err(|err| fail(stage, err))?;

        advance(&mut stage, QueryStage::Retrieving);
        let hits = self
            .retriever
            .search(&vector, self.top_k)
            .await
            .map_err(|err| fail(stage, err))?;

        advance(&mut stage, QueryStage::BuildingPrompt);
        let texts = self
            .budget
            .apply(hits.iter().map(|hit| hit.document_text.as_str()).collect());
        let prompt = build_prompt(question, &texts);
        tracing::debug!(chars = prompt.len(), prompt = %prompt, "assembled prompt");

        advance(&mut stage, QueryStage::Generating);
        let answer = self
            .generator
            .generate(&prompt)
            .await
            .map_err(|err| fail(stage, err.into()))?;

        advance(&mut stage, QueryStage::Done);
        tracing::info!(
            answer_chars = answer.chars().count(),
            sources = hits.len(),
            "answered question"
        );

        Ok(QueryAnswer {
            answer,
            sources: hits.into_iter().map(|hit| hit.metadata).collect(),
        })
    }
}

fn advance(stage: &mut QueryStage, next: QueryStage) {
    tracing::debug!(from = %stage, to = %next, "stage transition");
    *stage = next;
}

fn fail(stage: QueryStage, err: QueryError) -> QueryError {
    tracing::debug!(from = %stage, to = %QueryStage::Failed, "stage transition");
    tracing::warn!(%stage, kind = err.kind(), error = %err, "query failed");
    err
}
