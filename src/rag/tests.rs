//! End-to-end pipeline scenarios against in-process fakes.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use super::*;
use crate::core::errors::{EmbeddingError, GenerationError, QueryError};
use crate::llm::{Embedder, Generator};

const VOCAB: [&str; 4] = ["cat", "dog", "fish", "bird"];

/// Bag-of-keywords embedding over a tiny vocabulary, plus a bias term so no
/// vector is all zeros.
struct KeywordEmbedder {
    fail: bool,
}

#[async_trait]
impl Embedder for KeywordEmbedder {
    fn model(&self) -> &str {
        "keywords"
    }

    async fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError> {
        if self.fail {
            return Err(EmbeddingError::Transport("connection refused".to_string()));
        }
        let lower = text.to_lowercase();
        let mut vector: Vec<f32> = VOCAB
            .iter()
            .map(|word| lower.matches(word).count() as f32)
            .collect();
        vector.push(0.1);
        Ok(vector)
    }
}

#[derive(Default)]
struct RecordingGenerator {
    prompts: Mutex<Vec<String>>,
    calls: AtomicUsize,
    fail: bool,
}

impl RecordingGenerator {
    fn failing() -> Self {
        Self {
            fail: true,
            ..Default::default()
        }
    }

    fn last_prompt(&self) -> String {
        self.prompts.lock().unwrap().last().cloned().unwrap_or_default()
    }
}

#[async_trait]
impl Generator for RecordingGenerator {
    fn model(&self) -> &str {
        "recording"
    }

    async fn generate(&self, prompt: &str) -> Result<String, GenerationError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prompts.lock().unwrap().push(prompt.to_string());
        if self.fail {
            return Err(GenerationError::Status {
                status: 500,
                detail: "model crashed".to_string(),
            });
        }
        Ok("generated answer".to_string())
    }
}

fn pipeline(
    embedder: KeywordEmbedder,
    index: Arc<dyn VectorIndex>,
    generator: Arc<RecordingGenerator>,
    top_k: usize,
    budget: ContextBudget,
) -> QueryPipeline {
    let retriever = Retriever::new(Arc::new(embedder), index);
    QueryPipeline::new(retriever, generator, top_k, budget)
}

async fn indexed_corpus() -> Arc<dyn VectorIndex> {
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryVectorIndex::new(Metric::Cosine));
    let tokenizer = build_tokenizer(None).unwrap();
    let chunker = Arc::new(Chunker::new(tokenizer, 400, 60).unwrap());
    let indexer = Indexer::new(
        chunker,
        Arc::new(KeywordEmbedder { fail: false }),
        index.clone(),
        2,
    );

    let docs = vec![
        Document::new("cats.txt", "The cat sleeps all day. A cat purrs."),
        Document::new("dogs.txt", "The dog fetches the ball. Every dog barks."),
        Document::new("fish.txt", "A fish swims in the pond."),
        Document::new("birds.txt", "A bird sings at dawn."),
    ];
    let report = indexer.index(&docs).await;
    assert_eq!(report.totals.indexed, 4);
    index
}

#[tokio::test]
async fn empty_index_still_calls_generator_with_no_sources() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = pipeline(
        KeywordEmbedder { fail: false },
        Arc::new(MemoryVectorIndex::new(Metric::Cosine)),
        generator.clone(),
        3,
        ContextBudget::unlimited(),
    );

    let answer = pipeline.answer("Q").await.unwrap();
    assert_eq!(answer.answer, "generated answer");
    assert!(answer.sources.is_empty());
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);

    let prompt = generator.last_prompt();
    assert!(prompt.contains("say so explicitly"));
    assert!(prompt.contains("Context:\n\n\nQuestion: Q\nAnswer:"));
}

#[tokio::test]
async fn embedding_failure_stops_before_generation() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = pipeline(
        KeywordEmbedder { fail: true },
        Arc::new(MemoryVectorIndex::new(Metric::Cosine)),
        generator.clone(),
        3,
        ContextBudget::unlimited(),
    );

    let err = pipeline.answer("Q").await.unwrap_err();
    assert!(matches!(err, QueryError::Embedding(EmbeddingError::Transport(_))));
    assert_eq!(err.failed_stage(), QueryStage::EmbeddingQuery);
    assert_eq!(err.kind(), "embedding_error");
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn store_failure_stops_before_generation() {
    let index: Arc<dyn VectorIndex> = Arc::new(MemoryVectorIndex::new(Metric::Cosine));
    index
        .upsert(vec![IndexEntry {
            chunk_id: "x#0000".to_string(),
            vector: vec![1.0, 0.0],
            document_text: "x".to_string(),
            metadata: ChunkMetadata {
                source_id: "x".to_string(),
                chunk_index: 0,
            },
        }])
        .await
        .unwrap();

    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = pipeline(
        KeywordEmbedder { fail: false },
        index,
        generator.clone(),
        3,
        ContextBudget::unlimited(),
    );

    let err = pipeline.answer("cat?").await.unwrap_err();
    assert_eq!(err.failed_stage(), QueryStage::Retrieving);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn generation_failure_is_reported_not_swallowed() {
    let generator = Arc::new(RecordingGenerator::failing());
    let pipeline = pipeline(
        KeywordEmbedder { fail: false },
        indexed_corpus().await,
        generator.clone(),
        3,
        ContextBudget::unlimited(),
    );

    let err = pipeline.answer("What does the dog do?").await.unwrap_err();
    assert!(matches!(err, QueryError::Generation(GenerationError::Status { status: 500, .. })));
    assert_eq!(err.failed_stage(), QueryStage::Generating);
    assert_eq!(generator.calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn answers_with_best_sources_first_and_bounded_by_top_k() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = pipeline(
        KeywordEmbedder { fail: false },
        indexed_corpus().await,
        generator.clone(),
        2,
        ContextBudget::unlimited(),
    );

    let answer = pipeline.answer("What does the dog do?").await.unwrap();
    assert_eq!(answer.sources.len(), 2);
    assert_eq!(
        answer.sources[0],
        ChunkMetadata {
            source_id: "dogs.txt".to_string(),
            chunk_index: 0,
        }
    );

    let prompt = generator.last_prompt();
    let context = prompt
        .split("Context:\n")
        .nth(1)
        .and_then(|rest| rest.split("\n\nQuestion:").next())
        .unwrap();
    assert!(context.starts_with("The dog fetches the ball."));
    assert!(prompt.ends_with("Question: What does the dog do?\nAnswer:"));
}

#[tokio::test]
async fn sources_mirror_retrieval_even_when_budget_drops_texts() {
    let generator = Arc::new(RecordingGenerator::default());
    let pipeline = pipeline(
        KeywordEmbedder { fail: false },
        indexed_corpus().await,
        generator.clone(),
        3,
        ContextBudget::new(Some(50)),
    );

    let answer = pipeline.answer("Tell me about the cat").await.unwrap();
    assert_eq!(answer.sources.len(), 3);
    assert_eq!(answer.sources[0].source_id, "cats.txt");

    let prompt = generator.last_prompt();
    assert!(prompt.contains("The cat sleeps all day."));
    // only the top text fits in 50 characters
    assert!(!prompt.contains("\nThe dog") && !prompt.contains("\nA fish") && !prompt.contains("\nA bird"));
}

#[test]
fn stage_names() {
    let stages = [
        QueryStage::EmbeddingQuery,
        QueryStage::Retrieving,
        QueryStage::BuildingPrompt,
        QueryStage::Generating,
        QueryStage::Done,
        QueryStage::Failed,
    ];
    let names: Vec<String> = stages.iter().map(|s| s.to_string()).collect();
    assert_eq!(
        names,
        vec!["EMBEDDING_QUERY", "RETRIEVING", "BUILDING_PROMPT", "GENERATING", "DONE", "FAILED"]
    );
}
