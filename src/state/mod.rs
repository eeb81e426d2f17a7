use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::core::config::{AppPaths, ConfigService, RagConfig};
use crate::llm::{Embedder, Generator, OllamaEmbedder, OllamaGenerator, RetryingEmbedder};
use crate::rag::{
    build_tokenizer, open_index, Chunker, ContextBudget, Indexer, QueryPipeline, Retriever,
    VectorIndex,
};

pub mod error;

use error::InitializationError;

/// Everything a request or an indexing run needs, built once at startup.
///
/// Clients and the index are constructed here and handed down explicitly;
/// nothing below this layer reads the environment.
pub struct AppState {
    pub paths: Arc<AppPaths>,
    pub config: Arc<RagConfig>,
    pub chunker: Arc<Chunker>,
    pub embedder: Arc<dyn Embedder>,
    pub generator: Arc<dyn Generator>,
    pub index: Arc<dyn VectorIndex>,
    pub pipeline: Arc<QueryPipeline>,
    pub started_at: DateTime<Utc>,
}

impl AppState {
    /// Loads configuration for `paths` and builds the state from it.
    pub async fn initialize(paths: Arc<AppPaths>) -> Result<Arc<Self>, InitializationError> {
        let config = ConfigService::new(paths.clone()).load()?;
        Self::from_config(paths, config).await
    }

    /// Builds the tokenizer, opens the index and wires the Ollama clients.
    pub async fn from_config(
        paths: Arc<AppPaths>,
        config: RagConfig,
    ) -> Result<Arc<Self>, InitializationError> {
        let tokenizer = build_tokenizer(config.chunking.tokenizer_path.as_deref())?;
        let chunker = Chunker::new(
            tokenizer,
            config.chunking.chunk_size,
            config.chunking.chunk_overlap,
        )?;

        let client = reqwest::Client::builder()
            .build()
            .map_err(InitializationError::Http)?;
        let timeout = Duration::from_secs(config.request_timeout_secs);

        let mut embedder: Arc<dyn Embedder> = Arc::new(OllamaEmbedder::new(
            client.clone(),
            config.embedding.url.clone(),
            config.embedding.model.clone(),
            timeout,
        ));
        if config.embedding.max_retries > 0 {
            embedder = Arc::new(RetryingEmbedder::new(
                embedder,
                config.embedding.max_retries,
                Duration::from_millis(config.embedding.retry_backoff_ms),
            ));
        }

        let generator: Arc<dyn Generator> = Arc::new(OllamaGenerator::new(
            client,
            config.generation.url.clone(),
            config.generation.model.clone(),
            timeout,
        ));

        let location = config.index_location(&paths);
        let index = open_index(&location, config.index.metric).await?;
        tracing::info!(
            location = %location,
            metric = %config.index.metric,
            embed_model = %config.embedding.model,
            gen_model = %config.generation.model,
            "application state initialized"
        );

        Ok(Self::assemble(
            paths,
            config,
            Arc::new(chunker),
            embedder,
            generator,
            index,
        ))
    }

    /// Wires already-built components together.
    pub fn assemble(
        paths: Arc<AppPaths>,
        config: RagConfig,
        chunker: Arc<Chunker>,
        embedder: Arc<dyn Embedder>,
        generator: Arc<dyn Generator>,
        index: Arc<dyn VectorIndex>,
    ) -> Arc<Self> {
        let retriever = Retriever::new(embedder.clone(), index.clone());
        let pipeline = QueryPipeline::new(
            retriever,
            generator.clone(),
            config.retrieval.top_k,
            ContextBudget::new(config.retrieval.max_context_chars),
        );

        Arc::new(AppState {
            paths,
            config: Arc::new(config),
            chunker,
            embedder,
            generator,
            index,
            pipeline: Arc::new(pipeline),
            started_at: Utc::now(),
        })
    }

    pub fn indexer(&self) -> Indexer {
        Indexer::new(
            self.chunker.clone(),
            self.embedder.clone(),
            self.index.clone(),
            self.config.indexing.concurrency,
        )
    }

    /// Closes the index. Safe to call more than once.
    pub async fn shutdown(&self) {
        self.index.close().await;
        tracing::info!("application state shut down");
    }
}
