//! Typed configuration with built-in defaults.
//!
//! Every section is `#[serde(default)]`, so a partial YAML document only
//! overrides the keys it names.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::paths::AppPaths;
use crate::rag::similarity::Metric;
use crate::rag::store::IndexLocation;

pub const DEFAULT_OLLAMA_BASE: &str = "http://localhost:11434";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RagConfig {
    pub embedding: EmbeddingConfig,
    pub generation: GenerationConfig,
    pub request_timeout_secs: u64,
    pub retrieval: RetrievalConfig,
    pub chunking: ChunkingConfig,
    pub index: IndexConfig,
    pub indexing: IndexingConfig,
    pub server: ServerConfig,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self {
            embedding: EmbeddingConfig::default(),
            generation: GenerationConfig::default(),
            request_timeout_secs: 180,
            retrieval: RetrievalConfig::default(),
            chunking: ChunkingConfig::default(),
            index: IndexConfig::default(),
            indexing: IndexingConfig::default(),
            server: ServerConfig::default(),
        }
    }
}

impl RagConfig {
    pub fn index_location(&self, paths: &AppPaths) -> IndexLocation {
        if self.index.in_memory {
            return IndexLocation::InMemory;
        }
        let dir = self
            .index
            .dir
            .clone()
            .unwrap_or_else(|| paths.default_index_dir());
        IndexLocation::Persistent(dir.join(format!("{}.db", self.index.collection)))
    }

    /// Directory shown as `persist_dir` by the health endpoint.
    pub fn persist_dir(&self, paths: &AppPaths) -> String {
        if self.index.in_memory {
            return IndexLocation::InMemory.to_string();
        }
        self.index
            .dir
            .clone()
            .unwrap_or_else(|| paths.default_index_dir())
            .display()
            .to_string()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingConfig {
    pub url: String,
    pub model: String,
    pub max_retries: usize,
    pub retry_backoff_ms: u64,
}

impl Default for EmbeddingConfig {
    fn default() -> Self {
        Self {
            url: format!("{}/api/embeddings", DEFAULT_OLLAMA_BASE),
            model: "nomic-embed-text".to_string(),
            max_retries: 0,
            retry_backoff_ms: 500,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub url: String,
    pub model: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            url: format!("{}/api/generate", DEFAULT_OLLAMA_BASE),
            model: "llama3".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrievalConfig {
    pub top_k: usize,
    pub max_context_chars: Option<usize>,
}

impl Default for RetrievalConfig {
    fn default() -> Self {
        Self {
            top_k: 3,
            max_context_chars: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingConfig {
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub tokenizer_path: Option<PathBuf>,
}

impl Default for ChunkingConfig {
    fn default() -> Self {
        Self {
            chunk_size: 400,
            chunk_overlap: 60,
            tokenizer_path: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexConfig {
    /// Unset means `<data_dir>/.index`.
    pub dir: Option<PathBuf>,
    pub collection: String,
    pub metric: Metric,
    pub in_memory: bool,
}

impl Default for IndexConfig {
    fn default() -> Self {
        Self {
            dir: None,
            collection: "docs".to_string(),
            metric: Metric::Cosine,
            in_memory: false,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IndexingConfig {
    pub concurrency: usize,
}

impl Default for IndexingConfig {
    fn default() -> Self {
        Self { concurrency: 4 }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub query_timeout_secs: u64,
    pub cors_allowed_origins: Vec<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: 8000,
            query_timeout_secs: 400,
            cors_allowed_origins: default_local_origins(),
        }
    }
}

pub fn default_local_origins() -> Vec<String> {
    [
        "http://localhost",
        "http://127.0.0.1",
        "http://localhost:3000",
        "http://127.0.0.1:3000",
        "http://localhost:5173",
        "http://127.0.0.1:5173",
        "http://localhost:8000",
        "http://127.0.0.1:8000",
    ]
    .iter()
    .map(|origin| origin.to_string())
    .collect()
}
