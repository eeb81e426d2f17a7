pub mod ollama;
pub mod provider;
pub mod retry;
pub mod types;

pub use ollama::{OllamaEmbedder, OllamaGenerator, NO_RESPONSE_FALLBACK};
pub use provider::{Embedder, Generator};
pub use retry::RetryingEmbedder;
