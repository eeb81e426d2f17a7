use thiserror::Error;

use crate::core::errors::{ConfigError, StoreError, TokenizerError};

#[derive(Debug, Error)]
pub enum InitializationError {
    #[error("Failed to load configuration: {0}")]
    Config(#[from] ConfigError),

    #[error("Failed to build tokenizer: {0}")]
    Tokenizer(#[from] TokenizerError),

    #[error("Failed to open vector index: {0}")]
    Store(#[from] StoreError),

    #[error("Failed to build HTTP client: {0}")]
    Http(#[source] reqwest::Error),
}
