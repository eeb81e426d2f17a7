//! Sliding-window chunking over token spans.
//!
//! Windows of `chunk_size` tokens start every `step = max(1, chunk_size - overlap)`
//! tokens. The last window is the first one that reaches the end of the token
//! stream, so it may be shorter than `chunk_size`.

use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use super::tokenizer::{self, TokenSpan, Tokenizer};
use crate::core::errors::{ConfigError, TokenizerError};

/// A raw text document, read once at index time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Document {
    pub source_id: String,
    pub raw_text: String,
}

impl Document {
    pub fn new(source_id: impl Into<String>, raw_text: impl Into<String>) -> Self {
        Self {
            source_id: source_id.into(),
            raw_text: raw_text.into(),
        }
    }
}

/// One window of a document's token sequence.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Chunk {
    /// `<source_id>#<chunk_index:04>`
    pub id: String,
    pub text: String,
    /// Token indices `[start, end)` within the source document.
    pub token_span: Range<usize>,
    pub source_id: String,
    pub chunk_index: usize,
}

pub fn chunk_id(source_id: &str, chunk_index: usize) -> String {
    format!("{}#{:04}", source_id, chunk_index)
}

/// Distance between window starts. Never zero.
pub fn window_step(chunk_size: usize, overlap: usize) -> usize {
    chunk_size.saturating_sub(overlap).max(1)
}

/// Token ranges of every window over a stream of `token_count` tokens.
pub fn window_ranges(token_count: usize, chunk_size: usize, overlap: usize) -> Vec<Range<usize>> {
    let mut windows = Vec::new();
    if chunk_size == 0 {
        return windows;
    }

    let step = window_step(chunk_size, overlap);
    let mut start = 0;
    while start < token_count {
        let end = (start + chunk_size).min(token_count);
        windows.push(start..end);
        if end == token_count {
            break;
        }
        start += step;
    }
    windows
}

pub struct Chunker {
    tokenizer: Arc<dyn Tokenizer>,
    chunk_size: usize,
    overlap: usize,
}

impl Chunker {
    pub fn new(
        tokenizer: Arc<dyn Tokenizer>,
        chunk_size: usize,
        overlap: usize,
    ) -> Result<Self, ConfigError> {
        if chunk_size == 0 {
            return Err(ConfigError::invalid(
                "chunking.chunk_size",
                "must be at least 1 token",
            ));
        }
        if overlap >= chunk_size {
            tracing::warn!(
                chunk_size,
                overlap,
                "chunk overlap is not smaller than chunk size; window step clamped to 1"
            );
        }

        Ok(Self {
            tokenizer,
            chunk_size,
            overlap,
        })
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn overlap(&self) -> usize {
        self.overlap
    }

    pub fn step(&self) -> usize {
        window_step(self.chunk_size, self.overlap)
    }

    pub fn tokenizer_name(&self) -> &str {
        self.tokenizer.name()
    }

    /// Window texts of `text`, in order.
    pub fn chunk(&self, text: &str) -> Result<Vec<String>, TokenizerError> {
        let spans = self.tokenizer.tokenize(text)?;
        self.windows(text, &spans)
            .map(|window| window.map(|(_, text)| text.to_string()))
            .collect()
    }

    /// Chunks with ids, token spans and source attribution.
    pub fn chunk_document(&self, document: &Document) -> Result<Vec<Chunk>, TokenizerError> {
        let text = document.raw_text.as_str();
        let spans = self.tokenizer.tokenize(text)?;

        self.windows(text, &spans)
            .enumerate()
            .map(|(chunk_index, window)| {
                let (token_span, window_text) = window?;
                Ok(Chunk {
                    id: chunk_id(&document.source_id, chunk_index),
                    text: window_text.to_string(),
                    token_span,
                    source_id: document.source_id.clone(),
                    chunk_index,
                })
            })
            .collect()
    }

    fn windows<'a>(
        &self,
        text: &'a str,
        spans: &'a [TokenSpan],
    ) -> impl Iterator<Item = Result<(Range<usize>, &'a str), TokenizerError>> + 'a {
        window_ranges(spans.len(), self.chunk_size, self.overlap)
            .into_iter()
            .map(move |range| {
                let decoded = tokenizer::decode(text, &spans[range.clone()])?;
                Ok((range, decoded))
            })
    }
}
