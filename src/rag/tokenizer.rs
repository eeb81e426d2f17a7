//! Deterministic tokenizers used by the chunker.
//!
//! A tokenizer reports each token as a byte span into the input text.
//! Decoding a run of tokens is a slice of the original text, so windows are
//! reproduced exactly without a vocabulary round trip.

use std::ops::Range;
use std::path::Path;
use std::sync::Arc;

use regex::Regex;

use crate::core::errors::TokenizerError;

pub type TokenSpan = Range<usize>;

pub trait Tokenizer: Send + Sync {
    /// Stable identifier, logged with every indexing run.
    fn name(&self) -> &str;

    /// Splits `text` into ordered, non-overlapping token spans.
    fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, TokenizerError>;
}

/// Decodes a run of tokens back into the text it covers.
pub fn decode<'a>(text: &'a str, spans: &[TokenSpan]) -> Result<&'a str, TokenizerError> {
    let (Some(start), Some(end)) = (
        spans.iter().map(|span| span.start).min(),
        spans.iter().map(|span| span.end).max(),
    ) else {
        return Ok("");
    };

    text.get(start..end)
        .ok_or(TokenizerError::Span { start, end })
}

// Contractions, letter runs, 1-3 digit groups and punctuation runs each take
// at most one leading whitespace character; leftover whitespace forms its own
// token. Every character class is covered, so spans tile the input.
const PRETOKENIZE_PATTERN: &str =
    r"'(?:s|t|re|ve|m|ll|d)|\s?\p{L}+|\s?\p{N}{1,3}|\s?[^\s\p{L}\p{N}]+|\s+";

/// Built-in tiktoken-style pre-tokenizer. Needs no model files.
pub struct RegexTokenizer {
    pattern: Regex,
}

impl RegexTokenizer {
    pub fn new() -> Result<Self, TokenizerError> {
        let pattern = Regex::new(PRETOKENIZE_PATTERN).map_err(|e| TokenizerError::Load {
            path: "<builtin>".to_string(),
            reason: e.to_string(),
        })?;
        Ok(Self { pattern })
    }
}

impl Tokenizer for RegexTokenizer {
    fn name(&self) -> &str {
        "regex-v1"
    }

    fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, TokenizerError> {
        Ok(self
            .pattern
            .find_iter(text)
            .map(|found| found.start()..found.end())
            .collect())
    }
}

/// HuggingFace tokenizer loaded from a `tokenizer.json`.
pub struct HfTokenizer {
    inner: tokenizers::Tokenizer,
    name: String,
}

impl HfTokenizer {
    pub fn from_file(path: &Path) -> Result<Self, TokenizerError> {
        let inner = tokenizers::Tokenizer::from_file(path).map_err(|e| TokenizerError::Load {
            path: path.display().to_string(),
            reason: e.to_string(),
        })?;
        let name = format!("hf:{}", path.display());
        Ok(Self { inner, name })
    }
}

impl Tokenizer for HfTokenizer {
    fn name(&self) -> &str {
        &self.name
    }

    fn tokenize(&self, text: &str) -> Result<Vec<TokenSpan>, TokenizerError> {
        let encoding = self
            .inner
            .encode(text, false)
            .map_err(|e| TokenizerError::Encode(e.to_string()))?;
        let special = encoding.get_special_tokens_mask();

        let mut spans = Vec::with_capacity(encoding.len());
        for (idx, &(start, end)) in encoding.get_offsets().iter().enumerate() {
            if special.get(idx).copied().unwrap_or(0) == 1 {
                continue;
            }
            if start > end || !text.is_char_boundary(start) || !text.is_char_boundary(end) {
                return Err(TokenizerError::Span { start, end });
            }
            spans.push(start..end);
        }
        Ok(spans)
    }
}

/// Picks the HuggingFace tokenizer when a model file is configured, the
/// built-in one otherwise.
pub fn build_tokenizer(path: Option<&Path>) -> Result<Arc<dyn Tokenizer>, TokenizerError> {
    match path {
        Some(path) => Ok(Arc::new(HfTokenizer::from_file(path)?)),
        None => Ok(Arc::new(RegexTokenizer::new()?)),
    }
}
