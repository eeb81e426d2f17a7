//! Prompt assembly.
//!
//! Retrieved texts are joined in rank order into one context block and
//! rendered into a fixed grounded-answer template. An optional character
//! budget can drop the lowest-ranked texts first.

const INSTRUCTION: &str = "Answer concisely and precisely using ONLY the context below. \
If the context does not contain enough information, say so explicitly.";

const SEPARATOR: &str = "\n";

/// Renders the grounded prompt. Pure; texts are neither truncated nor reordered.
pub fn build_prompt<S: AsRef<str>>(question: &str, texts: &[S]) -> String {
    let context = texts
        .iter()
        .map(|text| text.as_ref())
        .collect::<Vec<_>>()
        .join(SEPARATOR);

    format!(
        "{}\n\nContext:\n{}\n\nQuestion: {}\nAnswer:",
        INSTRUCTION, context, question
    )
}

/// Upper bound on the characters of retrieved text sent to the generator.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ContextBudget {
    pub max_chars: Option<usize>,
}

impl ContextBudget {
    pub fn new(max_chars: Option<usize>) -> Self {
        Self { max_chars }
    }

    pub fn unlimited() -> Self {
        Self::default()
    }

    /// Keeps the longest rank-order prefix of `texts` that fits, counting one
    /// separator per text. Whole texts only.
    pub fn apply<'a>(&self, texts: Vec<&'a str>) -> Vec<&'a str> {
        let Some(max_chars) = self.max_chars else {
            return texts;
        };

        let total = texts.len();
        let mut used = 0usize;
        let mut kept = Vec::with_capacity(total);
        for text in texts {
            let cost = text.chars().count() + SEPARATOR.len();
            if used + cost > max_chars {
                break;
            }
            used += cost;
            kept.push(text);
        }

        if kept.len() < total {
            tracing::debug!(
                kept = kept.len(),
                dropped = total - kept.len(),
                max_chars,
                "context budget dropped retrieved texts"
            );
        }
        kept
    }
}
