//! Summary rollup.
//!
//! Folds new meeting content into the running summary using an opaque
//! condenser capability under a fixed length budget.

use crate::error::Result;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{debug, info};

pub mod condenser;

pub use condenser::HttpCondenser;

/// Hard ceiling on characters handed to the condenser.
pub const MAX_INPUT_CHARS: usize = 3000;

/// Below this many whitespace-delimited tokens the condenser is skipped.
pub const MIN_CONDENSE_TOKENS: usize = 30;

/// Output length bounds, in tokens, for one condenser call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LengthBounds {
    pub min_length: usize,
    pub max_length: usize,
}

impl Default for LengthBounds {
    fn default() -> Self {
        Self {
            min_length: 30,
            max_length: 150,
        }
    }
}

/// Text condensation capability. Calls are always deterministic (no sampling).
#[async_trait]
pub trait Condenser: Send + Sync {
    fn name(&self) -> &'static str;

    async fn condense(&self, text: &str, bounds: LengthBounds) -> Result<String>;
}

/// First `max_chars` characters of `text`, never splitting a character.
pub fn truncate_chars(text: &str, max_chars: usize) -> &str {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}

pub fn token_count(text: &str) -> usize {
    text.split_whitespace().count()
}

#[derive(Clone)]
pub struct Summarizer {
    condenser: Arc<dyn Condenser>,
    bounds: LengthBounds,
}

impl Summarizer {
    pub fn new(condenser: Arc<dyn Condenser>, bounds: LengthBounds) -> Self {
        Self { condenser, bounds }
    }

    /// Fold `new_text` into `prior_summaries`, producing one combined summary.
    ///
    /// Condenser failures propagate.
    pub async fn rollup(&self, new_text: &str, prior_summaries: &[String]) -> Result<String> {
        let mut parts: Vec<&str> = prior_summaries.iter().map(String::as_str).collect();
        parts.push(new_text);
        let joined = parts.join(" ");
        let combined = truncate_chars(&joined, MAX_INPUT_CHARS);

        if token_count(combined) < MIN_CONDENSE_TOKENS {
            debug!(
                "Rollup input has {} tokens, returning new text unchanged",
                token_count(combined)
            );
            return Ok(new_text.to_string());
        }

        info!(
            "Rolling up {} prior summaries with {} chars of new text via {}",
            prior_summaries.len(),
            new_text.len(),
            self.condenser.name()
        );
        self.condenser.condense(combined, self.bounds).await
    }

    /// Single-document pass used before rollup when the input is raw text.
    ///
    /// The upper bound shrinks to the document's own token count so short
    /// documents are not padded out.
    pub async fn condense_document(&self, text: &str) -> Result<String> {
        let text = truncate_chars(text, MAX_INPUT_CHARS);
        let tokens = token_count(text);
        if tokens < MIN_CONDENSE_TOKENS {
            return Ok(text.to_string());
        }

        let max_length = tokens.min(self.bounds.max_length);
        let bounds = LengthBounds {
            min_length: self.bounds.min_length.min(max_length),
            max_length,
        };
        debug!("Condensing {} token document with {:?}", tokens, bounds);
        self.condenser.condense(text, bounds).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PipelineError;
    use crate::testing::{FailingCondenser, RecordingCondenser};

    fn words(n: usize) -> String {
        (0..n).map(|i| format!("w{}", i)).collect::<Vec<_>>().join(" ")
    }

    #[test]
    fn test_truncate_chars_respects_char_boundaries() {
        assert_eq!(truncate_chars("héllo", 2), "hé");
        assert_eq!(truncate_chars("abc", 10), "abc");
        let long = "x".repeat(3500);
        assert_eq!(truncate_chars(&long, MAX_INPUT_CHARS).len(), 3000);
    }

    #[tokio::test]
    async fn test_rollup_short_text_is_returned_verbatim() {
        let condenser = Arc::new(RecordingCondenser::new("condensed"));
        let summarizer = Summarizer::new(condenser.clone(), LengthBounds::default());

        let text = "  Short update:\tnothing new.  ";
        let out = summarizer.rollup(text, &[]).await.unwrap();
        assert_eq!(out, text);
        assert!(condenser.calls().is_empty());
    }

    #[tokio::test]
    async fn test_rollup_joins_prior_summaries_then_new_text() {
        let condenser = Arc::new(RecordingCondenser::new("condensed"));
        let summarizer = Summarizer::new(condenser.clone(), LengthBounds::default());

        let prior = vec![words(20), "earlier".to_string()];
        let out = summarizer.rollup(&words(15), &prior).await.unwrap();
        assert_eq!(out, "condensed");

        let calls = condenser.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].0, format!("{} earlier {}", words(20), words(15)));
        assert_eq!(calls[0].1, LengthBounds::default());
    }

    #[tokio::test]
    async fn test_rollup_input_is_capped() {
        let condenser = Arc::new(RecordingCondenser::new("condensed"));
        let summarizer = Summarizer::new(condenser.clone(), LengthBounds::default());

        summarizer.rollup(&words(2000), &[]).await.unwrap();
        assert_eq!(condenser.calls()[0].0.chars().count(), MAX_INPUT_CHARS);
    }

    #[tokio::test]
    async fn test_rollup_propagates_condenser_failure() {
        let summarizer = Summarizer::new(Arc::new(FailingCondenser), LengthBounds::default());
        let err = summarizer.rollup(&words(40), &[]).await.unwrap_err();
        assert!(matches!(err, PipelineError::ServiceUnavailable(_)));
    }

    #[tokio::test]
    async fn test_condense_document_bounds_follow_token_count() {
        let condenser = Arc::new(RecordingCondenser::new("short"));
        let summarizer = Summarizer::new(condenser.clone(), LengthBounds::default());

        summarizer.condense_document(&words(40)).await.unwrap();
        summarizer.condense_document(&words(400)).await.unwrap();

        let calls = condenser.calls();
        assert_eq!(calls[0].1.max_length, 40);
        assert_eq!(calls[1].1.max_length, 150);
        assert_eq!(calls[1].1.min_length, 30);
    }

    #[tokio::test]
    async fn test_condense_document_lower_bound_never_exceeds_upper() {
        let condenser = Arc::new(RecordingCondenser::new("short"));
        let bounds = LengthBounds {
            min_length: 60,
            max_length: 150,
        };
        let summarizer = Summarizer::new(condenser.clone(), bounds);

        summarizer.condense_document(&words(40)).await.unwrap();

        let calls = condenser.calls();
        assert_eq!(calls[0].1.max_length, 40);
        assert_eq!(calls[0].1.min_length, 40);
    }

    #[tokio::test]
    async fn test_condense_document_skips_short_text() {
        let condenser = Arc::new(RecordingCondenser::new("unused"));
        let summarizer = Summarizer::new(condenser.clone(), LengthBounds::default());
        let out = summarizer.condense_document("two words").await.unwrap();
        assert_eq!(out, "two words");
        assert!(condenser.calls().is_empty());
    }
}
