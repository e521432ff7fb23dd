//! Token counting for prompt budgets
//!
//! Provides:
//! - BPE token counts via tiktoken (`cl100k_base`, `o200k_base`)
//! - A character-ratio heuristic for offline use and tests
//! - Suffix truncation to a token budget (most recent text wins)

use crate::errors::{AppError, Result};
use std::sync::Arc;
use tiktoken_rs::CoreBPE;

/// Estimates the token cost of text.
///
/// Every budget in the pipeline is computed with the same counter, so the
/// unit stays consistent between accounting and truncation.
pub trait TokenCounter: Send + Sync {
    /// Count tokens in `text`
    fn count(&self, text: &str) -> usize;

    /// Longest suffix of `text` whose token count does not exceed `max_tokens`.
    ///
    /// The suffix always starts on a char boundary.
    fn keep_tail<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        if max_tokens == 0 || text.is_empty() {
            return "";
        }
        if self.count(text) <= max_tokens {
            return text;
        }

        let starts: Vec<usize> = text.char_indices().map(|(i, _)| i).collect();

        // Suffix counts shrink as the start moves right
        let (mut lo, mut hi) = (0, starts.len());
        while lo < hi {
            let mid = lo + (hi - lo) / 2;
            if self.count(&text[starts[mid]..]) <= max_tokens {
                hi = mid;
            } else {
                lo = mid + 1;
            }
        }

        starts.get(lo).map(|&i| &text[i..]).unwrap_or("")
    }
}

/// tiktoken-backed counter
pub struct BpeTokenCounter {
    bpe: CoreBPE,
    encoding: String,
}

impl BpeTokenCounter {
    /// Load a BPE encoding by name (`cl100k_base` or `o200k_base`)
    pub fn new(encoding: &str) -> Result<Self> {
        let bpe = match encoding.to_ascii_lowercase().as_str() {
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            other => {
                return Err(AppError::Configuration {
                    message: format!("Unsupported token encoding: {}", other),
                })
            }
        }
        .map_err(|e| AppError::Configuration {
            message: format!("Failed to load encoding {}: {}", encoding, e),
        })?;

        Ok(Self {
            bpe,
            encoding: encoding.to_string(),
        })
    }

    pub fn encoding(&self) -> &str {
        &self.encoding
    }
}

impl TokenCounter for BpeTokenCounter {
    fn count(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }
}

/// Ratio counter: one token per `chars_per_token` characters, rounded up
#[derive(Debug, Clone, Copy)]
pub struct HeuristicTokenCounter {
    chars_per_token: usize,
}

impl HeuristicTokenCounter {
    pub fn new(chars_per_token: usize) -> Self {
        Self {
            chars_per_token: chars_per_token.max(1),
        }
    }
}

impl Default for HeuristicTokenCounter {
    fn default() -> Self {
        // ~4 chars per token for English text
        Self::new(4)
    }
}

impl TokenCounter for HeuristicTokenCounter {
    fn count(&self, text: &str) -> usize {
        text.chars().count().div_ceil(self.chars_per_token)
    }

    fn keep_tail<'a>(&self, text: &'a str, max_tokens: usize) -> &'a str {
        let max_chars = max_tokens.saturating_mul(self.chars_per_token);
        let total = text.chars().count();
        if total <= max_chars {
            return text;
        }
        match text.char_indices().nth(total - max_chars) {
            Some((start, _)) => &text[start..],
            None => "",
        }
    }
}

/// Create a token counter from an encoding name.
///
/// `heuristic` selects [`HeuristicTokenCounter`]; anything else is loaded as
/// a BPE encoding.
pub fn create_token_counter(
    encoding: &str,
    chars_per_token: usize,
) -> Result<Arc<dyn TokenCounter>> {
    match encoding {
        "heuristic" => Ok(Arc::new(HeuristicTokenCounter::new(chars_per_token))),
        other => {
            let counter = BpeTokenCounter::new(other)?;
            tracing::info!(encoding = counter.encoding(), "Token counter loaded");
            Ok(Arc::new(counter))
        }
    }
}
