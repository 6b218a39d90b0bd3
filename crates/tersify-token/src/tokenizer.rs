//! Token counting.
//!
//! Wraps tiktoken-rs BPE encodings behind the [`TokenCounter`] trait so the
//! optimizer and the pipeline can be driven by any deterministic counter.
//! Counts never include special or boundary tokens: they measure raw
//! content length only.

use serde::Serialize;
use std::fmt;
use tiktoken_rs::CoreBPE;

use crate::error::{TokenError, TokenResult};

/// Anything that can count tokens in a string.
///
/// Implementations must be deterministic and free of side effects so a
/// single instance can be shared across concurrent pipeline runs.
pub trait TokenCounter: Send + Sync {
    /// Number of tokens `text` encodes to.
    fn count_tokens(&self, text: &str) -> usize;

    /// Identifier of the underlying model. Counts are only comparable
    /// between counters reporting the same model.
    fn model(&self) -> &str;
}

/// Byte-pair-encoding tokenizer backed by tiktoken-rs.
pub struct BpeTokenizer {
    bpe: CoreBPE,
    model: String,
}

impl BpeTokenizer {
    /// Load the encoding used by `model`.
    ///
    /// Accepts encoding names (`r50k_base`, `cl100k_base`, ...), the
    /// `gpt2` alias and any model name tiktoken-rs knows about. There is
    /// no fallback encoding: an unknown name is an error.
    pub fn for_model(model: &str) -> TokenResult<Self> {
        let name = model.trim();
        let loaded = match name.to_ascii_lowercase().as_str() {
            "" => return Err(TokenError::UnknownModel(model.to_string())),
            "gpt2" | "r50k_base" => tiktoken_rs::r50k_base(),
            "p50k_base" => tiktoken_rs::p50k_base(),
            "p50k_edit" => tiktoken_rs::p50k_edit(),
            "cl100k_base" => tiktoken_rs::cl100k_base(),
            "o200k_base" => tiktoken_rs::o200k_base(),
            other => match tiktoken_rs::get_bpe_from_model(other) {
                Ok(bpe) => Ok(bpe),
                Err(_) => return Err(TokenError::UnknownModel(model.to_string())),
            },
        };

        let bpe = loaded.map_err(|e| TokenError::load(name, e))?;
        tracing::debug!(model = name, "Loaded BPE tokenizer");

        Ok(Self {
            bpe,
            model: name.to_string(),
        })
    }
}

impl TokenCounter for BpeTokenizer {
    fn count_tokens(&self, text: &str) -> usize {
        if text.is_empty() {
            return 0;
        }
        self.bpe.encode_ordinary(text).len()
    }

    fn model(&self) -> &str {
        &self.model
    }
}

impl fmt::Debug for BpeTokenizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BpeTokenizer")
            .field("model", &self.model)
            .finish_non_exhaustive()
    }
}

/// Deterministic approximation that needs no encoding data.
///
/// Every run of alphanumeric characters (plus `_`) is one token and every
/// other non-whitespace character is a token of its own.
#[derive(Debug, Default, Clone, Copy)]
pub struct WordTokenCounter;

impl WordTokenCounter {
    /// Model name that selects this counter in configuration.
    pub const MODEL: &'static str = "words";
}

impl TokenCounter for WordTokenCounter {
    fn count_tokens(&self, text: &str) -> usize {
        let mut count = 0;
        let mut in_word = false;
        for c in text.chars() {
            if c.is_alphanumeric() || c == '_' {
                if !in_word {
                    count += 1;
                    in_word = true;
                }
            } else {
                in_word = false;
                if !c.is_whitespace() {
                    count += 1;
                }
            }
        }
        count
    }

    fn model(&self) -> &str {
        Self::MODEL
    }
}

/// Load the counter configured by `model`.
///
/// `words` selects [`WordTokenCounter`]; every other name goes through
/// [`BpeTokenizer::for_model`].
pub fn load_counter(model: &str) -> TokenResult<Box<dyn TokenCounter>> {
    if model.trim().eq_ignore_ascii_case(WordTokenCounter::MODEL) {
        return Ok(Box::new(WordTokenCounter));
    }
    Ok(Box::new(BpeTokenizer::for_model(model)?))
}

/// Token count for a piece of text, paired with the model that produced it.
#[derive(Debug, Clone, Serialize)]
pub struct TokenCount {
    pub source: String,
    pub model: String,
    pub tokens: usize,
    pub characters: usize,
    pub lines: usize,
}

impl TokenCount {
    /// Measure `content` with `counter`.
    pub fn measure(counter: &dyn TokenCounter, source: &str, content: &str) -> Self {
        Self {
            source: source.to_string(),
            model: counter.model().to_string(),
            tokens: counter.count_tokens(content),
            characters: content.chars().count(),
            lines: content.lines().count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_word_counter_splits_punctuation() {
        let counter = WordTokenCounter;
        assert_eq!(counter.count_tokens("hello world test"), 3);
        assert_eq!(counter.count_tokens("don't"), 3);
        assert_eq!(counter.count_tokens("and/or"), 3);
        assert_eq!(counter.count_tokens("   "), 0);
        assert_eq!(counter.count_tokens(""), 0);
    }

    #[test]
    fn test_bpe_gpt2_alias() {
        let tokenizer = BpeTokenizer::for_model("gpt2").unwrap();
        assert_eq!(tokenizer.model(), "gpt2");
        assert_eq!(tokenizer.count_tokens(""), 0);
        assert!(tokenizer.count_tokens("hello world") >= 2);
    }

    #[test]
    fn test_bpe_is_deterministic() {
        let tokenizer = BpeTokenizer::for_model("cl100k_base").unwrap();
        let text = "It is important to note that we have requirements.";
        assert_eq!(tokenizer.count_tokens(text), tokenizer.count_tokens(text));
    }

    #[test]
    fn test_special_tokens_are_counted_as_text() {
        let tokenizer = BpeTokenizer::for_model("cl100k_base").unwrap();
        // Ordinary encoding splits the marker into several plain tokens.
        assert!(tokenizer.count_tokens("<|endoftext|>") > 1);
    }

    #[test]
    fn test_unknown_model_is_an_error() {
        let err = BpeTokenizer::for_model("definitely-not-a-model").unwrap_err();
        assert!(matches!(err, TokenError::UnknownModel(_)));
        assert!(BpeTokenizer::for_model("  ").is_err());
    }

    #[test]
    fn test_load_counter_words() {
        let counter = load_counter("words").unwrap();
        assert_eq!(counter.model(), "words");
        assert_eq!(counter.count_tokens("a, b"), 3);
    }

    #[test]
    fn test_measure() {
        let count = TokenCount::measure(&WordTokenCounter, "stdin", "one two\nthree");
        assert_eq!(count.tokens, 3);
        assert_eq!(count.lines, 2);
        assert_eq!(count.characters, 13);
        assert_eq!(count.model, "words");
    }
}
