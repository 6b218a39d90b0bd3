//! Error types for token counting and optimization.

use thiserror::Error;

/// Errors raised while loading a tokenizer or building an optimizer.
///
/// All of these are startup-time failures: once a tokenizer and an
/// optimizer exist, counting and optimizing cannot fail.
#[derive(Error, Debug)]
pub enum TokenError {
    #[error("Unknown tokenizer model: {0}")]
    UnknownModel(String),

    #[error("Failed to load tokenizer '{model}': {reason}")]
    Load { model: String, reason: String },

    #[error("Invalid replacement pattern for '{phrase}': {source}")]
    InvalidPattern {
        phrase: String,
        #[source]
        source: regex::Error,
    },
}

/// Result type for token operations.
pub type TokenResult<T> = Result<T, TokenError>;

impl TokenError {
    /// Create a load error from any displayable cause.
    pub fn load(model: impl Into<String>, reason: impl std::fmt::Display) -> Self {
        Self::Load {
            model: model.into(),
            reason: reason.to_string(),
        }
    }
}
