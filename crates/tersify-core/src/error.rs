//! Centralized error types for tersify.

use std::any::Any;
use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Errors that stop the pipeline from starting.
#[derive(Error, Debug)]
pub enum PipelineError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Cannot read configuration file {}: {source}", path.display())]
    ConfigRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("TOML error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Tokenizer error: {0}")]
    Token(#[from] tersify_token::TokenError),
}

/// Result type for pipeline setup.
pub type PipelineResult<T> = Result<T, PipelineError>;

impl PipelineError {
    /// Create a configuration error.
    pub fn config(msg: impl Into<String>) -> Self {
        Self::Config(msg.into())
    }
}

/// Errors raised by a single stage. The orchestrator recovers from all of
/// them by passing the stage input through unchanged.
#[derive(Error, Debug)]
pub enum StageError {
    #[error("unavailable: {0}")]
    Unavailable(String),

    #[error("{0}")]
    Failed(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("panicked: {0}")]
    Panicked(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("process exited with {status}: {stderr}")]
    Process { status: String, stderr: String },
}

impl StageError {
    pub fn unavailable(msg: impl Into<String>) -> Self {
        Self::Unavailable(msg.into())
    }

    pub fn failed(msg: impl Into<String>) -> Self {
        Self::Failed(msg.into())
    }
}

impl From<tokio::task::JoinError> for StageError {
    fn from(err: tokio::task::JoinError) -> Self {
        if err.is_panic() {
            Self::Panicked(panic_message(err.into_panic().as_ref()))
        } else {
            Self::Failed(err.to_string())
        }
    }
}

/// Best-effort text of a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
    payload
        .downcast_ref::<&str>()
        .map(|s| s.to_string())
        .or_else(|| payload.downcast_ref::<String>().cloned())
        .unwrap_or_else(|| "unknown panic".to_string())
}
