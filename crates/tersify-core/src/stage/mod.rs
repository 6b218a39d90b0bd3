//! Pipeline stages.
//!
//! Every stage is a text-to-text transform behind the [`Stage`] trait.
//! The orchestrator treats any error a stage returns as "no change".

pub mod abbreviations;
pub mod paraphrase;
pub mod spell_check;
pub mod token_aware;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::StageError;

pub use abbreviations::{AbbreviationStage, AbbreviationTable};
pub use paraphrase::{CommandParaphraser, ParaphraseStage, Paraphraser};
pub use spell_check::{FrequencyDictionary, SpellCheckStage, SpellChecker};
pub use token_aware::TokenAwareStage;

/// A text-to-text transform run by the pipeline.
#[async_trait]
pub trait Stage: Send + Sync {
    /// Name used in diagnostics and for enabling or disabling the stage.
    fn name(&self) -> &str;

    /// Transform `input`. Errors leave the pipeline buffer untouched.
    async fn transform(&self, input: &str) -> Result<String, StageError>;
}

/// The built-in stages, in pipeline order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    SpellCheck,
    Abbreviations,
    TokenAware,
    MlParaphrase,
}

impl StageKind {
    pub const ALL: [StageKind; 4] = [
        StageKind::SpellCheck,
        StageKind::Abbreviations,
        StageKind::TokenAware,
        StageKind::MlParaphrase,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            StageKind::SpellCheck => "spell_check",
            StageKind::Abbreviations => "abbreviations",
            StageKind::TokenAware => "token_aware",
            StageKind::MlParaphrase => "ml_paraphrase",
        }
    }
}

impl fmt::Display for StageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        StageKind::ALL
            .into_iter()
            .find(|k| k.as_str() == s)
            .ok_or_else(|| format!("unknown stage '{s}'"))
    }
}

/// Placeholder for a stage whose resources could not be loaded.
///
/// Fails on every call, so the problem is reported each run while the
/// rest of the pipeline keeps working.
#[derive(Debug, Clone)]
pub struct UnavailableStage {
    name: String,
    reason: String,
}

impl UnavailableStage {
    pub fn new(name: impl Into<String>, reason: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
impl Stage for UnavailableStage {
    fn name(&self) -> &str {
        &self.name
    }

    async fn transform(&self, _input: &str) -> Result<String, StageError> {
        Err(StageError::unavailable(self.reason.clone()))
    }
}

/// Run CPU-bound stage work on the blocking pool so timeouts can fire.
pub(crate) async fn run_blocking<F>(work: F) -> Result<String, StageError>
where
    F: FnOnce() -> Result<String, StageError> + Send + 'static,
{
    tokio::task::spawn_blocking(work).await?
}
