//! Pipeline run records.

use serde::{Serialize, Serializer};
use std::time::Duration;

/// Name of the synthetic first history entry.
pub const ORIGINAL_STAGE: &str = "Original";

fn serialize_secs<S: Serializer>(elapsed: &Duration, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_f64(elapsed.as_secs_f64())
}

/// Measurement of one stage run.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StageResult {
    pub stage: String,
    pub input_tokens: usize,
    pub output_tokens: usize,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
    pub succeeded: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl StageResult {
    pub fn success(
        stage: impl Into<String>,
        input_tokens: usize,
        output_tokens: usize,
        elapsed: Duration,
    ) -> Self {
        Self {
            stage: stage.into(),
            input_tokens,
            output_tokens,
            elapsed,
            succeeded: true,
            error: None,
        }
    }

    /// A failed run. The buffer was left unchanged, so output equals input.
    pub fn failure(
        stage: impl Into<String>,
        input_tokens: usize,
        elapsed: Duration,
        error: impl Into<String>,
    ) -> Self {
        Self {
            stage: stage.into(),
            input_tokens,
            output_tokens: input_tokens,
            elapsed,
            succeeded: false,
            error: Some(error.into()),
        }
    }

    /// Tokens removed by this stage; negative when the text grew.
    pub fn tokens_saved(&self) -> i64 {
        self.input_tokens as i64 - self.output_tokens as i64
    }

    /// One-line summary for the diagnostic stream.
    pub fn diagnostic_line(&self) -> String {
        if !self.succeeded {
            // Process stderr can span lines; keep the diagnostic on one.
            let reason = self
                .error
                .as_deref()
                .unwrap_or("unknown error")
                .split_whitespace()
                .collect::<Vec<_>>()
                .join(" ");
            return format!("✗ {} failed: {}", self.stage, reason);
        }

        let saved = self.tokens_saved();
        let delta = if saved >= 0 {
            format!("-{saved}")
        } else {
            format!("+{}", -saved)
        };
        format!(
            "✓ {}: {} -> {} tokens ({}, {:.2}s)",
            self.stage,
            self.input_tokens,
            self.output_tokens,
            delta,
            self.elapsed.as_secs_f64()
        )
    }
}

/// Append-only record of a pipeline run.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StageHistory {
    results: Vec<StageResult>,
    skipped: Vec<String>,
}

impl StageHistory {
    /// Start a history with the synthetic `Original` entry.
    pub fn starting_at(original_tokens: usize) -> Self {
        Self {
            results: vec![StageResult::success(
                ORIGINAL_STAGE,
                original_tokens,
                original_tokens,
                Duration::ZERO,
            )],
            skipped: Vec::new(),
        }
    }

    pub fn record(&mut self, result: StageResult) {
        self.results.push(result);
    }

    pub fn record_skip(&mut self, stage: impl Into<String>) {
        self.skipped.push(stage.into());
    }

    pub fn results(&self) -> &[StageResult] {
        &self.results
    }

    /// Results of stages that actually ran, without the `Original` entry.
    pub fn stages(&self) -> impl Iterator<Item = &StageResult> {
        self.results.iter().filter(|r| r.stage != ORIGINAL_STAGE)
    }

    pub fn skipped(&self) -> &[String] {
        &self.skipped
    }

    pub fn failures(&self) -> impl Iterator<Item = &StageResult> {
        self.results.iter().filter(|r| !r.succeeded)
    }

    pub fn get(&self, stage: &str) -> Option<&StageResult> {
        self.results.iter().find(|r| r.stage == stage)
    }
}

/// Outcome of [`Pipeline::run`](super::Pipeline::run).
#[derive(Debug, Clone, Serialize)]
pub struct PipelineReport {
    pub final_text: String,
    pub original_chars: usize,
    pub final_chars: usize,
    pub original_tokens: usize,
    pub final_tokens: usize,
    pub history: StageHistory,
    #[serde(rename = "elapsed_secs", serialize_with = "serialize_secs")]
    pub elapsed: Duration,
}

impl PipelineReport {
    /// Original minus final token count, from fresh counts of both texts.
    pub fn tokens_saved(&self) -> i64 {
        self.original_tokens as i64 - self.final_tokens as i64
    }

    /// Saved tokens as a percentage of the original; 0 for empty input.
    pub fn reduction_percent(&self) -> f64 {
        if self.original_tokens == 0 {
            0.0
        } else {
            self.tokens_saved() as f64 / self.original_tokens as f64 * 100.0
        }
    }

    /// Final size and total reduction lines.
    pub fn summary_lines(&self) -> Vec<String> {
        vec![
            format!(
                "Final text: {} chars, {} tokens",
                self.final_chars, self.final_tokens
            ),
            format!(
                "Total reduction: {} tokens ({:.1}%)",
                self.tokens_saved(),
                self.reduction_percent()
            ),
        ]
    }
}
