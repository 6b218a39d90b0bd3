//! Stage orchestration.
//!
//! Runs the enabled stages in order over one text buffer. A stage that
//! fails, panics or times out leaves the buffer as it was and the run
//! continues with the next stage.

pub mod model;

use futures::FutureExt;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use tersify_token::{load_counter, Opportunity, TokenAwareOptimizer, TokenCounter};

use crate::config::PipelineConfig;
use crate::error::{panic_message, PipelineResult, StageError};
use crate::stage::{
    AbbreviationStage, AbbreviationTable, CommandParaphraser, FrequencyDictionary,
    ParaphraseStage, SpellCheckStage, SpellChecker, Stage, StageKind, TokenAwareStage,
    UnavailableStage,
};

pub use model::{PipelineReport, StageHistory, StageResult, ORIGINAL_STAGE};

/// Hooks for watching a run as it happens.
pub trait PipelineObserver: Send + Sync {
    /// Called once, before the first stage.
    fn run_started(&self, _original_chars: usize, _original_tokens: usize) {}

    fn stage_started(&self, _stage: &str) {}

    fn stage_skipped(&self, _stage: &str) {}

    /// Called after every stage that ran, whether it succeeded or not.
    fn stage_finished(&self, _result: &StageResult, _input: &str, _output: &str) {}
}

/// Observer that ignores everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopObserver;

impl PipelineObserver for NoopObserver {}

struct StageSlot {
    stage: Arc<dyn Stage>,
    enabled: bool,
}

/// The configured chain of stages plus the tokenizer that measures them.
pub struct Pipeline {
    tokenizer: Arc<dyn TokenCounter>,
    optimizer: Arc<TokenAwareOptimizer>,
    slots: Vec<StageSlot>,
    timeout: Option<Duration>,
}

impl Pipeline {
    /// An empty pipeline. Stages are added with [`with_stage`](Self::with_stage).
    pub fn new(tokenizer: Arc<dyn TokenCounter>, optimizer: Arc<TokenAwareOptimizer>) -> Self {
        Self {
            tokenizer,
            optimizer,
            slots: Vec::new(),
            timeout: None,
        }
    }

    /// Build the four built-in stages from configuration.
    ///
    /// Tokenizer and optimizer failures are fatal. A stage whose resources
    /// cannot be loaded is replaced by one that fails on every run.
    pub fn from_config(config: &PipelineConfig) -> PipelineResult<Self> {
        let stages = &config.pipeline;
        let tokenizer: Arc<dyn TokenCounter> = Arc::from(load_counter(&config.tokenizer.model)?);
        let optimizer = Arc::new(TokenAwareOptimizer::new(
            &config.candidate_table(),
            Arc::clone(&tokenizer),
            stages.token_aware.min_token_savings,
        )?);

        info!(
            model = %tokenizer.model(),
            candidates = optimizer.len(),
            "Pipeline tokenizer ready"
        );

        let spell_check = load_stage(StageKind::SpellCheck, stages.spell_check.enabled, || {
            let dictionary = FrequencyDictionary::load(&stages.spell_check.dictionary_path)?;
            let checker = SpellChecker::new(dictionary, stages.spell_check.max_edit_distance);
            Ok(Arc::new(SpellCheckStage::new(checker)))
        });

        let abbreviations =
            load_stage(StageKind::Abbreviations, stages.abbreviations.enabled, || {
                let table = AbbreviationTable::load(&stages.abbreviations.custom_dict_path)?;
                Ok(Arc::new(AbbreviationStage::new(table)))
            });

        let token_aware = load_stage(StageKind::TokenAware, stages.token_aware.enabled, || {
            Ok(Arc::new(TokenAwareStage::new(Arc::clone(&optimizer))))
        });

        let paraphrase = &stages.ml_paraphrase;
        let ml_paraphrase = load_stage(StageKind::MlParaphrase, paraphrase.enabled, || {
            let backend = CommandParaphraser::new(&paraphrase.command, paraphrase.model.clone())?;
            Ok(Arc::new(ParaphraseStage::new(
                Arc::new(backend),
                Arc::clone(&tokenizer),
                paraphrase.max_length_ratio,
            )))
        });

        let pipeline = Self::new(tokenizer, optimizer)
            .with_stage(spell_check, stages.spell_check.enabled)
            .with_stage(abbreviations, stages.abbreviations.enabled)
            .with_stage(token_aware, stages.token_aware.enabled)
            .with_stage(ml_paraphrase, paraphrase.enabled);

        Ok(match stages.timeout() {
            Some(limit) => pipeline.with_timeout(limit),
            None => pipeline,
        })
    }

    /// Append a stage.
    pub fn with_stage(mut self, stage: Arc<dyn Stage>, enabled: bool) -> Self {
        self.slots.push(StageSlot { stage, enabled });
        self
    }

    /// Bound every stage call by `limit`.
    pub fn with_timeout(mut self, limit: Duration) -> Self {
        self.timeout = Some(limit);
        self
    }

    /// Enable or disable a stage by name. Returns false if no stage has that name.
    pub fn set_enabled(&mut self, stage: &str, enabled: bool) -> bool {
        match self.slots.iter_mut().find(|s| s.stage.name() == stage) {
            Some(slot) => {
                slot.enabled = enabled;
                true
            }
            None => false,
        }
    }

    /// Disable every stage not named in `stages`. Stages already disabled stay so.
    pub fn restrict_to<S: AsRef<str>>(&mut self, stages: &[S]) {
        for slot in &mut self.slots {
            if !stages.iter().any(|s| s.as_ref() == slot.stage.name()) {
                slot.enabled = false;
            }
        }
    }

    /// Stage names in run order, with their enabled flag.
    pub fn stage_names(&self) -> Vec<(&str, bool)> {
        self.slots
            .iter()
            .map(|s| (s.stage.name(), s.enabled))
            .collect()
    }

    pub fn tokenizer(&self) -> &Arc<dyn TokenCounter> {
        &self.tokenizer
    }

    pub fn count_tokens(&self, text: &str) -> usize {
        self.tokenizer.count_tokens(text)
    }

    /// Token count only. No stage runs.
    pub fn count_only(&self, text: &str) -> usize {
        self.count_tokens(text)
    }

    /// Token-aware opportunities in `text`. No stage runs and nothing is changed.
    pub fn analyze(&self, text: &str) -> Vec<Opportunity> {
        self.optimizer.analyze(text)
    }

    /// Run one stage over `input` and record the outcome.
    ///
    /// Returns the stage output on success and `input` unchanged otherwise.
    pub async fn run_stage(
        &self,
        stage: &dyn Stage,
        enabled: bool,
        input: &str,
        history: &mut StageHistory,
    ) -> String {
        self.execute_stage(stage, enabled, input, history, &NoopObserver)
            .await
    }

    /// Run every stage in order.
    pub async fn run(&self, text: &str) -> PipelineReport {
        self.run_observed(text, &NoopObserver).await
    }

    /// [`run`](Self::run), reporting progress to `observer`.
    pub async fn run_observed(&self, text: &str, observer: &dyn PipelineObserver) -> PipelineReport {
        let started = Instant::now();
        let original_tokens = self.count_tokens(text);
        let mut history = StageHistory::starting_at(original_tokens);

        let original_chars = text.chars().count();
        info!(
            chars = original_chars,
            tokens = original_tokens,
            stages = self.slots.iter().filter(|s| s.enabled).count(),
            "Starting pipeline"
        );
        observer.run_started(original_chars, original_tokens);

        let mut buffer = text.to_string();
        for slot in &self.slots {
            buffer = self
                .execute_stage(slot.stage.as_ref(), slot.enabled, &buffer, &mut history, observer)
                .await;
        }

        let final_tokens = self.count_tokens(&buffer);
        let report = PipelineReport {
            original_chars,
            final_chars: buffer.chars().count(),
            final_text: buffer,
            original_tokens,
            final_tokens,
            history,
            elapsed: started.elapsed(),
        };

        info!(
            original_tokens,
            final_tokens,
            saved = report.tokens_saved(),
            failures = report.history.failures().count(),
            "Pipeline finished"
        );
        report
    }

    async fn execute_stage(
        &self,
        stage: &dyn Stage,
        enabled: bool,
        input: &str,
        history: &mut StageHistory,
        observer: &dyn PipelineObserver,
    ) -> String {
        let name = stage.name();
        if !enabled {
            info!(stage = %name, "Skipping stage (disabled)");
            history.record_skip(name);
            observer.stage_skipped(name);
            return input.to_string();
        }

        observer.stage_started(name);
        let input_tokens = self.count_tokens(input);
        let started = Instant::now();
        let outcome = self.call_stage(stage, input).await;
        let elapsed = started.elapsed();

        let (result, output) = match outcome {
            Ok(output) => {
                let output_tokens = self.count_tokens(&output);
                info!(
                    stage = %name,
                    input_tokens,
                    output_tokens,
                    elapsed_ms = elapsed.as_millis() as u64,
                    "Stage completed"
                );
                (
                    StageResult::success(name, input_tokens, output_tokens, elapsed),
                    output,
                )
            }
            Err(e) => {
                warn!(stage = %name, error = %e, "Stage failed, passing input through");
                (
                    StageResult::failure(name, input_tokens, elapsed, e.to_string()),
                    input.to_string(),
                )
            }
        };

        observer.stage_finished(&result, input, &output);
        history.record(result);
        output
    }

    /// One stage call inside its error boundary.
    async fn call_stage(&self, stage: &dyn Stage, input: &str) -> Result<String, StageError> {
        let call = AssertUnwindSafe(stage.transform(input)).catch_unwind();

        let caught = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, call).await {
                Ok(caught) => caught,
                Err(_) => {
                    debug!(stage = %stage.name(), ?limit, "Stage timed out");
                    return Err(StageError::Timeout(limit));
                }
            },
            None => call.await,
        };

        caught.unwrap_or_else(|payload| Err(StageError::Panicked(panic_message(payload.as_ref()))))
    }
}

/// Build a stage, or a placeholder when its resources cannot load.
///
/// Disabled stages are built too, so [`Pipeline::set_enabled`] can turn
/// them on later. Their load failures are only logged at debug level.
fn load_stage<F, S>(kind: StageKind, enabled: bool, build: F) -> Arc<dyn Stage>
where
    F: FnOnce() -> Result<Arc<S>, StageError>,
    S: Stage + 'static,
{
    match build() {
        Ok(stage) => stage as Arc<dyn Stage>,
        Err(e) => {
            if enabled {
                warn!(stage = %kind, error = %e, "Stage resources failed to load");
            } else {
                debug!(stage = %kind, error = %e, "Resources for disabled stage failed to load");
            }
            Arc::new(UnavailableStage::new(kind.as_str(), e.to_string()))
        }
    }
}
