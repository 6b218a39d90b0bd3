//! Default mode: run the pipeline and write the shortened text.

use anyhow::{Context, Result};
use colored::Colorize;
use indicatif::{ProgressBar, ProgressStyle};
use std::path::PathBuf;
use std::sync::Mutex;
use std::time::Duration;

use tersify_core::{Pipeline, PipelineObserver, StageResult};

use crate::output;

pub struct Options {
    pub output: Option<PathBuf>,
    pub json: bool,
    pub verbose: bool,
}

pub async fn execute(pipeline: &Pipeline, text: &str, options: Options) -> Result<()> {
    let observer = ConsoleObserver::new(options.verbose);
    let report = pipeline.run_observed(text, &observer).await;

    eprintln!("{}", output::RULE);
    for line in report.summary_lines() {
        eprintln!("{line}");
    }
    if options.verbose {
        output::print_stage_table(&report.history);
        if report.final_text != text {
            eprintln!("\nOverall changes:");
            eprintln!("{}", output::render_word_diff(text, &report.final_text));
        }
    }

    if let Some(path) = &options.output {
        std::fs::write(path, &report.final_text)
            .with_context(|| format!("Failed to write output file {}", path.display()))?;
    }

    if options.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if options.output.is_none() {
        println!("{}", report.final_text);
    }

    Ok(())
}

/// Prints progress to stderr. Verbose mode adds a spinner and per-stage diffs.
struct ConsoleObserver {
    verbose: bool,
    spinner: Mutex<Option<ProgressBar>>,
}

impl ConsoleObserver {
    fn new(verbose: bool) -> Self {
        Self {
            verbose,
            spinner: Mutex::new(None),
        }
    }

    fn clear_spinner(&self) {
        if let Some(spinner) = self.spinner.lock().ok().and_then(|mut s| s.take()) {
            spinner.finish_and_clear();
        }
    }
}

impl PipelineObserver for ConsoleObserver {
    fn run_started(&self, original_chars: usize, original_tokens: usize) {
        eprintln!("Starting token optimization pipeline...");
        eprintln!("Original text: {original_chars} chars, {original_tokens} tokens");
        eprintln!("{}", output::RULE);
    }

    fn stage_started(&self, stage: &str) {
        if !self.verbose {
            return;
        }

        let spinner = ProgressBar::new_spinner();
        let style = ProgressStyle::default_spinner()
            .template("{spinner} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner());
        spinner.set_style(style);
        spinner.set_message(format!("Running {stage}..."));
        spinner.enable_steady_tick(Duration::from_millis(100));

        if let Ok(mut slot) = self.spinner.lock() {
            *slot = Some(spinner);
        }
    }

    fn stage_skipped(&self, stage: &str) {
        eprintln!("{}", format!("Skipping {stage} (disabled in config)").dimmed());
    }

    fn stage_finished(&self, result: &StageResult, input: &str, output: &str) {
        self.clear_spinner();
        output::print_stage_line(result);
        if self.verbose && result.succeeded && input != output {
            eprintln!("{}", output::render_word_diff(input, output));
        }
    }
}
