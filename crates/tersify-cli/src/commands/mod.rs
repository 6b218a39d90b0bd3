//! CLI definition and dispatch.

use anyhow::{Context, Result};
use clap::Parser;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

use tersify_core::{Pipeline, PipelineConfig, StageKind};

pub mod analyze;
pub mod count;
pub mod optimize;

/// Shorten text for language-model prompts
#[derive(Parser, Debug)]
#[command(name = "tersify")]
#[command(author, version, about, long_about = None)]
#[command(after_help = "Examples:
  tersify input.txt -o output.txt
  echo \"This is a test\" | tersify
  tersify input.txt --verbose
  tersify input.txt --analyze
  tersify input.txt --count-only")]
pub struct Cli {
    /// Input file (reads from stdin if not provided)
    pub input: Option<PathBuf>,

    /// Output file (prints to stdout if not provided)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Pipeline configuration file (.toml, .yaml or .json)
    #[arg(short, long, env = "TERSIFY_CONFIG")]
    pub config: Option<PathBuf>,

    /// Run only these stages
    #[arg(long, num_args = 1.., value_name = "STAGE")]
    pub stages: Vec<StageKind>,

    /// Analyze optimization potential without processing
    #[arg(short, long, conflicts_with = "count_only")]
    pub analyze: bool,

    /// Only show the token count
    #[arg(long)]
    pub count_only: bool,

    /// Print machine-readable JSON on stdout instead of text
    #[arg(long)]
    pub json: bool,

    /// Show per-stage diffs and a summary table
    #[arg(short, long)]
    pub verbose: bool,
}

impl Cli {
    /// Configuration from `--config`, or the built-in defaults.
    pub fn load_config(&self) -> Result<PipelineConfig> {
        match &self.config {
            Some(path) => PipelineConfig::load(path)
                .with_context(|| format!("Failed to load configuration {}", path.display())),
            None => Ok(PipelineConfig::default()),
        }
    }

    pub async fn execute(self, config: PipelineConfig) -> Result<()> {
        let text = read_input(self.input.as_deref())?;

        let mut pipeline =
            Pipeline::from_config(&config).context("Failed to initialize pipeline")?;
        if !self.stages.is_empty() {
            let names: Vec<&str> = self.stages.iter().map(StageKind::as_str).collect();
            pipeline.restrict_to(&names);
        }

        let enabled: Vec<&str> = pipeline
            .stage_names()
            .into_iter()
            .filter_map(|(name, on)| on.then_some(name))
            .collect();
        debug!(
            config = ?self.config,
            model = %pipeline.tokenizer().model(),
            stages = ?enabled,
            "Pipeline configured"
        );

        if self.count_only {
            count::execute(&pipeline, &text, self.json)
        } else if self.analyze {
            analyze::execute(&pipeline, &text, self.json)
        } else {
            let options = optimize::Options {
                output: self.output,
                json: self.json,
                verbose: self.verbose,
            };
            optimize::execute(&pipeline, &text, options).await
        }
    }
}

/// Read the whole input file, or stdin when no path is given.
fn read_input(path: Option<&Path>) -> Result<String> {
    match path {
        Some(path) => std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read input file {}", path.display())),
        None => {
            let mut text = String::new();
            std::io::stdin()
                .read_to_string(&mut text)
                .context("Failed to read standard input")?;
            Ok(text)
        }
    }
}
