//! Tersify CLI
//!
//! Shortens text for language-model prompts by running it through the
//! configured stages.

use anyhow::Result;
use clap::Parser;
use std::io::IsTerminal;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use tersify_core::config::LoggingConfig;

mod commands;
mod output;

use commands::Cli;

/// Initialize tracing on stderr, plus a log file when configured.
///
/// `RUST_LOG` wins over `logging.level`. Stdout carries results only.
fn init_tracing(logging: &LoggingConfig) -> Result<Option<WorkerGuard>> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env().or_else(|_| {
        tracing_subscriber::EnvFilter::try_new(logging.level.as_deref().unwrap_or("tersify=warn"))
    })?;

    let stderr_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(std::io::stderr().is_terminal());

    if let Some(path) = &logging.file {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)?;
        let (writer, guard) = tracing_appender::non_blocking(file);

        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false),
            )
            .init();
        Ok(Some(guard))
    } else {
        tracing_subscriber::registry()
            .with(env_filter)
            .with(stderr_layer)
            .init();
        Ok(None)
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = cli.load_config()?;
    let _guard = init_tracing(&config.logging)?;

    cli.execute(config).await
}
