//! Tersify Core Library
//!
//! Configuration, the text-shortening stages and the orchestrator that
//! chains them.

pub mod config;
pub mod error;
pub mod pipeline;
pub mod stage;

pub use config::PipelineConfig;
pub use error::{PipelineError, PipelineResult, StageError};
pub use pipeline::{
    NoopObserver, Pipeline, PipelineObserver, PipelineReport, StageHistory, StageResult,
};
pub use stage::{Stage, StageKind, UnavailableStage};
