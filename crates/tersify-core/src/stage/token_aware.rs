//! Token-aware replacement as a pipeline stage.

use async_trait::async_trait;
use std::sync::Arc;
use tracing::debug;

use tersify_token::TokenAwareOptimizer;

use super::{run_blocking, Stage, StageKind};
use crate::error::StageError;

/// Runs a shared [`TokenAwareOptimizer`] over the pipeline buffer.
#[derive(Debug, Clone)]
pub struct TokenAwareStage {
    optimizer: Arc<TokenAwareOptimizer>,
}

impl TokenAwareStage {
    pub fn new(optimizer: Arc<TokenAwareOptimizer>) -> Self {
        Self { optimizer }
    }

    pub fn optimizer(&self) -> &Arc<TokenAwareOptimizer> {
        &self.optimizer
    }
}

#[async_trait]
impl Stage for TokenAwareStage {
    fn name(&self) -> &str {
        StageKind::TokenAware.as_str()
    }

    async fn transform(&self, input: &str) -> Result<String, StageError> {
        let optimizer = Arc::clone(&self.optimizer);
        let text = input.to_string();
        run_blocking(move || {
            let (output, report) = optimizer.optimize(&text);
            debug!(
                replacements = report.replacements.len(),
                tokens_saved = report.total_tokens_saved,
                "Token-aware pass finished\n{}",
                report.to_display_string()
            );
            Ok(output)
        })
        .await
    }
}
