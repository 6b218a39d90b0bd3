//! Model-based paraphrasing.
//!
//! The model itself lives outside this crate. [`ParaphraseStage`] chunks
//! the text and hands each chunk to a [`Paraphraser`]; the shipped
//! backend, [`CommandParaphraser`], talks to an external program over
//! stdin and stdout.

use async_trait::async_trait;
use std::fmt;
use std::io::ErrorKind;
use std::process::Stdio;
use std::sync::Arc;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use tersify_token::TokenCounter;

use super::{Stage, StageKind};
use crate::error::StageError;

/// Prefix some models echo back in front of their output.
const ECHO_PREFIX: &str = "paraphrase:";

/// Rewrites text more concisely.
#[async_trait]
pub trait Paraphraser: Send + Sync {
    /// Paraphrase `text`, aiming for `max_length_ratio` of its length.
    async fn paraphrase(&self, text: &str, max_length_ratio: f64) -> Result<String, StageError>;
}

/// Runs an external program once per chunk.
///
/// The program receives the chunk on stdin with `--model <model> --ratio
/// <ratio>` appended to its arguments, and must print the paraphrase on
/// stdout. It is killed if the call is cancelled.
#[derive(Debug, Clone)]
pub struct CommandParaphraser {
    program: String,
    args: Vec<String>,
    model: String,
}

impl CommandParaphraser {
    pub fn new(command: &[String], model: impl Into<String>) -> Result<Self, StageError> {
        let (program, args) = command
            .split_first()
            .filter(|(program, _)| !program.trim().is_empty())
            .ok_or_else(|| StageError::unavailable("no paraphrase command configured"))?;

        Ok(Self {
            program: program.clone(),
            args: args.to_vec(),
            model: model.into(),
        })
    }
}

#[async_trait]
impl Paraphraser for CommandParaphraser {
    async fn paraphrase(&self, text: &str, max_length_ratio: f64) -> Result<String, StageError> {
        let mut child = Command::new(&self.program)
            .args(&self.args)
            .arg("--model")
            .arg(&self.model)
            .arg("--ratio")
            .arg(max_length_ratio.to_string())
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| StageError::unavailable(format!("cannot start '{}': {e}", self.program)))?;

        let mut stdin = child
            .stdin
            .take()
            .ok_or_else(|| StageError::failed("paraphrase command has no stdin"))?;
        let input = text.to_string();
        let writer = tokio::spawn(async move {
            match stdin.write_all(input.as_bytes()).await {
                // The program may exit without reading everything.
                Err(e) if e.kind() != ErrorKind::BrokenPipe => Err(e),
                _ => Ok(()),
            }
        });

        let output = child.wait_with_output().await?;
        writer.await??;

        if !output.status.success() {
            return Err(StageError::Process {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }

        Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
    }
}

/// Chunked paraphrasing stage.
pub struct ParaphraseStage {
    paraphraser: Arc<dyn Paraphraser>,
    counter: Arc<dyn TokenCounter>,
    max_length_ratio: f64,
    max_chunk_tokens: usize,
}

impl ParaphraseStage {
    pub const DEFAULT_CHUNK_TOKENS: usize = 400;

    pub fn new(
        paraphraser: Arc<dyn Paraphraser>,
        counter: Arc<dyn TokenCounter>,
        max_length_ratio: f64,
    ) -> Self {
        Self {
            paraphraser,
            counter,
            max_length_ratio,
            max_chunk_tokens: Self::DEFAULT_CHUNK_TOKENS,
        }
    }

    pub fn with_max_chunk_tokens(mut self, max_chunk_tokens: usize) -> Self {
        self.max_chunk_tokens = max_chunk_tokens;
        self
    }

    /// Group sentences into chunks of at most `max_chunk_tokens`.
    ///
    /// A single sentence longer than the limit becomes its own chunk.
    pub fn split_into_chunks(&self, text: &str) -> Vec<String> {
        let mut chunks = Vec::new();
        let mut current: Vec<&str> = Vec::new();
        let mut current_tokens = 0;

        for sentence in split_sentences(text) {
            let tokens = self.counter.count_tokens(sentence);
            if current_tokens + tokens > self.max_chunk_tokens && !current.is_empty() {
                chunks.push(current.join(" "));
                current.clear();
                current_tokens = 0;
            }
            current.push(sentence);
            current_tokens += tokens;
        }

        if !current.is_empty() {
            chunks.push(current.join(" "));
        }
        chunks
    }
}

impl fmt::Debug for ParaphraseStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParaphraseStage")
            .field("tokenizer", &self.counter.model())
            .field("max_length_ratio", &self.max_length_ratio)
            .field("max_chunk_tokens", &self.max_chunk_tokens)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl Stage for ParaphraseStage {
    fn name(&self) -> &str {
        StageKind::MlParaphrase.as_str()
    }

    async fn transform(&self, input: &str) -> Result<String, StageError> {
        let chunks = self.split_into_chunks(input);
        let mut paraphrased = Vec::with_capacity(chunks.len());

        for (i, chunk) in chunks.iter().enumerate() {
            if chunk.trim().is_empty() {
                continue;
            }
            let output = self
                .paraphraser
                .paraphrase(chunk, self.max_length_ratio)
                .await?;
            let output = match output.strip_prefix(ECHO_PREFIX) {
                Some(rest) => rest.trim().to_string(),
                None => output,
            };
            debug!(chunk = i, input_chars = chunk.len(), output_chars = output.len(), "Paraphrased chunk");
            paraphrased.push(output);
        }

        Ok(paraphrased.join(" "))
    }
}

/// Split after `. `, `! ` and `? `, dropping the separating space.
fn split_sentences(text: &str) -> Vec<&str> {
    let bytes = text.as_bytes();
    let mut sentences = Vec::new();
    let mut start = 0;

    for i in 0..bytes.len().saturating_sub(1) {
        if matches!(bytes[i], b'.' | b'!' | b'?') && bytes[i + 1] == b' ' {
            sentences.push(&text[start..=i]);
            start = i + 2;
        }
    }
    sentences.push(&text[start..]);
    sentences
}
