//! Pipeline configuration.
//!
//! Loaded from TOML, YAML or JSON depending on the file extension. Every
//! section has defaults, so partial files are fine.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use tersify_token::{CandidateCategory, ReplacementCandidate};

use crate::error::{PipelineError, PipelineResult};

/// Top-level configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    pub tokenizer: TokenizerConfig,
    pub pipeline: StagesConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenizerConfig {
    pub model: String,
}

impl Default for TokenizerConfig {
    fn default() -> Self {
        Self {
            model: "gpt2".to_string(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StagesConfig {
    /// Wall-clock limit per stage. Unset means no limit.
    pub timeout_secs: Option<u64>,
    pub spell_check: SpellCheckConfig,
    pub abbreviations: AbbreviationsConfig,
    pub token_aware: TokenAwareConfig,
    pub ml_paraphrase: MlParaphraseConfig,
}

impl StagesConfig {
    pub fn timeout(&self) -> Option<Duration> {
        self.timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SpellCheckConfig {
    pub enabled: bool,
    pub max_edit_distance: usize,
    /// Frequency dictionary, one `term count` pair per line.
    pub dictionary_path: PathBuf,
}

impl Default for SpellCheckConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_edit_distance: 2,
            dictionary_path: PathBuf::from("config/frequency_dictionary_en.txt"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AbbreviationsConfig {
    pub enabled: bool,
    /// JSON file of `{ category: { long_form: short_form } }`.
    pub custom_dict_path: PathBuf,
}

impl Default for AbbreviationsConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            custom_dict_path: PathBuf::from("config/abbreviations.json"),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenAwareConfig {
    pub enabled: bool,
    pub min_token_savings: usize,
    pub custom_candidates: Vec<CustomCandidate>,
}

impl Default for TokenAwareConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            min_token_savings: 1,
            custom_candidates: Vec::new(),
        }
    }
}

/// A domain-specific replacement added on top of the built-in table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomCandidate {
    pub phrase: String,
    #[serde(default)]
    pub replacement: String,
    #[serde(default)]
    pub minimum_savings: Option<usize>,
}

impl From<&CustomCandidate> for ReplacementCandidate {
    fn from(c: &CustomCandidate) -> Self {
        let candidate = ReplacementCandidate::new(
            c.phrase.clone(),
            c.replacement.clone(),
            CandidateCategory::Custom,
        );
        match c.minimum_savings {
            Some(min) => candidate.with_minimum_savings(min),
            None => candidate,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MlParaphraseConfig {
    pub enabled: bool,
    pub model: String,
    pub max_length_ratio: f64,
    /// Program and arguments of the paraphrasing backend.
    pub command: Vec<String>,
}

impl Default for MlParaphraseConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            model: "t5-small".to_string(),
            max_length_ratio: 0.8,
            command: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Filter directive such as `info` or `tersify_core=debug`.
    pub level: Option<String>,
    pub file: Option<PathBuf>,
}

impl PipelineConfig {
    /// Load and validate a configuration file.
    ///
    /// Relative paths inside the file are resolved against its directory.
    pub fn load(path: &Path) -> PipelineResult<Self> {
        let content = std::fs::read_to_string(path).map_err(|source| PipelineError::ConfigRead {
            path: path.to_path_buf(),
            source,
        })?;

        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_ascii_lowercase);

        let mut config: PipelineConfig = match extension.as_deref() {
            Some("toml") => toml::from_str(&content)?,
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            Some("json") => serde_json::from_str(&content)?,
            _ => {
                return Err(PipelineError::config(format!(
                    "unsupported configuration format: {}",
                    path.display()
                )))
            }
        };

        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        config.validate()?;

        tracing::debug!(path = %path.display(), model = %config.tokenizer.model, "Loaded configuration");
        Ok(config)
    }

    /// Make relative resource paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() && !p.as_os_str().is_empty() {
                *p = base.join(&*p);
            }
        };

        resolve(&mut self.pipeline.spell_check.dictionary_path);
        resolve(&mut self.pipeline.abbreviations.custom_dict_path);
        if let Some(file) = self.logging.file.as_mut() {
            resolve(file);
        }
    }

    pub fn validate(&self) -> PipelineResult<()> {
        if self.tokenizer.model.trim().is_empty() {
            return Err(PipelineError::config("tokenizer.model must not be empty"));
        }

        let ratio = self.pipeline.ml_paraphrase.max_length_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            return Err(PipelineError::config(format!(
                "pipeline.ml_paraphrase.max_length_ratio must be in (0, 1], got {ratio}"
            )));
        }

        if self.pipeline.timeout_secs == Some(0) {
            return Err(PipelineError::config("pipeline.timeout_secs must be positive"));
        }

        if let Some(bad) = self
            .pipeline
            .token_aware
            .custom_candidates
            .iter()
            .find(|c| c.phrase.trim().is_empty())
        {
            return Err(PipelineError::config(format!(
                "custom candidate with empty phrase (replacement '{}')",
                bad.replacement
            )));
        }

        Ok(())
    }

    /// Built-in candidates plus the configured custom ones.
    pub fn candidate_table(&self) -> tersify_token::CandidateTable {
        let mut table = tersify_token::CandidateTable::builtin();
        for custom in &self.pipeline.token_aware.custom_candidates {
            table.push(custom.into());
        }
        table
    }
}
