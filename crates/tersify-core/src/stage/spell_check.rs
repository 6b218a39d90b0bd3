//! Spelling correction against a word-frequency dictionary.
//!
//! The dictionary uses the SymSpell frequency format: one `term count`
//! pair per line. Only single-edit typos are corrected; anything that
//! looks like code, a path or a URL is left alone.

use async_trait::async_trait;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use tersify_token::text::{capitalize, is_all_upper, starts_upper};

use super::{run_blocking, Stage, StageKind};
use crate::error::StageError;

/// Characters and fragments that mark a word as code, a path or a URL.
const SKIP_MARKERS: [&str; 11] = ["/", "\\", ".com", ".org", "@", "$", "{", "}", "[", "]", "http"];

/// A dictionary suggestion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub term: String,
    pub distance: usize,
    pub count: u64,
}

/// Known words with their corpus frequencies.
#[derive(Debug, Clone, Default)]
pub struct FrequencyDictionary {
    counts: HashMap<String, u64>,
    by_length: BTreeMap<usize, Vec<String>>,
}

impl FrequencyDictionary {
    /// Load a dictionary file.
    pub fn load(path: &Path) -> Result<Self, StageError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StageError::unavailable(format!("cannot read dictionary {}: {e}", path.display()))
        })?;

        let dictionary = Self::parse(&content);
        if dictionary.is_empty() {
            return Err(StageError::unavailable(format!(
                "dictionary {} has no entries",
                path.display()
            )));
        }

        debug!(path = %path.display(), words = dictionary.len(), "Loaded frequency dictionary");
        Ok(dictionary)
    }

    /// Parse `term count` lines, skipping anything malformed.
    pub fn parse(content: &str) -> Self {
        let entries = content.lines().filter_map(|line| {
            let mut fields = line.split_whitespace();
            let term = fields.next()?;
            let count = fields.next()?.parse::<u64>().ok()?;
            Some((term.to_string(), count))
        });
        Self::from_entries(entries)
    }

    pub fn from_entries<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, u64)>,
        S: Into<String>,
    {
        let mut dictionary = Self::default();
        for (term, count) in entries {
            dictionary.insert(term.into(), count);
        }
        dictionary
    }

    /// Add a word. Repeated words keep the highest count.
    pub fn insert(&mut self, term: String, count: u64) {
        let term = term.to_lowercase();
        match self.counts.get_mut(&term) {
            Some(existing) => *existing = (*existing).max(count),
            None => {
                self.by_length
                    .entry(term.chars().count())
                    .or_default()
                    .push(term.clone());
                self.counts.insert(term, count);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.counts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.counts.is_empty()
    }

    pub fn contains(&self, word: &str) -> bool {
        self.counts.contains_key(word)
    }

    /// Closest known word within `max_distance` edits.
    ///
    /// Ties go to the more frequent word, then the alphabetically first.
    /// `word` is expected in lower case.
    pub fn lookup(&self, word: &str, max_distance: usize) -> Option<Suggestion> {
        if let Some(&count) = self.counts.get(word) {
            return Some(Suggestion {
                term: word.to_string(),
                distance: 0,
                count,
            });
        }
        if max_distance == 0 {
            return None;
        }

        let len = word.chars().count();
        let range = len.saturating_sub(max_distance)..=len + max_distance;

        let mut best: Option<Suggestion> = None;
        for term in self.by_length.range(range).flat_map(|(_, terms)| terms) {
            let distance = strsim::osa_distance(word, term);
            if distance > max_distance {
                continue;
            }
            let count = self.counts[term];
            let better = match &best {
                None => true,
                Some(b) => (distance, std::cmp::Reverse(count), term.as_str())
                    < (b.distance, std::cmp::Reverse(b.count), b.term.as_str()),
            };
            if better {
                best = Some(Suggestion {
                    term: term.clone(),
                    distance,
                    count,
                });
            }
        }
        best
    }
}

/// Line-oriented spelling corrector.
#[derive(Debug, Clone)]
pub struct SpellChecker {
    dictionary: FrequencyDictionary,
    max_edit_distance: usize,
}

impl SpellChecker {
    /// Edits further than this are never applied, whatever the lookup
    /// distance allows.
    const MAX_APPLIED_DISTANCE: usize = 1;

    pub fn new(dictionary: FrequencyDictionary, max_edit_distance: usize) -> Self {
        Self {
            dictionary,
            max_edit_distance,
        }
    }

    pub fn dictionary(&self) -> &FrequencyDictionary {
        &self.dictionary
    }

    /// Correct single-edit typos in prose lines.
    ///
    /// Fenced code blocks, indented lines and blank lines are kept as-is.
    pub fn correct_text(&self, text: &str) -> String {
        let mut cache: HashMap<String, Option<String>> = HashMap::new();
        let mut in_fence = false;
        let mut lines = Vec::new();

        for raw in text.split('\n') {
            let (line, cr) = match raw.strip_suffix('\r') {
                Some(stripped) => (stripped, "\r"),
                None => (raw, ""),
            };

            if line.trim_start().starts_with("```") {
                in_fence = !in_fence;
                lines.push(raw.to_string());
                continue;
            }
            if in_fence || line.starts_with("    ") || line.starts_with('\t') || line.trim().is_empty() {
                lines.push(raw.to_string());
                continue;
            }

            let words: Vec<String> = line
                .split_whitespace()
                .map(|word| self.correct_word(word, &mut cache))
                .collect();
            lines.push(format!("{}{}", words.join(" "), cr));
        }

        lines.join("\n")
    }

    fn correct_word(&self, word: &str, cache: &mut HashMap<String, Option<String>>) -> String {
        if SKIP_MARKERS.iter().any(|m| word.contains(m)) {
            return word.to_string();
        }

        let Some(start) = word.find(char::is_alphanumeric) else {
            return word.to_string();
        };
        let end = word
            .char_indices()
            .rev()
            .find(|(_, c)| c.is_alphanumeric())
            .map(|(i, c)| i + c.len_utf8())
            .unwrap_or(word.len());

        let (prefix, core, suffix) = (&word[..start], &word[start..end], &word[end..]);
        if core.chars().any(|c| c.is_ascii_digit()) {
            return word.to_string();
        }

        let lower = core.to_lowercase();
        let corrected = cache
            .entry(lower.clone())
            .or_insert_with(|| {
                let limit = self.max_edit_distance.min(Self::MAX_APPLIED_DISTANCE);
                self.dictionary
                    .lookup(&lower, limit)
                    .filter(|s| s.distance == Self::MAX_APPLIED_DISTANCE)
                    .map(|s| s.term)
            })
            .clone();

        match corrected {
            Some(term) => {
                let term = if is_all_upper(core) {
                    term.to_uppercase()
                } else if starts_upper(core) {
                    capitalize(&term)
                } else {
                    term
                };
                format!("{prefix}{term}{suffix}")
            }
            None => word.to_string(),
        }
    }
}

/// Pipeline stage wrapping a [`SpellChecker`].
#[derive(Debug, Clone)]
pub struct SpellCheckStage {
    checker: Arc<SpellChecker>,
}

impl SpellCheckStage {
    pub fn new(checker: SpellChecker) -> Self {
        Self {
            checker: Arc::new(checker),
        }
    }
}

#[async_trait]
impl Stage for SpellCheckStage {
    fn name(&self) -> &str {
        StageKind::SpellCheck.as_str()
    }

    async fn transform(&self, input: &str) -> Result<String, StageError> {
        let checker = Arc::clone(&self.checker);
        let text = input.to_string();
        run_blocking(move || Ok(checker.correct_text(&text))).await
    }
}
