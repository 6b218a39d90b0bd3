//! Candidate phrase replacements.
//!
//! A candidate only says what *could* be shortened. Whether it actually
//! saves tokens depends on the tokenizer, which is decided by the
//! optimizer when it is built.

use serde::{Deserialize, Serialize};

/// Linguistic intent of a candidate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CandidateCategory {
    Contraction,
    Reduction,
    Symbol,
    Technical,
    Filler,
    Custom,
}

/// A verbose phrase and the shorter text that may replace it.
///
/// `phrase` is matched case-insensitively on word boundaries. An empty
/// `replacement` deletes the phrase.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacementCandidate {
    pub phrase: String,
    pub replacement: String,
    pub category: CandidateCategory,
    /// Per-entry floor. Can only raise the optimizer's threshold.
    #[serde(default)]
    pub minimum_savings: Option<usize>,
}

impl ReplacementCandidate {
    pub fn new(
        phrase: impl Into<String>,
        replacement: impl Into<String>,
        category: CandidateCategory,
    ) -> Self {
        Self {
            phrase: phrase.into(),
            replacement: replacement.into(),
            category,
            minimum_savings: None,
        }
    }

    pub fn with_minimum_savings(mut self, minimum: usize) -> Self {
        self.minimum_savings = Some(minimum);
        self
    }

    /// Whether this candidate removes its phrase entirely.
    pub fn is_deletion(&self) -> bool {
        self.replacement.is_empty()
    }
}

use CandidateCategory::*;

const BUILTIN: &[(&str, &str, CandidateCategory)] = &[
    ("it is", "it's", Contraction),
    ("you are", "you're", Contraction),
    ("we are", "we're", Contraction),
    ("they are", "they're", Contraction),
    ("i am", "i'm", Contraction),
    ("do not", "don't", Contraction),
    ("does not", "doesn't", Contraction),
    ("did not", "didn't", Contraction),
    ("will not", "won't", Contraction),
    ("can not", "can't", Contraction),
    ("cannot", "can't", Contraction),
    ("should not", "shouldn't", Contraction),
    ("would not", "wouldn't", Contraction),
    ("could not", "couldn't", Contraction),
    ("have not", "haven't", Contraction),
    ("has not", "hasn't", Contraction),
    ("had not", "hadn't", Contraction),
    ("going to", "gonna", Reduction),
    ("want to", "wanna", Reduction),
    ("got to", "gotta", Reduction),
    ("approximately", "~", Symbol),
    ("equals", "=", Symbol),
    ("greater than", ">", Symbol),
    ("less than", "<", Symbol),
    ("and/or", "or", Symbol),
    ("version", "v", Technical),
    ("versus", "vs", Technical),
    ("example", "e.g.", Technical),
    ("that is", "i.e.", Technical),
    ("et cetera", "etc", Technical),
    ("number", "#", Technical),
    ("basically", "", Filler),
    ("actually", "", Filler),
    ("really", "", Filler),
    ("very", "", Filler),
    ("just", "", Filler),
    ("quite", "", Filler),
    ("rather", "", Filler),
];

/// Ordered collection of replacement candidates.
///
/// Order matters: it breaks ties between candidates with equal savings.
#[derive(Debug, Clone, Default)]
pub struct CandidateTable {
    candidates: Vec<ReplacementCandidate>,
}

impl CandidateTable {
    /// Table with no candidates.
    pub fn empty() -> Self {
        Self::default()
    }

    /// The standard table: contractions, casual reductions, symbols,
    /// technical shortenings and filler deletions.
    pub fn builtin() -> Self {
        let candidates = BUILTIN
            .iter()
            .map(|(phrase, replacement, category)| {
                ReplacementCandidate::new(*phrase, *replacement, *category)
            })
            .collect();
        Self { candidates }
    }

    /// Add a domain-specific phrase.
    pub fn add(&mut self, phrase: impl Into<String>, replacement: impl Into<String>) {
        self.push(ReplacementCandidate::new(phrase, replacement, Custom));
    }

    /// Insert a candidate, replacing an existing entry for the same phrase
    /// (compared case-insensitively) in place.
    pub fn push(&mut self, candidate: ReplacementCandidate) {
        let key = candidate.phrase.to_lowercase();
        let existing = self
            .candidates
            .iter_mut()
            .find(|c| c.phrase.to_lowercase() == key);

        match existing {
            Some(slot) => *slot = candidate,
            None => self.candidates.push(candidate),
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &ReplacementCandidate> {
        self.candidates.iter()
    }

    pub fn len(&self) -> usize {
        self.candidates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.candidates.is_empty()
    }
}

impl FromIterator<ReplacementCandidate> for CandidateTable {
    fn from_iter<I: IntoIterator<Item = ReplacementCandidate>>(iter: I) -> Self {
        let mut table = Self::empty();
        for candidate in iter {
            table.push(candidate);
        }
        table
    }
}
