//! Token-aware phrase replacement.
//!
//! Candidates are kept only if they save tokens under the active tokenizer.
//! Building the optimizer does all tokenizer work that does not depend on
//! the input; the result is immutable and can be shared between threads.

use regex::{Captures, Regex, RegexBuilder};
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

use crate::candidates::{CandidateCategory, CandidateTable};
use crate::error::{TokenError, TokenResult};
use crate::reporter::{AppliedReplacement, OptimizationReport, Opportunity};
use crate::text::{match_case, normalize_whitespace};
use crate::tokenizer::TokenCounter;

/// A candidate that saves at least its threshold when tokenized in isolation.
#[derive(Debug, Clone, Serialize)]
pub struct EfficientReplacement {
    pub phrase: String,
    pub replacement: String,
    pub category: CandidateCategory,
    pub savings: usize,
    pub original_tokens: usize,
    pub replacement_tokens: usize,
    /// Effective threshold for this entry, also applied in context.
    pub min_savings: usize,
    #[serde(skip)]
    pattern: Regex,
}

impl EfficientReplacement {
    /// Number of whole-word, case-insensitive occurrences in `text`.
    pub fn occurrences(&self, text: &str) -> usize {
        self.pattern.find_iter(text).count()
    }
}

/// Applies token-saving replacements to text.
pub struct TokenAwareOptimizer {
    tokenizer: Arc<dyn TokenCounter>,
    min_savings: usize,
    /// Candidate-table order.
    entries: Vec<EfficientReplacement>,
    /// Indices into `entries`, highest savings first, ties in table order.
    by_savings: Vec<usize>,
    /// Lower-cased phrase to index into `entries`.
    index: HashMap<String, usize>,
}

impl TokenAwareOptimizer {
    /// Build the efficient replacement set for `tokenizer` and `min_savings`.
    pub fn new(
        table: &CandidateTable,
        tokenizer: Arc<dyn TokenCounter>,
        min_savings: usize,
    ) -> TokenResult<Self> {
        let mut entries = Vec::new();

        for candidate in table.iter() {
            if candidate.phrase.trim().is_empty() {
                tracing::warn!("Ignoring replacement candidate with an empty phrase");
                continue;
            }

            let original_tokens = tokenizer.count_tokens(&candidate.phrase);
            let replacement_tokens = if candidate.is_deletion() {
                0
            } else {
                tokenizer.count_tokens(&candidate.replacement)
            };
            let savings = original_tokens as i64 - replacement_tokens as i64;
            let threshold = min_savings.max(candidate.minimum_savings.unwrap_or(0));

            if savings < threshold as i64 {
                tracing::trace!(
                    phrase = %candidate.phrase,
                    savings,
                    threshold,
                    "Candidate does not save enough tokens"
                );
                continue;
            }

            let pattern = RegexBuilder::new(&format!(r"\b{}\b", regex::escape(&candidate.phrase)))
                .case_insensitive(true)
                .build()
                .map_err(|source| TokenError::InvalidPattern {
                    phrase: candidate.phrase.clone(),
                    source,
                })?;

            entries.push(EfficientReplacement {
                phrase: candidate.phrase.clone(),
                replacement: candidate.replacement.clone(),
                category: candidate.category,
                savings: savings as usize,
                original_tokens,
                replacement_tokens,
                min_savings: threshold,
                pattern,
            });
        }

        let mut by_savings: Vec<usize> = (0..entries.len()).collect();
        by_savings.sort_by(|&a, &b| entries[b].savings.cmp(&entries[a].savings));

        let index = entries
            .iter()
            .enumerate()
            .map(|(i, e)| (e.phrase.to_lowercase(), i))
            .collect();

        tracing::debug!(
            model = tokenizer.model(),
            candidates = table.len(),
            efficient = entries.len(),
            min_savings,
            "Built efficient replacement map"
        );

        Ok(Self {
            tokenizer,
            min_savings,
            entries,
            by_savings,
            index,
        })
    }

    /// Optimizer over the built-in candidate table.
    pub fn with_builtin(tokenizer: Arc<dyn TokenCounter>, min_savings: usize) -> TokenResult<Self> {
        Self::new(&CandidateTable::builtin(), tokenizer, min_savings)
    }

    pub fn min_savings(&self) -> usize {
        self.min_savings
    }

    pub fn tokenizer(&self) -> &Arc<dyn TokenCounter> {
        &self.tokenizer
    }

    /// Efficient entries in processing order, highest savings first.
    pub fn efficient(&self) -> impl Iterator<Item = &EfficientReplacement> {
        self.by_savings.iter().map(|&i| &self.entries[i])
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Look an entry up by phrase, case-insensitively.
    pub fn get(&self, phrase: &str) -> Option<&EfficientReplacement> {
        self.index
            .get(&phrase.to_lowercase())
            .map(|&i| &self.entries[i])
    }

    /// Apply every replacement that still saves tokens in context.
    ///
    /// Savings are re-measured on the first match of each phrase and that
    /// decision is applied to all of its matches.
    pub fn optimize(&self, text: &str) -> (String, OptimizationReport) {
        if text.is_empty() {
            return (String::new(), OptimizationReport::default());
        }

        let mut buffer = text.to_string();
        let mut replacements = Vec::new();
        let mut total_tokens_saved = 0;

        for entry in self.efficient() {
            let (occurrences, sample) = {
                let mut matches = entry.pattern.find_iter(&buffer);
                let Some(first) = matches.next() else {
                    continue;
                };
                (1 + matches.count(), first.as_str().to_string())
            };

            let would_be = match_case(&sample, &entry.replacement);
            let contextual = self.tokenizer.count_tokens(&sample) as i64
                - self.tokenizer.count_tokens(&would_be) as i64;

            if contextual < entry.min_savings as i64 {
                tracing::debug!(
                    phrase = %entry.phrase,
                    sample = %sample,
                    contextual,
                    "Replacement rejected in context"
                );
                continue;
            }

            buffer = entry
                .pattern
                .replace_all(&buffer, |caps: &Captures| match_case(&caps[0], &entry.replacement))
                .into_owned();

            let tokens_saved = contextual as usize * occurrences;
            total_tokens_saved += tokens_saved;
            tracing::debug!(
                phrase = %entry.phrase,
                replacement = %entry.replacement,
                occurrences,
                tokens_saved,
                "Applied replacement"
            );

            replacements.push(AppliedReplacement {
                original: entry.phrase.clone(),
                replacement: entry.replacement.clone(),
                occurrences,
                tokens_saved,
            });
        }

        let optimized = normalize_whitespace(&buffer);
        let report = OptimizationReport {
            total_tokens_saved,
            replacements,
            original_tokens: self.tokenizer.count_tokens(text),
            optimized_tokens: self.tokenizer.count_tokens(&optimized),
        };

        (optimized, report)
    }

    /// Report what [`optimize`](Self::optimize) could save, without
    /// changing anything.
    ///
    /// Uses the precomputed per-phrase savings, not in-context counts.
    /// Sorted by total savings, highest first.
    pub fn analyze(&self, text: &str) -> Vec<Opportunity> {
        let mut opportunities: Vec<Opportunity> = self
            .entries
            .iter()
            .filter_map(|entry| {
                let occurrences = entry.occurrences(text);
                (occurrences > 0).then(|| Opportunity {
                    phrase: entry.phrase.clone(),
                    suggested: entry.replacement.clone(),
                    occurrences,
                    tokens_per_occurrence: entry.savings,
                    total_savings: entry.savings * occurrences,
                })
            })
            .collect();

        opportunities.sort_by(|a, b| b.total_savings.cmp(&a.total_savings));
        opportunities
    }
}

impl fmt::Debug for TokenAwareOptimizer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokenAwareOptimizer")
            .field("model", &self.tokenizer.model())
            .field("min_savings", &self.min_savings)
            .field("efficient", &self.entries.len())
            .finish()
    }
}
