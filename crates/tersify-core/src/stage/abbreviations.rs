//! Dictionary-driven abbreviation of long forms.

use async_trait::async_trait;
use regex::Regex;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

use tersify_token::text::{capitalize, is_all_upper, normalize_whitespace, starts_upper};

use super::{run_blocking, Stage, StageKind};
use crate::error::StageError;

/// One long form and its abbreviation.
#[derive(Debug, Clone)]
struct Abbreviation {
    long_form: String,
    short_form: String,
    pattern: Regex,
}

impl Abbreviation {
    fn new(long_form: String, short_form: String) -> Result<Self, StageError> {
        let pattern = Regex::new(&format!(r"(?i)\b{}\b", regex::escape(&long_form)))
            .map_err(|e| StageError::failed(format!("bad abbreviation '{long_form}': {e}")))?;
        Ok(Self {
            long_form,
            short_form,
            pattern,
        })
    }

    fn is_phrase(&self) -> bool {
        self.long_form.contains(' ')
    }

    /// Replacement for one match. Single words follow the case of the match.
    fn render(&self, matched: &str) -> String {
        if self.is_phrase() {
            return self.short_form.clone();
        }
        if is_all_upper(matched) {
            self.short_form.to_uppercase()
        } else if starts_upper(matched) {
            capitalize(&self.short_form)
        } else {
            self.short_form.clone()
        }
    }
}

/// A long form replaced during one pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AbbreviationHit {
    pub long_form: String,
    pub short_form: String,
    pub count: usize,
}

/// Flattened abbreviation dictionary, longest long form first.
#[derive(Debug, Clone, Default)]
pub struct AbbreviationTable {
    entries: Vec<Abbreviation>,
}

impl AbbreviationTable {
    /// Load `{ category: { long_form: short_form } }` from a JSON file.
    ///
    /// When two categories define the same long form, the category that
    /// sorts last wins.
    pub fn load(path: &Path) -> Result<Self, StageError> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            StageError::unavailable(format!(
                "cannot read abbreviations {}: {e}",
                path.display()
            ))
        })?;

        let categories: BTreeMap<String, BTreeMap<String, String>> =
            serde_json::from_str(&content).map_err(|e| {
                StageError::unavailable(format!("invalid abbreviations {}: {e}", path.display()))
            })?;

        let mut flat = BTreeMap::new();
        for entries in categories.into_values() {
            flat.extend(entries);
        }

        let table = Self::from_pairs(flat)?;
        debug!(path = %path.display(), entries = table.len(), "Loaded abbreviations");
        Ok(table)
    }

    pub fn from_pairs<I, L, S>(pairs: I) -> Result<Self, StageError>
    where
        I: IntoIterator<Item = (L, S)>,
        L: Into<String>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (long_form, short_form) in pairs {
            table.insert(long_form.into(), short_form.into())?;
        }
        table.sort();
        Ok(table)
    }

    /// Add or replace one abbreviation.
    pub fn add_custom_abbreviation(
        &mut self,
        long_form: impl Into<String>,
        short_form: impl Into<String>,
    ) -> Result<(), StageError> {
        self.insert(long_form.into(), short_form.into())?;
        self.sort();
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Replace every long form, longest first, and report what changed.
    ///
    /// Single words with an empty short form are never deleted; only
    /// phrases can be removed outright.
    pub fn replace(&self, text: &str) -> (String, Vec<AbbreviationHit>) {
        let mut text = text.to_string();
        let mut hits = Vec::new();

        for entry in &self.entries {
            if entry.short_form.is_empty() && !entry.is_phrase() {
                continue;
            }

            let count = entry.pattern.find_iter(&text).count();
            if count == 0 {
                continue;
            }

            text = entry
                .pattern
                .replace_all(&text, |caps: &regex::Captures| entry.render(&caps[0]))
                .into_owned();

            hits.push(AbbreviationHit {
                long_form: entry.long_form.clone(),
                short_form: entry.short_form.clone(),
                count,
            });
        }

        (normalize_whitespace(&text), hits)
    }

    fn insert(&mut self, long_form: String, short_form: String) -> Result<(), StageError> {
        let entry = Abbreviation::new(long_form, short_form)?;
        match self
            .entries
            .iter_mut()
            .find(|e| e.long_form == entry.long_form)
        {
            Some(existing) => *existing = entry,
            None => self.entries.push(entry),
        }
        Ok(())
    }

    fn sort(&mut self) {
        self.entries
            .sort_by(|a, b| b.long_form.chars().count().cmp(&a.long_form.chars().count()));
    }
}

/// Pipeline stage wrapping an [`AbbreviationTable`].
#[derive(Debug, Clone)]
pub struct AbbreviationStage {
    table: Arc<AbbreviationTable>,
}

impl AbbreviationStage {
    pub fn new(table: AbbreviationTable) -> Self {
        Self {
            table: Arc::new(table),
        }
    }
}

#[async_trait]
impl Stage for AbbreviationStage {
    fn name(&self) -> &str {
        StageKind::Abbreviations.as_str()
    }

    async fn transform(&self, input: &str) -> Result<String, StageError> {
        let table = Arc::clone(&self.table);
        let text = input.to_string();
        run_blocking(move || {
            let (output, hits) = table.replace(&text);
            for hit in &hits {
                debug!(
                    long_form = %hit.long_form,
                    short_form = %hit.short_form,
                    count = hit.count,
                    "Abbreviated"
                );
            }
            Ok(output)
        })
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn table() -> AbbreviationTable {
        AbbreviationTable::from_pairs([
            ("repository", "repo"),
            ("development", "dev"),
            ("configuration", "config"),
            ("please", ""),
            ("please could you", ""),
            ("could you", ""),
            ("thank you very much", "thanks"),
            ("thank you", "thanks"),
        ])
        .unwrap()
    }

    #[test]
    fn test_basic_replacements() {
        let (result, _) = table().replace("Please help me with the repository development configuration");
        assert!(result.contains("repo"));
        assert!(result.contains("dev"));
        assert!(result.contains("config"));
        assert!(!result.contains("repository"));
        assert!(!result.contains("development"));
    }

    #[test]
    fn test_case_preservation() {
        let t = table();
        assert_eq!(t.replace("Repository").0, "Repo");
        assert_eq!(t.replace("DEVELOPMENT").0, "DEV");
        assert_eq!(t.replace("Configuration").0, "Config");
        assert_eq!(t.replace("repository").0, "repo");
    }

    #[test]
    fn test_phrase_removal() {
        let (result, _) = table().replace("Please could you help me understand");
        assert_eq!(result, "help me understand");
    }

    #[test]
    fn test_single_word_never_deleted() {
        // "please" alone has an empty short form, so it stays.
        let (result, hits) = table().replace("Help me, please.");
        assert_eq!(result, "Help me, please.");
        assert!(hits.is_empty());
    }

    #[test]
    fn test_longest_first() {
        let (result, hits) = table().replace("Thank you very much for your help");
        assert_eq!(result, "thanks for your help");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].long_form, "thank you very much");
    }

    #[test]
    fn test_hit_counts() {
        let (result, hits) =
            table().replace("Repository repository REPOSITORY development Development");
        assert_eq!(result, "Repo repo REPO dev Dev");
        let repo = hits.iter().find(|h| h.long_form == "repository").unwrap();
        assert_eq!(repo.count, 3);
        let dev = hits.iter().find(|h| h.long_form == "development").unwrap();
        assert_eq!(dev.count, 2);
    }

    #[test]
    fn test_whole_words_only() {
        let (result, hits) = table().replace("repositoryName and developmental work");
        assert_eq!(result, "repositoryName and developmental work");
        assert!(hits.is_empty());
    }

    #[test]
    fn test_custom_abbreviation() {
        let mut t = table();
        t.add_custom_abbreviation("application", "app").unwrap();
        t.add_custom_abbreviation("repository", "rp").unwrap();
        assert_eq!(t.replace("application repository").0, "app rp");
    }

    #[test]
    fn test_load_flattens_categories() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("abbreviations.json");
        let mut f = std::fs::File::create(&path).unwrap();
        f.write_all(
            br#"{
                "technical": {"repository": "repo", "documentation": "docs"},
                "politeness": {"could you please": ""}
            }"#,
        )
        .unwrap();

        let t = AbbreviationTable::load(&path).unwrap();
        assert_eq!(t.len(), 3);
        assert_eq!(
            t.replace("Could you please read the documentation?").0,
            "read the docs?"
        );
    }

    #[test]
    fn test_load_errors_are_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("broken.json");
        std::fs::write(&path, "{ not json").unwrap();
        assert!(matches!(
            AbbreviationTable::load(&path).unwrap_err(),
            StageError::Unavailable(_)
        ));
        assert!(matches!(
            AbbreviationTable::load(&dir.path().join("missing.json")).unwrap_err(),
            StageError::Unavailable(_)
        ));
    }

    #[tokio::test]
    async fn test_stage_transform() {
        let stage = AbbreviationStage::new(table());
        assert_eq!(stage.name(), "abbreviations");
        assert_eq!(
            stage.transform("the repository  configuration").await.unwrap(),
            "the repo config"
        );
    }
}
