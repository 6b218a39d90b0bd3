//! Optimization reports.
//!
//! Structured results of [`TokenAwareOptimizer::optimize`] and
//! [`TokenAwareOptimizer::analyze`], plus their human-readable rendering.
//!
//! [`TokenAwareOptimizer::optimize`]: crate::optimizer::TokenAwareOptimizer::optimize
//! [`TokenAwareOptimizer::analyze`]: crate::optimizer::TokenAwareOptimizer::analyze

use serde::{Deserialize, Serialize};

/// One phrase that was actually replaced.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AppliedReplacement {
    pub original: String,
    pub replacement: String,
    pub occurrences: usize,
    pub tokens_saved: usize,
}

/// Outcome of one optimize call.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct OptimizationReport {
    pub total_tokens_saved: usize,
    /// In processing order, highest per-phrase savings first.
    pub replacements: Vec<AppliedReplacement>,
    pub original_tokens: usize,
    pub optimized_tokens: usize,
}

impl OptimizationReport {
    /// Share of the original tokens that were saved, in percent.
    pub fn reduction_percent(&self) -> f64 {
        if self.original_tokens == 0 {
            0.0
        } else {
            self.total_tokens_saved as f64 / self.original_tokens as f64 * 100.0
        }
    }

    /// Format the report as a human-readable string.
    pub fn to_display_string(&self) -> String {
        let mut output = String::new();

        output.push_str("--- Token Optimization Statistics ---\n");
        output.push_str(&format!("Original tokens:    {:>8}\n", self.original_tokens));
        output.push_str(&format!("Optimized tokens:   {:>8}\n", self.optimized_tokens));
        output.push_str(&format!("Total tokens saved: {:>8}\n", self.total_tokens_saved));
        output.push_str(&format!("Reduction:          {:>7.1}%\n", self.reduction_percent()));

        if !self.replacements.is_empty() {
            output.push_str("\nReplacements made:\n");
            for r in &self.replacements {
                output.push_str(&format!(
                    "  '{}' → '{}': {} times, saved {} tokens\n",
                    r.original, r.replacement, r.occurrences, r.tokens_saved
                ));
            }
        }

        output
    }
}

/// A replacement that would apply to a text, as reported by analyze mode.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Opportunity {
    pub phrase: String,
    pub suggested: String,
    pub occurrences: usize,
    pub tokens_per_occurrence: usize,
    pub total_savings: usize,
}

/// Sum of `total_savings` over the first `limit` opportunities.
pub fn total_savings(opportunities: &[Opportunity], limit: usize) -> usize {
    opportunities.iter().take(limit).map(|o| o.total_savings).sum()
}

/// Render the top `limit` opportunities, or a notice when there are none.
pub fn opportunities_display(opportunities: &[Opportunity], limit: usize) -> String {
    if opportunities.is_empty() {
        return "No significant token optimizations found.\n".to_string();
    }

    let mut output = String::from("Potential token-aware optimizations:\n");
    for o in opportunities.iter().take(limit) {
        output.push_str(&format!(
            "  '{}' → '{}': {}x, save {} tokens\n",
            o.phrase, o.suggested, o.occurrences, o.total_savings
        ));
    }
    output.push_str(&format!(
        "\nTotal potential savings from top {}: {} tokens\n",
        limit.min(opportunities.len()),
        total_savings(opportunities, limit)
    ));

    output
}

#[cfg(test)]
mod tests {
    use super::*;

    fn opportunity(phrase: &str, total: usize) -> Opportunity {
        Opportunity {
            phrase: phrase.to_string(),
            suggested: String::new(),
            occurrences: total,
            tokens_per_occurrence: 1,
            total_savings: total,
        }
    }

    #[test]
    fn test_reduction_percent_zero_original() {
        let report = OptimizationReport::default();
        assert_eq!(report.reduction_percent(), 0.0);
    }

    #[test]
    fn test_display_lists_replacements() {
        let report = OptimizationReport {
            total_tokens_saved: 2,
            replacements: vec![AppliedReplacement {
                original: "very".into(),
                replacement: String::new(),
                occurrences: 2,
                tokens_saved: 2,
            }],
            original_tokens: 10,
            optimized_tokens: 8,
        };
        let text = report.to_display_string();
        assert!(text.contains("'very' → '': 2 times, saved 2 tokens"));
        assert!(text.contains("20.0%"));
    }

    #[test]
    fn test_opportunities_top_limit() {
        let list: Vec<_> = (0..12).rev().map(|i| opportunity(&format!("p{i}"), i + 1)).collect();
        let text = opportunities_display(&list, 10);
        assert!(text.contains("'p11'"));
        assert!(!text.contains("'p1'"));
        // 12 + 11 + ... + 3
        assert_eq!(total_savings(&list, 10), (3..=12).sum::<usize>());
        assert!(text.contains("from top 10: 75 tokens"));
    }

    #[test]
    fn test_opportunity_json_fields() {
        let json = serde_json::to_value(opportunity("very", 3)).unwrap();
        assert_eq!(json["phrase"], "very");
        assert_eq!(json["occurrences"], 3);
        assert_eq!(json["tokens_per_occurrence"], 1);
        assert_eq!(json["total_savings"], 3);
    }

    #[test]
    fn test_opportunities_empty() {
        assert_eq!(
            opportunities_display(&[], 10),
            "No significant token optimizations found.\n"
        );
    }
}
