use std::sync::Arc;

use proptest::prelude::*;
use tersify_token::text::normalize_whitespace;
use tersify_token::{TokenAwareOptimizer, WordTokenCounter};

fn optimizer(min_savings: usize) -> TokenAwareOptimizer {
    TokenAwareOptimizer::with_builtin(Arc::new(WordTokenCounter), min_savings).unwrap()
}

/// Words that form built-in phrases, plus plain words and punctuation.
/// Fillers are left out: deleting one can join its neighbours into a
/// phrase that was already processed.
const VOCABULARY: &[&str] = &[
    "going", "Going", "to", "want", "got", "greater", "less", "than", "THAN", "and/or", "et",
    "cetera", "it", "is", "you", "are", "the", "plan", "number", "we", ",", ".",
];

fn sentence() -> impl Strategy<Value = String> {
    prop::collection::vec(prop::sample::select(VOCABULARY), 0..24).prop_map(|words| words.join(" "))
}

proptest! {
    #[test]
    fn efficient_entries_meet_threshold(min_savings in 0usize..4) {
        let opt = optimizer(min_savings);
        for entry in opt.efficient() {
            prop_assert!(entry.savings >= min_savings);
            prop_assert_eq!(entry.savings, entry.original_tokens - entry.replacement_tokens);
        }
    }

    #[test]
    fn output_has_normalized_whitespace(s in "[a-zA-Z ,.!?\n]{0,120}") {
        let (out, _) = optimizer(1).optimize(&s);
        prop_assert!(!out.contains("  "));
        prop_assert_eq!(out.trim(), out.as_str());
        for p in [" ,", " .", " !", " ?"] {
            prop_assert!(!out.contains(p));
        }
    }

    #[test]
    fn report_tokens_are_fresh_counts(s in "[a-z ]{0,80}") {
        let opt = optimizer(1);
        let (out, report) = opt.optimize(&s);
        let counter = opt.tokenizer();
        prop_assert_eq!(report.original_tokens, counter.count_tokens(&s));
        prop_assert_eq!(report.optimized_tokens, counter.count_tokens(&out));
    }

    #[test]
    fn analyze_is_sorted(s in "(it is |very |and/or |going to |word )*") {
        let found = optimizer(1).analyze(&s);
        prop_assert!(found.windows(2).all(|w| w[0].total_savings >= w[1].total_savings));
        for o in &found {
            prop_assert_eq!(o.total_savings, o.tokens_per_occurrence * o.occurrences);
        }
    }

    #[test]
    fn replacements_do_not_match_their_own_phrase(min_savings in 0usize..3) {
        for entry in optimizer(min_savings).efficient() {
            prop_assert_eq!(entry.occurrences(&entry.replacement), 0, "{}", entry.phrase);
        }
    }

    #[test]
    fn second_pass_finds_nothing(s in sentence()) {
        let opt = optimizer(1);
        let (once, _) = opt.optimize(&s);
        let (twice, report) = opt.optimize(&once);
        prop_assert!(report.replacements.is_empty(), "{:?}", report.replacements);
        prop_assert_eq!(twice, once);
    }

    #[test]
    fn normalize_is_idempotent(s in "\\PC{0,60}") {
        let once = normalize_whitespace(&s);
        prop_assert_eq!(normalize_whitespace(&once), once.clone());
    }
}
