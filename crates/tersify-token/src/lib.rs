//! # Tersify Token
//!
//! Token counting and token-aware phrase replacement.
//!
//! Counts tokens with tiktoken-rs encodings and replaces verbose phrases
//! only where the active tokenizer confirms the shorter form is cheaper.

pub mod candidates;
pub mod error;
pub mod optimizer;
pub mod reporter;
pub mod text;
pub mod tokenizer;

pub use candidates::{CandidateCategory, CandidateTable, ReplacementCandidate};
pub use error::{TokenError, TokenResult};
pub use optimizer::{EfficientReplacement, TokenAwareOptimizer};
pub use reporter::{AppliedReplacement, OptimizationReport, Opportunity};
pub use tokenizer::{load_counter, BpeTokenizer, TokenCount, TokenCounter, WordTokenCounter};
