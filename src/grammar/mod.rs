//! Grammar resolution: maps a recognized utterance to the semantic value a
//! slot expects.
//!
//! Lookups are exact-match on the normalized utterance (trimmed, lowercase).
//! There is no fuzzy or partial matching, and unknown input is never an error.

pub mod lexicon;

use serde::{Deserialize, Serialize};

pub use lexicon::{GrammarEntry, Lexicon};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Decision {
    Yes,
    No,
}

/// Pluggable word -> meaning lookup used by the slot machine.
///
/// Each resolver is queried independently; the machine decides which one
/// applies to the active stage, so implementations never have to break ties
/// between slot types.
pub trait GrammarResolver: Send + Sync {
    fn resolve_person(&self, utterance: &str) -> Option<String>;
    fn resolve_day(&self, utterance: &str) -> Option<String>;
    fn resolve_time(&self, utterance: &str) -> Option<String>;
    fn resolve_yes_no(&self, utterance: &str) -> Option<Decision>;
    fn is_known_utterance(&self, utterance: &str) -> bool;

    /// Phrases that ask for a hint instead of answering the question.
    fn is_help_request(&self, _utterance: &str) -> bool {
        false
    }
}

/// Canonical lookup key for an utterance.
pub fn normalize(utterance: &str) -> String {
    utterance.trim().to_lowercase()
}
