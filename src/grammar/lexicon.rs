use std::collections::{HashMap, HashSet};
use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::info;

use super::{normalize, Decision, GrammarResolver};
use crate::error::DialogueError;

/// Semantic tags attached to one phrase. A phrase may carry more than one tag.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct GrammarEntry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub person: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub day: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<String>,
}

impl GrammarEntry {
    pub fn person(name: &str) -> Self {
        Self { person: Some(name.to_string()), ..Self::default() }
    }

    pub fn day(day: &str) -> Self {
        Self { day: Some(day.to_string()), ..Self::default() }
    }

    pub fn time(time: &str) -> Self {
        Self { time: Some(time.to_string()), ..Self::default() }
    }
}

/// Static lexicon loaded once at startup and never mutated afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lexicon {
    #[serde(default)]
    entries: HashMap<String, GrammarEntry>,
    #[serde(default)]
    decisions: HashMap<String, Decision>,
    #[serde(default)]
    help: HashSet<String>,
}

impl Default for Lexicon {
    fn default() -> Self {
        Self::builtin()
    }
}

impl Lexicon {
    pub fn builtin() -> Self {
        let entries = [
            ("vlad", GrammarEntry::person("Vladislav Maraev")),
            ("aya", GrammarEntry::person("Nayat Astaiza Soriano")),
            ("victoria", GrammarEntry::person("Victoria Daniilidou")),
            ("g", GrammarEntry::person("Gong tianyi")),
            ("monday", GrammarEntry::day("Monday")),
            ("tuesday", GrammarEntry::day("Tuesday")),
            ("today", GrammarEntry::day("today")),
            ("tomorrow", GrammarEntry::day("tomorrow")),
            ("10", GrammarEntry::time("10:00")),
            ("11", GrammarEntry::time("11:00")),
            ("10 am", GrammarEntry::time("10:00")),
            ("10 o’clock", GrammarEntry::time("10:00")),
            ("10 o'clock", GrammarEntry::time("10:00")),
            ("11 am", GrammarEntry::time("11:00")),
            ("2 pm", GrammarEntry::time("14:00")),
            ("14", GrammarEntry::time("14:00")),
            ("16:30", GrammarEntry::time("16:30")),
        ];

        let decisions = [
            ("yes", Decision::Yes),
            ("of course", Decision::Yes),
            ("sure", Decision::Yes),
            ("absolutely", Decision::Yes),
            ("no", Decision::No),
            ("no way", Decision::No),
            ("nope", Decision::No),
            ("nah", Decision::No),
        ];

        Self {
            entries: entries.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            decisions: decisions.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
            help: ["help", "help me", "what can i say"].into_iter().map(String::from).collect(),
        }
    }

    /// Parse a lexicon from its JSON form. Keys are normalized on the way in
    /// so that hand-written files may use any casing.
    pub fn from_json_str(raw: &str) -> Result<Self, DialogueError> {
        let parsed: Lexicon = serde_json::from_str(raw)?;
        Ok(parsed.normalized())
    }

    pub fn load(path: &Path) -> Result<Self, DialogueError> {
        let raw = std::fs::read_to_string(path)?;
        let lexicon = Self::from_json_str(&raw)?;
        info!(
            path = %path.display(),
            entries = lexicon.entries.len(),
            decisions = lexicon.decisions.len(),
            "Lexicon loaded"
        );
        Ok(lexicon)
    }

    fn normalized(self) -> Self {
        Self {
            entries: self.entries.into_iter().map(|(k, v)| (normalize(&k), v)).collect(),
            decisions: self.decisions.into_iter().map(|(k, v)| (normalize(&k), v)).collect(),
            help: self.help.iter().map(|k| normalize(k)).collect(),
        }
    }

    fn entry(&self, utterance: &str) -> Option<&GrammarEntry> {
        self.entries.get(&normalize(utterance))
    }

    pub fn len(&self) -> usize {
        self.entries.len() + self.decisions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty() && self.decisions.is_empty()
    }
}

impl GrammarResolver for Lexicon {
    fn resolve_person(&self, utterance: &str) -> Option<String> {
        self.entry(utterance).and_then(|e| e.person.clone())
    }

    fn resolve_day(&self, utterance: &str) -> Option<String> {
        self.entry(utterance).and_then(|e| e.day.clone())
    }

    fn resolve_time(&self, utterance: &str) -> Option<String> {
        self.entry(utterance).and_then(|e| e.time.clone())
    }

    fn resolve_yes_no(&self, utterance: &str) -> Option<Decision> {
        self.decisions.get(&normalize(utterance)).copied()
    }

    fn is_known_utterance(&self, utterance: &str) -> bool {
        let key = normalize(utterance);
        self.entries.contains_key(&key) || self.decisions.contains_key(&key) || self.help.contains(&key)
    }

    fn is_help_request(&self, utterance: &str) -> bool {
        self.help.contains(&normalize(utterance))
    }
}
