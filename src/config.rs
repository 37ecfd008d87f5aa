use std::{env, fmt::Display, path::PathBuf, str::FromStr, time::Duration};

use anyhow::Context;

use crate::error::DialogueError;
use crate::grammar::Lexicon;

const ENV_PREFIX: &str = "APPT_DM__";

#[derive(Debug, Clone, PartialEq)]
pub struct DialogueConfig {
    /// Recognitions below this score are treated as no-input.
    pub confidence_threshold: f32,
    /// NLU entities are only consulted when the NLU result reaches this score.
    pub nlu_confidence_threshold: f32,
    /// Passed through on every listen directive.
    pub use_nlu: bool,
    pub no_input_timeout_ms: u64,
    /// `None` keeps re-prompting forever.
    pub max_retries: Option<u32>,
    /// Replaces the built-in lexicon when set.
    pub lexicon_path: Option<PathBuf>,
    /// External program that speaks its first argument, e.g. `say`.
    pub tts_command: Option<String>,
}

impl Default for DialogueConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: 0.6,
            nlu_confidence_threshold: 0.6,
            use_nlu: false,
            no_input_timeout_ms: 5000,
            max_retries: None,
            lexicon_path: None,
            tts_command: None,
        }
    }
}

impl DialogueConfig {
    pub fn validate(&self) -> Result<(), DialogueError> {
        check_unit("CONFIDENCE_THRESHOLD", self.confidence_threshold)?;
        check_unit("NLU_CONFIDENCE_THRESHOLD", self.nlu_confidence_threshold)?;
        if self.no_input_timeout_ms == 0 {
            return Err(DialogueError::Config {
                key: format!("{ENV_PREFIX}NO_INPUT_TIMEOUT_MS"),
                reason: "must be greater than zero".to_string(),
            });
        }
        Ok(())
    }

    pub fn no_input_timeout(&self) -> Duration {
        Duration::from_millis(self.no_input_timeout_ms)
    }

    pub fn lexicon(&self) -> Result<Lexicon, DialogueError> {
        match &self.lexicon_path {
            Some(path) => Lexicon::load(path),
            None => Ok(Lexicon::builtin()),
        }
    }
}

fn check_unit(key: &str, value: f32) -> Result<(), DialogueError> {
    if (0.0..=1.0).contains(&value) {
        Ok(())
    } else {
        Err(DialogueError::Config {
            key: format!("{ENV_PREFIX}{key}"),
            reason: format!("{value} is outside [0, 1]"),
        })
    }
}

pub fn from_env() -> anyhow::Result<DialogueConfig> {
    from_lookup(|key| env::var(key).ok())
}

/// Builds the config from an arbitrary variable source. Unset variables keep
/// their defaults.
pub fn from_lookup<F>(lookup: F) -> anyhow::Result<DialogueConfig>
where
    F: Fn(&str) -> Option<String>,
{
    let get = |key: &str| lookup(&format!("{ENV_PREFIX}{key}"));
    let mut config = DialogueConfig::default();

    if let Some(v) = parse_opt(&get, "CONFIDENCE_THRESHOLD")? {
        config.confidence_threshold = v;
    }
    if let Some(v) = parse_opt(&get, "NLU_CONFIDENCE_THRESHOLD")? {
        config.nlu_confidence_threshold = v;
    }
    if let Some(v) = parse_opt(&get, "USE_NLU")? {
        config.use_nlu = v;
    }
    if let Some(v) = parse_opt(&get, "NO_INPUT_TIMEOUT_MS")? {
        config.no_input_timeout_ms = v;
    }
    config.max_retries = parse_opt(&get, "MAX_RETRIES")?;
    config.lexicon_path = get("LEXICON_PATH").map(PathBuf::from);
    config.tts_command = get("TTS_COMMAND").filter(|c| !c.trim().is_empty());

    config.validate().context("configuration rejected")?;
    Ok(config)
}

fn parse_opt<T, G>(get: &G, key: &str) -> anyhow::Result<Option<T>>
where
    T: FromStr,
    T::Err: Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| anyhow::anyhow!("{e}"))
            .with_context(|| format!("could not parse environment variable {ENV_PREFIX}{key}={raw:?}")),
    }
}
