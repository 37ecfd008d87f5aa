use thiserror::Error;

/// Infrastructure failures. Dialogue-level problems (silence, unknown words,
/// low confidence) are not errors; the machine recovers from them itself.
#[derive(Debug, Error)]
pub enum DialogueError {
    #[error("invalid configuration value for {key}: {reason}")]
    Config { key: String, reason: String },

    #[error("failed to parse lexicon: {0}")]
    Lexicon(#[from] serde_json::Error),

    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),

    #[error("speech collaborator unavailable: {0}")]
    Collaborator(String),

    #[error("event channel closed")]
    ChannelClosed,
}
