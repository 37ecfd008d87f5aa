use super::event::Recognition;
use super::machine::Stage;
use super::state::SessionDelta;

/// Sits between the raw recognition event and the machine. A rejected
/// result never reaches the slot logic; it looks exactly like silence.
#[derive(Debug, Clone, Copy)]
pub struct ConfidenceGate {
    threshold: f32,
}

impl ConfidenceGate {
    pub fn new(threshold: f32) -> Self {
        Self { threshold }
    }

    /// Unscored results pass. NaN scores do not.
    pub fn accept(&self, recognition: &Recognition) -> bool {
        match recognition.confidence {
            None => true,
            Some(score) => score >= self.threshold,
        }
    }

    /// Pure function: Recognition -> Deltas to apply before the machine runs.
    /// An accepted result starts the active stage's retry count over.
    pub fn process(&self, recognition: Recognition, stage: Option<Stage>) -> (bool, Vec<SessionDelta>) {
        if !self.accept(&recognition) {
            return (false, vec![SessionDelta::ClearRecognition]);
        }
        let mut deltas = vec![SessionDelta::RecordRecognition(recognition)];
        if let Some(stage) = stage {
            deltas.push(SessionDelta::RetryCleared(stage));
        }
        (true, deltas)
    }
}
