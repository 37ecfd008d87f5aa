use serde::{Deserialize, Serialize};

use crate::kernel::event::TurnId;
use crate::kernel::machine::{DialogueState, RetryCause, Stage};

// Allowed: states, stages, turn ids, counts
// Forbidden: utterances, slot values, NLU payloads

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TelemetryEvent {
    StateTransition {
        from: DialogueState,
        to: DialogueState,
    },

    SessionStarted,

    Retry {
        stage: Stage,
        cause: RetryCause,
        attempt: u32,
    },

    /// The confidence gate dropped a recognition.
    RecognitionRejected {
        stage: Option<Stage>,
    },

    HelpRequested {
        stage: Stage,
    },

    StaleEventDropped {
        turn: TurnId,
    },

    /// Trigger arrived before the engine was ready.
    TriggerIgnored,

    Interrupted,

    Outcome(SessionOutcome),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SessionOutcome {
    Completed,
    Declined,
    Abandoned,
}
