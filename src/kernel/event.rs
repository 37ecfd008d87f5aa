use serde::{Deserialize, Serialize};

/// Identifies one outstanding speak or listen directive. The speech
/// collaborator echoes it back so late notifications can be told apart from
/// current ones.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct TurnId(pub u64);

impl TurnId {
    pub fn next(self) -> Self {
        TurnId(self.0 + 1)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    pub category: String,
    pub text: String,
}

/// Structured output of the NLU collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NluResult {
    pub top_intent: String,
    pub confidence: f32,
    #[serde(default)]
    pub entities: Vec<Entity>,
}

impl NluResult {
    pub fn entities_for<'a>(&'a self, category: &'a str) -> impl Iterator<Item = &'a str> + 'a {
        self.entities
            .iter()
            .filter(move |e| e.category.eq_ignore_ascii_case(category))
            .map(|e| e.text.as_str())
    }
}

/// One recognition pass as reported by the speech collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Recognition {
    pub utterance: String,
    /// Absent when the engine does not score its hypotheses.
    #[serde(default)]
    pub confidence: Option<f32>,
    #[serde(default)]
    pub nlu: Option<NluResult>,
}

impl Recognition {
    pub fn new(utterance: &str) -> Self {
        Self {
            utterance: utterance.to_string(),
            confidence: None,
            nlu: None,
        }
    }

    pub fn with_confidence(mut self, confidence: f32) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_nlu(mut self, nlu: NluResult) -> Self {
        self.nlu = Some(nlu);
        self
    }
}

/// Everything that can reach the dialogue from the outside.
#[derive(Debug, Clone, PartialEq)]
pub enum Event {
    /// Speech engine finished its PREPARE handshake.
    Ready,
    SpeechCompleted { turn: TurnId },
    Recognized { turn: TurnId, recognition: Recognition },
    NoInput { turn: TurnId },
    /// The start button.
    UserTrigger,
}

impl Event {
    pub fn turn(&self) -> Option<TurnId> {
        match self {
            Event::SpeechCompleted { turn } | Event::Recognized { turn, .. } | Event::NoInput { turn } => Some(*turn),
            Event::Ready | Event::UserTrigger => None,
        }
    }

    pub fn recognized(turn: TurnId, utterance: &str) -> Self {
        Event::Recognized {
            turn,
            recognition: Recognition::new(utterance),
        }
    }
}
