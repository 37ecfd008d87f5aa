use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

use tokio::sync::mpsc;
use tracing::debug;

use super::SpeechCollaborator;
use crate::error::DialogueError;
use crate::kernel::event::{Event, Recognition, TurnId};

/// One scripted answer to a listen directive.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptLine {
    Say(Recognition),
    Silence,
}

impl ScriptLine {
    pub fn say(utterance: &str) -> Self {
        ScriptLine::Say(Recognition::new(utterance))
    }
}

/// Everything the system said, in order.
pub type Transcript = Arc<Mutex<Vec<String>>>;

/// Deterministic collaborator: speaking completes instantly and every listen
/// consumes the next script line. An exhausted script behaves like silence.
pub struct ScriptedSpeech {
    events: mpsc::Sender<Event>,
    script: VecDeque<ScriptLine>,
    transcript: Transcript,
}

impl ScriptedSpeech {
    pub fn new(events: mpsc::Sender<Event>, script: impl IntoIterator<Item = ScriptLine>) -> Self {
        Self {
            events,
            script: script.into_iter().collect(),
            transcript: Arc::new(Mutex::new(Vec::new())),
        }
    }

    pub fn transcript(&self) -> Transcript {
        Arc::clone(&self.transcript)
    }

    pub fn remaining(&self) -> usize {
        self.script.len()
    }

    fn report(&self, event: Event) -> Result<(), DialogueError> {
        self.events
            .try_send(event)
            .map_err(|e| DialogueError::Collaborator(e.to_string()))
    }
}

impl SpeechCollaborator for ScriptedSpeech {
    fn prepare(&mut self) -> Result<(), DialogueError> {
        self.report(Event::Ready)
    }

    fn speak(&mut self, turn: TurnId, text: &str) -> Result<(), DialogueError> {
        debug!(?turn, text, "Scripted TTS");
        if let Ok(mut spoken) = self.transcript.lock() {
            spoken.push(text.to_string());
        }
        self.report(Event::SpeechCompleted { turn })
    }

    fn listen(&mut self, turn: TurnId, _use_nlu: bool) -> Result<(), DialogueError> {
        match self.script.pop_front() {
            Some(ScriptLine::Say(recognition)) => {
                debug!(?turn, utterance = %recognition.utterance, "Scripted ASR");
                self.report(Event::Recognized { turn, recognition })
            }
            Some(ScriptLine::Silence) | None => self.report(Event::NoInput { turn }),
        }
    }

    fn cancel(&mut self) -> Result<(), DialogueError> {
        // Nothing is ever in flight
        Ok(())
    }
}
