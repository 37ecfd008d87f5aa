use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::{mpsc, oneshot};
use tracing::{debug, warn};

use super::SpeechCollaborator;
use crate::error::DialogueError;
use crate::kernel::event::{Event, Recognition, TurnId};

/// What a typed line means right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputMode {
    /// No directive outstanding: a line presses the start button.
    Idle,
    /// A prompt is playing; typed lines are dropped.
    Speaking(TurnId),
    /// A line answers this listen turn.
    Listening(TurnId),
}

/// Terminal stand-in for a speech engine.
///
/// TTS is printed (or handed to an external command such as `say`), and
/// typed lines play the role of recognitions. A line typed while nothing is
/// outstanding counts as pressing the start button. A line may end in
/// `@0.42` to attach a recognition confidence.
pub struct ConsoleSpeech {
    events: mpsc::Sender<Event>,
    mode: Arc<Mutex<InputMode>>,
    no_input_timeout: Duration,
    tts_command: Option<String>,
    playback: Option<oneshot::Sender<()>>,
}

impl ConsoleSpeech {
    /// Must be called from within a tokio runtime; starts the stdin reader.
    pub fn spawn(events: mpsc::Sender<Event>, no_input_timeout: Duration, tts_command: Option<String>) -> Self {
        let mode = Arc::new(Mutex::new(InputMode::Idle));

        let reader_tx = events.clone();
        let reader_mode = Arc::clone(&mode);
        tokio::spawn(async move {
            let mut lines = BufReader::new(tokio::io::stdin()).lines();
            while let Ok(Some(line)) = lines.next_line().await {
                let Some(routed) = reader_mode.lock().ok().map(|mut mode| route_line(&mut mode, &line)) else {
                    break;
                };
                let Some(event) = routed else {
                    println!("[ASR] (still speaking, input ignored)");
                    continue;
                };
                if reader_tx.send(event).await.is_err() {
                    break;
                }
            }
            debug!("Console input closed");
        });

        Self {
            events,
            mode,
            no_input_timeout,
            tts_command,
            playback: None,
        }
    }

    fn set_mode(&self, next: InputMode) {
        if let Ok(mut mode) = self.mode.lock() {
            *mode = next;
        }
    }

    fn stop_playback(&mut self) {
        if let Some(stop_tx) = self.playback.take() {
            let _ = stop_tx.send(());
        }
    }
}

impl SpeechCollaborator for ConsoleSpeech {
    fn prepare(&mut self) -> Result<(), DialogueError> {
        println!("Press Enter to start a conversation. Ctrl+C quits.");
        self.events
            .try_send(Event::Ready)
            .map_err(|e| DialogueError::Collaborator(e.to_string()))
    }

    fn speak(&mut self, turn: TurnId, text: &str) -> Result<(), DialogueError> {
        println!("[TTS] {text}");
        self.stop_playback();
        self.set_mode(InputMode::Speaking(turn));

        let tx = self.events.clone();
        let mode = Arc::clone(&self.mode);
        let Some(command) = self.tts_command.clone() else {
            tokio::spawn(async move {
                finish_speaking(&mode, turn);
                let _ = tx.send(Event::SpeechCompleted { turn }).await;
            });
            return Ok(());
        };

        let mut child = tokio::process::Command::new(&command)
            .arg(text)
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| DialogueError::Collaborator(format!("failed to spawn '{command}': {e}")))?;

        let (stop_tx, mut stop_rx) = oneshot::channel();
        self.playback = Some(stop_tx);
        tokio::spawn(async move {
            tokio::select! {
                _ = child.wait() => {
                    finish_speaking(&mode, turn);
                    let _ = tx.send(Event::SpeechCompleted { turn }).await;
                }
                _ = &mut stop_rx => {
                    let _ = child.kill().await;
                }
            }
        });
        Ok(())
    }

    fn listen(&mut self, turn: TurnId, use_nlu: bool) -> Result<(), DialogueError> {
        if use_nlu {
            warn!("Console speech has no NLU backend; listening without it");
        }
        println!("[ASR] listening...");
        self.set_mode(InputMode::Listening(turn));

        let tx = self.events.clone();
        let mode = Arc::clone(&self.mode);
        let timeout = self.no_input_timeout;
        tokio::spawn(async move {
            tokio::time::sleep(timeout).await;
            // The reply is already on its way; hold input until it is spoken
            let expired = mode
                .lock()
                .map(|mut m| {
                    let expired = *m == InputMode::Listening(turn);
                    if expired {
                        *m = InputMode::Speaking(turn);
                    }
                    expired
                })
                .unwrap_or(false);
            if expired {
                println!("[ASR] (no input)");
                let _ = tx.send(Event::NoInput { turn }).await;
            }
        });
        Ok(())
    }

    fn cancel(&mut self) -> Result<(), DialogueError> {
        self.stop_playback();
        self.set_mode(InputMode::Idle);
        Ok(())
    }
}

// A later directive may already own the mode; only release our own turn.
fn finish_speaking(mode: &Mutex<InputMode>, turn: TurnId) {
    if let Ok(mut m) = mode.lock() {
        if *m == InputMode::Speaking(turn) {
            *m = InputMode::Idle;
        }
    }
}

/// Maps a typed line to the event it stands for in the current mode, or
/// `None` when it has to be dropped. Answering a listen turn consumes it.
pub fn route_line(mode: &mut InputMode, line: &str) -> Option<Event> {
    match *mode {
        InputMode::Idle => Some(Event::UserTrigger),
        InputMode::Speaking(_) => None,
        InputMode::Listening(turn) => {
            // The reply is spoken next; input stays closed until then
            *mode = InputMode::Speaking(turn);
            if line.trim().is_empty() {
                Some(Event::NoInput { turn })
            } else {
                Some(Event::Recognized {
                    turn,
                    recognition: parse_line(line),
                })
            }
        }
    }
}

/// `"monday @0.35"` -> utterance "monday", confidence 0.35.
pub fn parse_line(line: &str) -> Recognition {
    let line = line.trim();
    if let Some((utterance, score)) = line.rsplit_once('@') {
        if let Ok(confidence) = score.trim().parse::<f32>() {
            return Recognition::new(utterance.trim()).with_confidence(confidence);
        }
    }
    Recognition::new(line)
}
