use tokio::sync::{mpsc, watch};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::error::DialogueError;
use crate::kernel::event::Event;
use crate::kernel::machine::DialogueState;
use crate::kernel::reactor::Reactor;
use crate::kernel::scheduler::SideEffect;
use crate::speech::SpeechCollaborator;

/// Turn driver: feeds collaborator notifications into the reactor one at a
/// time and carries out the directives it returns.
pub struct Orchestrator<S: SpeechCollaborator> {
    reactor: Reactor,
    speech: S,
    events: mpsc::Receiver<Event>,
    shutdown: CancellationToken,
    state_tx: watch::Sender<DialogueState>,
}

impl<S: SpeechCollaborator> Orchestrator<S> {
    pub fn new(reactor: Reactor, speech: S, events: mpsc::Receiver<Event>, shutdown: CancellationToken) -> Self {
        let (state_tx, _) = watch::channel(reactor.state);
        Self {
            reactor,
            speech,
            events,
            shutdown,
            state_tx,
        }
    }

    /// Observe the current dialogue state. Intermediate states may be skipped
    /// by a slow reader; only the latest one is kept.
    pub fn subscribe(&self) -> watch::Receiver<DialogueState> {
        self.state_tx.subscribe()
    }

    /// Runs until the shutdown token fires. Hands the reactor back so callers
    /// can inspect the final state and telemetry.
    pub async fn run(mut self) -> Result<Reactor, DialogueError> {
        let boot = self.reactor.boot();
        self.execute(boot)?;

        loop {
            tokio::select! {
                _ = self.shutdown.cancelled() => {
                    info!("Shutdown requested");
                    break;
                }
                event = self.events.recv() => {
                    let Some(event) = event else {
                        return Err(DialogueError::ChannelClosed);
                    };
                    debug!(?event, "Event");
                    let effects = self.reactor.step(event);
                    self.state_tx.send_replace(self.reactor.state);
                    self.execute(effects)?;
                }
            }
        }

        if let Err(e) = self.speech.cancel() {
            warn!("Failed to cancel speech on shutdown: {}", e);
        }
        Ok(self.reactor)
    }

    fn execute(&mut self, effects: Vec<SideEffect>) -> Result<(), DialogueError> {
        for effect in effects {
            match effect {
                SideEffect::Prepare => self.speech.prepare()?,
                SideEffect::Speak { turn, text } => self.speech.speak(turn, &text)?,
                SideEffect::Listen { turn, nlu } => self.speech.listen(turn, nlu)?,
                SideEffect::Cancel => self.speech.cancel()?,
            }
        }
        Ok(())
    }
}
