use std::sync::Arc;

use tracing::{debug, info, warn};

use super::event::{Event, TurnId};
use super::gate::ConfidenceGate;
use super::machine::{DialogueState, MachineEvent, Phase, SlotMachine};
use super::scheduler::{EntryAction, Scheduler, SideEffect};
use super::state::{SessionContext, SessionDelta};
use super::telemetry::event::{SessionOutcome, TelemetryEvent};
use super::telemetry::recorder::TelemetryRecorder;
use crate::config::DialogueConfig;
use crate::grammar::GrammarResolver;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TurnKind {
    Speak,
    Listen,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PendingTurn {
    turn: TurnId,
    kind: TurnKind,
}

/// Owns the single live dialogue: state, session context, and the one
/// outstanding speak/listen turn.
pub struct Reactor {
    pub state: DialogueState,
    pub context: SessionContext,
    pub telemetry: TelemetryRecorder,
    machine: SlotMachine,
    grammar: Arc<dyn GrammarResolver>,
    config: DialogueConfig,
    pending: Option<PendingTurn>,
    next_turn: TurnId,
}

impl Reactor {
    pub fn new(config: DialogueConfig, grammar: Arc<dyn GrammarResolver>) -> Self {
        Self {
            state: DialogueState::Prepare,
            context: SessionContext::from_config(&config),
            telemetry: TelemetryRecorder::new(),
            machine: SlotMachine::new(config.max_retries),
            grammar,
            config,
            pending: None,
            next_turn: TurnId(1),
        }
    }

    /// Kick off the engine handshake. Only meaningful before `ready`.
    pub fn boot(&self) -> Vec<SideEffect> {
        if self.state == DialogueState::Prepare {
            vec![SideEffect::Prepare]
        } else {
            Vec::new()
        }
    }

    /// The turn the reactor is currently waiting on, if any.
    pub fn pending_turn(&self) -> Option<TurnId> {
        self.pending.map(|p| p.turn)
    }

    /// Pure Step: processes exactly one notification to completion and
    /// returns the directives for the orchestrator.
    /// MUST NOT await I/O or timers.
    pub fn step(&mut self, event: Event) -> Vec<SideEffect> {
        match event {
            Event::Ready => self.drive(MachineEvent::Ready),
            Event::UserTrigger => self.on_trigger(),
            Event::SpeechCompleted { turn } => {
                if !self.claim(turn, TurnKind::Speak) {
                    return Vec::new();
                }
                self.drive(MachineEvent::SpeechCompleted)
            }
            Event::Recognized { turn, recognition } => {
                if !self.claim(turn, TurnKind::Listen) {
                    return Vec::new();
                }
                debug!(
                    session = %self.context.session_id,
                    confidence = ?recognition.confidence,
                    nlu_intent = ?recognition.nlu.as_ref().map(|n| n.top_intent.as_str()),
                    "Recognition received"
                );
                let gate = ConfidenceGate::new(self.context.confidence_threshold);
                let (accepted, deltas) = gate.process(recognition, self.state.stage());
                if !accepted {
                    debug!(session = %self.context.session_id, "Recognition below confidence threshold");
                    self.telemetry.record(TelemetryEvent::RecognitionRejected {
                        stage: self.state.stage(),
                    });
                }
                for delta in deltas {
                    self.context.reduce(delta);
                }
                self.drive(MachineEvent::ListenCompleted)
            }
            Event::NoInput { turn } => {
                if !self.claim(turn, TurnKind::Listen) {
                    return Vec::new();
                }
                self.context.reduce(SessionDelta::ClearRecognition);
                self.drive(MachineEvent::ListenCompleted)
            }
        }
    }

    fn on_trigger(&mut self) -> Vec<SideEffect> {
        let mut effects = Vec::new();

        match self.state {
            DialogueState::Prepare => {
                // Not buffered: the user has to press again once ready
                warn!("Start requested before the speech engine is ready; ignoring");
                self.telemetry.record(TelemetryEvent::TriggerIgnored);
                return effects;
            }
            s if s.in_conversation() => {
                info!(session = %self.context.session_id, state = ?s, "Conversation interrupted; restarting");
                self.telemetry.record(TelemetryEvent::Interrupted);
                self.pending = None;
                effects.push(SideEffect::Cancel);
            }
            _ => {}
        }

        // Fresh context per conversation; the old one is simply dropped
        self.context = SessionContext::from_config(&self.config);
        info!(session = %self.context.session_id, "Conversation started");
        self.telemetry.record(TelemetryEvent::SessionStarted);
        effects.extend(self.drive(MachineEvent::Start));
        effects
    }

    // Epoch check: only the outstanding turn may advance the machine.
    fn claim(&mut self, turn: TurnId, kind: TurnKind) -> bool {
        match self.pending {
            Some(p) if p.turn == turn && p.kind == kind => {
                self.pending = None;
                true
            }
            _ => {
                debug!(?turn, pending = ?self.pending, "Discarded stale speech event");
                self.telemetry.record(TelemetryEvent::StaleEventDropped { turn });
                false
            }
        }
    }

    fn drive(&mut self, event: MachineEvent) -> Vec<SideEffect> {
        let Some(step) = self.machine.advance(self.state, event, &self.context, self.grammar.as_ref()) else {
            debug!(state = ?self.state, ?event, "Event not valid in current state; ignored");
            return Vec::new();
        };

        let from = self.state;
        self.state = step.state;
        self.context = step.context;
        self.observe(from, self.state);

        match step.entry {
            Some(action) => vec![self.dispatch(action)],
            None => Vec::new(),
        }
    }

    fn dispatch(&mut self, action: EntryAction) -> SideEffect {
        let turn = self.next_turn;
        self.next_turn = turn.next();
        let kind = match action {
            EntryAction::Speak(_) => TurnKind::Speak,
            EntryAction::Listen => TurnKind::Listen,
        };
        self.pending = Some(PendingTurn { turn, kind });
        Scheduler::schedule(action, turn, self.config.use_nlu)
    }

    fn observe(&mut self, from: DialogueState, to: DialogueState) {
        debug!(session = %self.context.session_id, ?from, ?to, "Transition");
        self.telemetry.record(TelemetryEvent::StateTransition { from, to });

        match to {
            DialogueState::Collecting { stage, phase: Phase::Retry(cause) } => {
                let attempt = self.context.retries(stage);
                info!(session = %self.context.session_id, ?stage, ?cause, attempt, "Re-prompting");
                self.telemetry.record(TelemetryEvent::Retry { stage, cause, attempt });
            }
            DialogueState::Help { stage } => {
                self.telemetry.record(TelemetryEvent::HelpRequested { stage });
            }
            DialogueState::Success => {
                info!(session = %self.context.session_id, appointment = ?self.context.appointment(), "Appointment confirmed");
                self.telemetry.record(TelemetryEvent::Outcome(SessionOutcome::Completed));
            }
            DialogueState::Back => {
                info!(session = %self.context.session_id, "Appointment declined; collecting again");
                self.telemetry.record(TelemetryEvent::Outcome(SessionOutcome::Declined));
            }
            DialogueState::Abandoned => {
                warn!(session = %self.context.session_id, "Retry budget exhausted; abandoning");
                self.telemetry.record(TelemetryEvent::Outcome(SessionOutcome::Abandoned));
            }
            DialogueState::WaitToStart if from == DialogueState::Prepare => {
                info!("Speech engine ready");
            }
            _ => {}
        }
    }
}
