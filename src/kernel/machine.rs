use serde::{Deserialize, Serialize};

use super::event::Recognition;
use super::scheduler::{EntryAction, Scheduler};
use super::state::{SessionContext, SessionDelta, SlotValue};
use crate::grammar::{Decision, GrammarResolver};

/// One node of the slot-filling pipeline. Every stage runs the same
/// Prompt -> Listening -> Retry sub-machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Stage {
    Person,
    Day,
    /// Yes/no: does the meeting take the whole day?
    FullDay,
    /// Skipped when FullDay was answered with yes.
    Time,
    Confirm,
}

impl Stage {
    /// NLU entity category that can fill this stage.
    pub fn entity_category(self) -> &'static str {
        match self {
            Stage::Person => "person",
            Stage::Day => "day",
            Stage::Time => "time",
            Stage::FullDay | Stage::Confirm => "decision",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum RetryCause {
    /// Nothing heard, or the confidence gate threw the result away.
    NoInput,
    /// Heard, but it does not resolve to what the stage expects.
    NotUnderstood,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Phase {
    Prompt,
    Listening,
    Retry(RetryCause),
}

/// The dialogue's single active state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DialogueState {
    /// Waiting for the speech engine to finish its handshake.
    Prepare,
    /// Idle. Only a user trigger moves on from here.
    WaitToStart,
    Greeting,
    Collecting { stage: Stage, phase: Phase },
    /// Speaking a hint; resumes the remembered stage afterwards.
    Help { stage: Stage },
    /// Declined at confirmation. Slots are already cleared.
    Back,
    /// Announcing the created appointment.
    Success,
    /// Parked until the next trigger.
    Completed,
    /// Retry budget exhausted.
    Abandoned,
}

impl Default for DialogueState {
    fn default() -> Self {
        Self::Prepare
    }
}

impl DialogueState {
    pub fn collecting(stage: Stage, phase: Phase) -> Self {
        DialogueState::Collecting { stage, phase }
    }

    pub fn stage(&self) -> Option<Stage> {
        match self {
            DialogueState::Collecting { stage, .. } | DialogueState::Help { stage } => Some(*stage),
            _ => None,
        }
    }

    /// True while a conversation is running, i.e. a trigger would interrupt it.
    pub fn in_conversation(&self) -> bool {
        !matches!(self, DialogueState::Prepare | DialogueState::WaitToStart | DialogueState::Completed)
    }
}

/// Events the machine understands, after the reactor has filtered and
/// normalized the raw collaborator notifications.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MachineEvent {
    Ready,
    Start,
    SpeechCompleted,
    /// Listening ended; the outcome is whatever `last_recognition` holds.
    ListenCompleted,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Transition {
    pub next: DialogueState,
    pub deltas: Vec<SessionDelta>,
}

impl Transition {
    fn to(next: DialogueState) -> Self {
        Self { next, deltas: Vec::new() }
    }

    fn with(next: DialogueState, deltas: Vec<SessionDelta>) -> Self {
        Self { next, deltas }
    }
}

/// Outcome of a full step: new state, new context, and the entry action of
/// the new state for the orchestrator to perform.
#[derive(Debug, Clone, PartialEq)]
pub struct Step {
    pub state: DialogueState,
    pub context: SessionContext,
    pub entry: Option<EntryAction>,
}

/// What an utterance means for the active stage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interpretation {
    Value(SlotValue),
    Decision(Decision),
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SlotMachine {
    max_retries: Option<u32>,
}

impl SlotMachine {
    pub fn new(max_retries: Option<u32>) -> Self {
        Self { max_retries }
    }

    /// Pure function: (State, Event, Context) -> (State, Context, Entry)
    /// Returns None if the event is not valid in the current state.
    pub fn advance(
        &self,
        state: DialogueState,
        event: MachineEvent,
        ctx: &SessionContext,
        grammar: &dyn GrammarResolver,
    ) -> Option<Step> {
        let transition = self.transition(state, event, ctx, grammar)?;
        let mut context = ctx.clone();
        for delta in transition.deltas {
            context.reduce(delta);
        }
        let entry = Scheduler::entry(&transition.next, &context);
        Some(Step {
            state: transition.next,
            context,
            entry,
        })
    }

    pub fn transition(
        &self,
        state: DialogueState,
        event: MachineEvent,
        ctx: &SessionContext,
        grammar: &dyn GrammarResolver,
    ) -> Option<Transition> {
        use DialogueState::*;
        use MachineEvent::*;

        match (state, event) {
            (Prepare, Ready) => Some(Transition::to(WaitToStart)),
            // Never started before the engine is ready
            (Prepare, Start) => None,
            // From idle this starts a conversation, from anywhere else it restarts one
            (_, Start) => Some(Transition::with(Greeting, vec![SessionDelta::Reset])),

            (Greeting, SpeechCompleted) => Some(Transition::to(Collecting {
                stage: Stage::Person,
                phase: Phase::Prompt,
            })),

            (Collecting { stage, phase: Phase::Prompt }, SpeechCompleted) => Some(Transition::to(Collecting {
                stage,
                phase: Phase::Listening,
            })),
            (Collecting { stage, phase: Phase::Retry(_) }, SpeechCompleted) => Some(Transition::to(Collecting {
                stage,
                phase: Phase::Prompt,
            })),
            (Collecting { stage, phase: Phase::Listening }, ListenCompleted) => {
                Some(self.on_listen_completed(stage, ctx, grammar))
            }

            (Help { stage }, SpeechCompleted) => Some(Transition::to(Collecting {
                stage: ctx.history().unwrap_or(stage),
                phase: Phase::Prompt,
            })),
            (Back, SpeechCompleted) => Some(Transition::to(Collecting {
                stage: Stage::Person,
                phase: Phase::Prompt,
            })),
            (Success, SpeechCompleted) => Some(Transition::to(Completed)),
            (Abandoned, SpeechCompleted) => Some(Transition::to(WaitToStart)),

            _ => None,
        }
    }

    fn on_listen_completed(&self, stage: Stage, ctx: &SessionContext, grammar: &dyn GrammarResolver) -> Transition {
        let Some(recognition) = ctx.last_recognition() else {
            return self.retry(stage, RetryCause::NoInput, ctx);
        };

        if grammar.is_help_request(&recognition.utterance) {
            return Transition::with(
                DialogueState::Help { stage },
                vec![SessionDelta::ClearRecognition, SessionDelta::Remember(stage)],
            );
        }

        let Some(meaning) = interpret(stage, recognition, ctx.nlu_confidence_threshold, grammar) else {
            return self.retry(stage, RetryCause::NotUnderstood, ctx);
        };

        let mut deltas = vec![SessionDelta::ClearRecognition, SessionDelta::RetryCleared(stage)];
        let next = match meaning {
            Interpretation::Value(value) => {
                let next = next_stage(&value);
                deltas.push(SessionDelta::Apply(value));
                DialogueState::collecting(next, Phase::Prompt)
            }
            Interpretation::Decision(Decision::Yes) => DialogueState::Success,
            Interpretation::Decision(Decision::No) => {
                deltas.push(SessionDelta::Reset);
                DialogueState::Back
            }
        };
        Transition::with(next, deltas)
    }

    fn retry(&self, stage: Stage, cause: RetryCause, ctx: &SessionContext) -> Transition {
        let attempt = ctx.retries(stage) + 1;
        if matches!(self.max_retries, Some(max) if attempt > max) {
            return Transition::with(DialogueState::Abandoned, vec![SessionDelta::Reset]);
        }
        Transition::with(
            DialogueState::collecting(stage, Phase::Retry(cause)),
            vec![SessionDelta::ClearRecognition, SessionDelta::RetryFailed(stage)],
        )
    }
}

fn next_stage(value: &SlotValue) -> Stage {
    match value {
        SlotValue::Person(_) => Stage::Day,
        SlotValue::Day(_) => Stage::FullDay,
        SlotValue::FullDay(true) => Stage::Confirm,
        SlotValue::FullDay(false) => Stage::Time,
        SlotValue::Time(_) => Stage::Confirm,
    }
}

/// Only the resolver for the stage's own type is consulted, so an utterance
/// that is both a day and a decision word can never be misfiled.
pub fn interpret_text(stage: Stage, text: &str, grammar: &dyn GrammarResolver) -> Option<Interpretation> {
    match stage {
        Stage::Person => grammar.resolve_person(text).map(|p| Interpretation::Value(SlotValue::Person(p))),
        Stage::Day => grammar.resolve_day(text).map(|d| Interpretation::Value(SlotValue::Day(d))),
        Stage::Time => grammar.resolve_time(text).map(|t| Interpretation::Value(SlotValue::Time(t))),
        Stage::FullDay => grammar
            .resolve_yes_no(text)
            .map(|d| Interpretation::Value(SlotValue::FullDay(d == Decision::Yes))),
        Stage::Confirm => grammar.resolve_yes_no(text).map(Interpretation::Decision),
    }
}

/// Grammar lookup on the raw utterance first. NLU entities are a fallback,
/// used only when the NLU result clears its own threshold, and are resolved
/// through the same grammar.
pub fn interpret(
    stage: Stage,
    recognition: &Recognition,
    nlu_threshold: f32,
    grammar: &dyn GrammarResolver,
) -> Option<Interpretation> {
    interpret_text(stage, &recognition.utterance, grammar).or_else(|| {
        let nlu = recognition.nlu.as_ref().filter(|n| n.confidence >= nlu_threshold)?;
        nlu.entities_for(stage.entity_category())
            .find_map(|text| interpret_text(stage, text, grammar))
    })
}
