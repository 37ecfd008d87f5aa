use super::event::TurnId;
use super::machine::{DialogueState, Phase, RetryCause, Stage};
use super::state::{Appointment, SessionContext};

pub const GREETING: &str = "Let's create an appointment.";
pub const ASK_PERSON: &str = "Who are you meeting with?";
pub const ASK_DAY: &str = "On which day is your meeting?";
pub const ASK_FULL_DAY: &str = "Will it take the whole day?";
pub const ASK_TIME: &str = "What time is your meeting?";
pub const NOT_UNDERSTOOD: &str = "I can't hear you.";
pub const NO_INPUT: &str = "I did not hear you.";
pub const CREATED: &str = "Your appointment has been created!";
pub const START_OVER: &str = "Okay, let's start over.";
pub const ABANDONED: &str = "Let's try again later.";

/// What a state does when it is entered. The machine only describes it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EntryAction {
    Speak(String),
    Listen,
}

/// Directives for the speech collaborator, executed by the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SideEffect {
    Prepare,
    Speak { turn: TurnId, text: String },
    Listen { turn: TurnId, nlu: bool },
    /// Abandon whatever speak/listen is in flight.
    Cancel,
}

pub struct Scheduler;

impl Scheduler {
    /// Pure Projection: State + Context -> EntryAction
    pub fn entry(state: &DialogueState, ctx: &SessionContext) -> Option<EntryAction> {
        match state {
            DialogueState::Prepare | DialogueState::WaitToStart | DialogueState::Completed => None,
            DialogueState::Greeting => Some(EntryAction::Speak(GREETING.to_string())),
            DialogueState::Collecting { stage, phase } => match phase {
                Phase::Prompt => Some(EntryAction::Speak(Self::question(*stage, ctx.appointment()))),
                Phase::Listening => Some(EntryAction::Listen),
                Phase::Retry(cause) => Some(EntryAction::Speak(Self::apology(*cause).to_string())),
            },
            DialogueState::Help { stage } => Some(EntryAction::Speak(Self::hint(*stage).to_string())),
            DialogueState::Back => Some(EntryAction::Speak(START_OVER.to_string())),
            DialogueState::Success => Some(EntryAction::Speak(CREATED.to_string())),
            DialogueState::Abandoned => Some(EntryAction::Speak(ABANDONED.to_string())),
        }
    }

    pub fn schedule(action: EntryAction, turn: TurnId, use_nlu: bool) -> SideEffect {
        match action {
            EntryAction::Speak(text) => SideEffect::Speak { turn, text },
            EntryAction::Listen => SideEffect::Listen { turn, nlu: use_nlu },
        }
    }

    pub fn question(stage: Stage, appointment: &Appointment) -> String {
        match stage {
            Stage::Person => ASK_PERSON.to_string(),
            Stage::Day => ASK_DAY.to_string(),
            Stage::FullDay => ASK_FULL_DAY.to_string(),
            Stage::Time => ASK_TIME.to_string(),
            Stage::Confirm => Self::confirmation(appointment),
        }
    }

    /// Time is left out entirely for a full-day meeting.
    pub fn confirmation(appointment: &Appointment) -> String {
        let person = appointment.person.as_deref().unwrap_or("someone");
        let day = appointment.day.as_deref().unwrap_or("an unknown day");
        if appointment.full_day == Some(true) {
            format!("Do you want me to create an appointment with {person} on {day} for the whole day?")
        } else {
            let time = appointment.time.as_deref().unwrap_or("an unknown time");
            format!("Do you want me to create an appointment with {person} on {day} at {time}?")
        }
    }

    pub fn apology(cause: RetryCause) -> &'static str {
        match cause {
            RetryCause::NotUnderstood => NOT_UNDERSTOOD,
            RetryCause::NoInput => NO_INPUT,
        }
    }

    pub fn hint(stage: Stage) -> &'static str {
        match stage {
            Stage::Person => "Tell me a name, for example Vlad or Aya.",
            Stage::Day => "Tell me a day, for example Monday or tomorrow.",
            Stage::FullDay | Stage::Confirm => "Please answer yes or no.",
            Stage::Time => "Tell me a time, for example 10 am or 2 pm.",
        }
    }
}
