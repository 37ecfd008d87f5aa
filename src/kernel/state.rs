use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::event::Recognition;
use super::machine::Stage;
use crate::config::DialogueConfig;

/// The appointment being assembled.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Appointment {
    pub person: Option<String>,
    pub day: Option<String>,
    pub time: Option<String>,
    pub full_day: Option<bool>,
}

impl Appointment {
    pub fn is_empty(&self) -> bool {
        self.person.is_none() && self.day.is_none() && self.time.is_none() && self.full_day.is_none()
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SlotValue {
    Person(String),
    Day(String),
    Time(String),
    FullDay(bool),
}

/// Strict session delta. This is the ONLY way the session context mutates.
#[derive(Debug, Clone, PartialEq)]
pub enum SessionDelta {
    Apply(SlotValue),
    RecordRecognition(Recognition),
    ClearRecognition,
    RetryFailed(Stage),
    RetryCleared(Stage),
    /// Stage to resume after a detour.
    Remember(Stage),
    Reset,
}

#[derive(Debug, Clone, PartialEq)]
pub struct SessionContext {
    pub session_id: Uuid,
    appointment: Appointment,
    last_recognition: Option<Recognition>,
    retries: HashMap<Stage, u32>,
    history: Option<Stage>,
    pub confidence_threshold: f32,
    pub nlu_confidence_threshold: f32,
    // Monotonic; bumped by every reduction that changes something
    pub version: u64,
}

impl SessionContext {
    pub fn new(confidence_threshold: f32, nlu_confidence_threshold: f32) -> Self {
        Self {
            session_id: Uuid::new_v4(),
            appointment: Appointment::default(),
            last_recognition: None,
            retries: HashMap::new(),
            history: None,
            confidence_threshold,
            nlu_confidence_threshold,
            version: 0,
        }
    }

    pub fn from_config(config: &DialogueConfig) -> Self {
        Self::new(config.confidence_threshold, config.nlu_confidence_threshold)
    }

    pub fn appointment(&self) -> &Appointment {
        &self.appointment
    }

    pub fn last_recognition(&self) -> Option<&Recognition> {
        self.last_recognition.as_ref()
    }

    pub fn retries(&self, stage: Stage) -> u32 {
        self.retries.get(&stage).copied().unwrap_or(0)
    }

    pub fn history(&self) -> Option<Stage> {
        self.history
    }

    /// Sets exactly one slot. Re-applying the value a slot already holds is a no-op.
    pub fn apply(&mut self, value: SlotValue) {
        self.reduce(SessionDelta::Apply(value));
    }

    /// Drops everything collected so far. Thresholds and the session id survive.
    pub fn reset(&mut self) {
        self.reduce(SessionDelta::Reset);
    }

    /// Pure reduction: Context + Delta -> Mutated Context
    pub fn reduce(&mut self, delta: SessionDelta) {
        match delta {
            SessionDelta::Apply(value) => {
                if !self.set_slot(value) {
                    return;
                }
            }
            SessionDelta::RecordRecognition(recognition) => {
                self.last_recognition = Some(recognition);
            }
            SessionDelta::ClearRecognition => {
                self.last_recognition = None;
            }
            SessionDelta::RetryFailed(stage) => {
                *self.retries.entry(stage).or_insert(0) += 1;
            }
            SessionDelta::RetryCleared(stage) => {
                self.retries.remove(&stage);
            }
            SessionDelta::Remember(stage) => {
                self.history = Some(stage);
            }
            SessionDelta::Reset => {
                self.appointment = Appointment::default();
                self.last_recognition = None;
                self.retries.clear();
                self.history = None;
            }
        }
        self.version += 1;
    }

    // Returns false when the slot already held this value.
    fn set_slot(&mut self, value: SlotValue) -> bool {
        let a = &mut self.appointment;
        match value {
            SlotValue::Person(p) => replace_if_changed(&mut a.person, p),
            SlotValue::Day(d) => replace_if_changed(&mut a.day, d),
            SlotValue::Time(t) => replace_if_changed(&mut a.time, t),
            SlotValue::FullDay(f) => replace_if_changed(&mut a.full_day, f),
        }
    }
}

fn replace_if_changed<T: PartialEq>(slot: &mut Option<T>, value: T) -> bool {
    if slot.as_ref() == Some(&value) {
        return false;
    }
    *slot = Some(value);
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reapplying_a_slot_does_not_bump_version() {
        let mut ctx = SessionContext::new(0.6, 0.6);
        ctx.apply(SlotValue::Day("Monday".into()));
        let once = ctx.clone();
        ctx.apply(SlotValue::Day("Monday".into()));
        assert_eq!(ctx, once);
    }

    #[test]
    fn reset_keeps_thresholds_and_session() {
        let mut ctx = SessionContext::new(0.4, 0.7);
        let id = ctx.session_id;
        ctx.apply(SlotValue::Person("Gong tianyi".into()));
        ctx.reduce(SessionDelta::RetryFailed(Stage::Day));
        ctx.reduce(SessionDelta::Remember(Stage::Day));
        ctx.reset();
        assert!(ctx.appointment().is_empty());
        assert_eq!(ctx.retries(Stage::Day), 0);
        assert_eq!(ctx.history(), None);
        assert_eq!(ctx.session_id, id);
        assert_eq!(ctx.confidence_threshold, 0.4);
    }
}
