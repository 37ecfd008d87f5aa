use std::collections::VecDeque;

use serde::Serialize;

use super::event::{SessionOutcome, TelemetryEvent};
use crate::kernel::machine::RetryCause;

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TelemetrySnapshot {
    pub session_stats: SessionStats,
    pub retry_stats: RetryStats,
    pub turn_stats: TurnStats,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct SessionStats {
    pub started: u64,
    pub completed: u64,
    pub declined: u64,
    pub abandoned: u64,
    pub interrupted: u64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct RetryStats {
    pub no_input: u64,
    pub not_understood: u64,
    pub low_confidence: u64,
    pub help_requests: u64,
    pub max_attempt: u32,
    pub avg_attempt: f64,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct TurnStats {
    pub transitions: u64,
    pub stale_events: u64,
    pub ignored_triggers: u64,
}

pub fn compute_snapshot(events: &VecDeque<TelemetryEvent>) -> TelemetrySnapshot {
    let mut snap = TelemetrySnapshot::default();

    let mut attempt_sum: u64 = 0;
    let mut retry_count: u64 = 0;

    for event in events {
        match event {
            TelemetryEvent::StateTransition { .. } => snap.turn_stats.transitions += 1,
            TelemetryEvent::SessionStarted => snap.session_stats.started += 1,
            TelemetryEvent::Retry { cause, attempt, .. } => {
                match cause {
                    RetryCause::NoInput => snap.retry_stats.no_input += 1,
                    RetryCause::NotUnderstood => snap.retry_stats.not_understood += 1,
                }
                snap.retry_stats.max_attempt = snap.retry_stats.max_attempt.max(*attempt);
                attempt_sum += u64::from(*attempt);
                retry_count += 1;
            }
            TelemetryEvent::RecognitionRejected { .. } => snap.retry_stats.low_confidence += 1,
            TelemetryEvent::HelpRequested { .. } => snap.retry_stats.help_requests += 1,
            TelemetryEvent::StaleEventDropped { .. } => snap.turn_stats.stale_events += 1,
            TelemetryEvent::TriggerIgnored => snap.turn_stats.ignored_triggers += 1,
            TelemetryEvent::Interrupted => snap.session_stats.interrupted += 1,
            TelemetryEvent::Outcome(outcome) => match outcome {
                SessionOutcome::Completed => snap.session_stats.completed += 1,
                SessionOutcome::Declined => snap.session_stats.declined += 1,
                SessionOutcome::Abandoned => snap.session_stats.abandoned += 1,
            },
        }
    }

    if retry_count > 0 {
        snap.retry_stats.avg_attempt = attempt_sum as f64 / retry_count as f64;
    }

    snap
}
