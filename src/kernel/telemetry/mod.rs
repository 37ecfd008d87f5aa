//! Dialogue telemetry.
//!
//! # SAFETY INVARIANT
//! Telemetry is a READ-ONLY side-effect layer.
//! It must **NEVER** be read inside the slot machine or the gate.
//!
//! # PRIVACY INVARIANT
//! Telemetry events must **NEVER** contain user content (utterances, names,
//! collected slot values). Only states, stages, turn ids and counts.

pub mod event;
pub mod metrics;
pub mod recorder;
