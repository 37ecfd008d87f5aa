pub mod event;
pub mod gate;
pub mod machine;
pub mod reactor;
pub mod scheduler;
pub mod state;
pub mod telemetry;
