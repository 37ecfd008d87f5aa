pub mod config;
pub mod error;
pub mod grammar;
pub mod kernel;
pub mod orchestrator;
pub mod speech;

// Re-export specific items for convenient access
pub use kernel::reactor::Reactor;
pub use orchestrator::Orchestrator;
