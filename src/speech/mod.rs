//! Speech collaborators: the only part of the system allowed to do real I/O.
//!
//! Every method returns immediately. Outcomes (ready, speech completed,
//! recognized, no-input) are reported later as [`Event`]s on the channel the
//! collaborator was built with, echoing the directive's [`TurnId`].
//!
//! [`Event`]: crate::kernel::event::Event

pub mod console;
pub mod scripted;

use crate::error::DialogueError;
use crate::kernel::event::TurnId;

pub use console::ConsoleSpeech;
pub use scripted::{ScriptLine, ScriptedSpeech};

pub trait SpeechCollaborator {
    /// Start the engine; answer with `Event::Ready` once usable.
    fn prepare(&mut self) -> Result<(), DialogueError>;

    fn speak(&mut self, turn: TurnId, text: &str) -> Result<(), DialogueError>;

    fn listen(&mut self, turn: TurnId, use_nlu: bool) -> Result<(), DialogueError>;

    /// Drop any in-flight speak or listen. Late reports for it are harmless.
    fn cancel(&mut self) -> Result<(), DialogueError>;
}
