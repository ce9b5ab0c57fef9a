//! Calibration dialogue
//!
//! A pure transition function over [`Session`] plus an engine task that
//! executes the resulting effects: opening streams, notifying the caller,
//! and pausing between deltas so partial text can be drawn.

mod effect;
mod engine;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::SessionEvent;
pub use engine::{DialogueEngine, DialogueHandle, EngineClosed, Outcome};
pub use state::{ContextEntry, ConversationState, Phase, Session};
pub use transition::TransitionError;

#[allow(unused_imports)] // Public API re-exports
pub use effect::Effect;
#[allow(unused_imports)] // Public API re-exports
pub use event::DialogueEvent;
#[allow(unused_imports)] // Public API re-exports
pub use state::{Resume, SavedTurn};
#[allow(unused_imports)] // Public API re-exports
pub use transition::{transition, TransitionResult, OPENING_PROMPT};
