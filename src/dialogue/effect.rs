//! Effects produced by dialogue transitions

use crate::backend::QuestionRequest;
use crate::options::ChoiceOption;
use crate::stream::Metrics;

/// Notifications surfaced to whoever renders the dialogue
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionEvent {
    /// A request went out for a new turn
    TurnStarted { turn_index: u32 },
    /// The turn's text grew; `text` is the full text so far
    TextUpdated { text: String },
    /// The turn ended with selectable options
    OptionsReady {
        stem: String,
        options: Vec<ChoiceOption>,
    },
    /// The turn ended with free text only
    TurnComplete { text: String },
    /// Calibration finished; the profile is being synthesized
    Synthesizing { metrics: Metrics },
    /// The request for this turn could not be delivered
    Failure { message: String },
}

/// Effects to be executed after a state transition
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Effect {
    /// Open a stream for the next question
    RequestStream { request: QuestionRequest },
    /// Tell the caller something changed
    Notify(SessionEvent),
    /// Give the renderer a chance to draw the latest delta
    PauseForRender,
}

impl Effect {
    pub fn notify(event: SessionEvent) -> Self {
        Effect::Notify(event)
    }
}
