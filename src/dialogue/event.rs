//! Inputs that drive dialogue transitions

use crate::stream::Event as StreamEvent;

/// Events that trigger state transitions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DialogueEvent {
    // Caller events
    Start,
    Submit { answer: String },

    // Stream events
    Stream(StreamEvent),
    /// The decoder ran out of input or hit a terminal record
    StreamClosed { finalized: bool },
    /// No stream could be opened
    TransportFailed { message: String },
}

impl DialogueEvent {
    pub fn submit(answer: impl Into<String>) -> Self {
        DialogueEvent::Submit {
            answer: answer.into(),
        }
    }

    #[cfg(test)]
    pub fn text(content: impl Into<String>) -> Self {
        DialogueEvent::Stream(StreamEvent::Text {
            content: content.into(),
        })
    }

    /// Whether this event came from the caller rather than the backend
    #[cfg(test)]
    pub fn is_caller_event(&self) -> bool {
        matches!(self, DialogueEvent::Start | DialogueEvent::Submit { .. })
    }
}
