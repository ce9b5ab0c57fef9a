//! Incremental decoding of the calibration event stream
//!
//! The backend answers each question request with a body of blank-line
//! separated `data:` records. This module turns the raw bytes into typed
//! [`Event`]s, one record at a time.

mod decoder;
mod utf8;
mod wire;

#[cfg(test)]
mod proptests;

pub use decoder::EventStream;
pub use wire::Metrics;

#[allow(unused_imports)] // Public API re-exports
pub use decoder::StreamDecoder;
#[allow(unused_imports)] // Public API re-exports
pub use wire::{CoachTone, EfCapacity, MetacognitionStyle, ProcessingStyle};

/// A decoded record from the calibration stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Event {
    /// A chunk of assistant text
    Text { content: String },
    /// Terminal calibration result; the dialogue is over
    MetricsFinalized { metrics: Metrics },
    /// Backend-reported problem. Informational only
    Error { detail: String },
    /// The backend closed the turn
    End,
}

impl Event {
    /// Whether decoding stops after this event
    pub fn is_terminal(&self) -> bool {
        matches!(self, Event::MetricsFinalized { .. } | Event::End)
    }
}
