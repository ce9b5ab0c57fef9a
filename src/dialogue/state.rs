//! Dialogue state types

use crate::options::ChoiceOption;
use crate::stream::Metrics;
use serde::{Deserialize, Serialize};

/// One answered question, as sent back to the backend
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContextEntry {
    pub question: String,
    pub answer: String,
}

impl ContextEntry {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

/// Where to return if a request never produces a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resume {
    NotStarted,
    AwaitingAnswer,
}

/// Macro-state of the dialogue
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Phase {
    /// Nothing requested yet
    #[default]
    NotStarted,
    /// A stream is open; further input is rejected
    Streaming { resume: Resume },
    /// The turn's question is complete and waiting for an answer
    AwaitingAnswer,
    /// Metrics received; terminal
    Finalized,
}

impl From<Resume> for Phase {
    fn from(resume: Resume) -> Self {
        match resume {
            Resume::NotStarted => Phase::NotStarted,
            Resume::AwaitingAnswer => Phase::AwaitingAnswer,
        }
    }
}

/// What a submit cleared, put back if its stream never opens
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SavedTurn {
    pub turn_index: u32,
    pub current_text: String,
    pub display_text: String,
    pub options: Vec<ChoiceOption>,
}

/// Per-turn display state
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ConversationState {
    pub phase: Phase,
    /// Number of accepted submits, less any whose stream never opened
    pub turn_index: u32,
    /// Everything streamed this turn, space-joined. Becomes the question of
    /// the next context entry.
    pub current_text: String,
    /// What the caller should show: the growing text, or the stem once
    /// options have been extracted
    pub display_text: String,
    pub options: Vec<ChoiceOption>,
    /// Set by a submit until the first stream event arrives
    pub saved_turn: Option<SavedTurn>,
}

impl ConversationState {
    /// Single-flight guard
    pub fn is_streaming(&self) -> bool {
        matches!(self.phase, Phase::Streaming { .. })
    }

    pub fn is_finalized(&self) -> bool {
        self.phase == Phase::Finalized
    }

    /// The question an answer submitted now would be paired with
    pub fn prior_question(&self) -> Option<&str> {
        let text = self.current_text.trim();
        (!text.is_empty()).then_some(text)
    }

    /// Clear the turn for a new request, remembering what was there
    pub fn begin_turn(&mut self) {
        self.saved_turn = Some(SavedTurn {
            turn_index: self.turn_index,
            current_text: std::mem::take(&mut self.current_text),
            display_text: std::mem::take(&mut self.display_text),
            options: std::mem::take(&mut self.options),
        });
        self.turn_index += 1;
    }

    /// Undo [`begin_turn`](Self::begin_turn) after a request that never
    /// produced a stream
    pub fn restore_turn(&mut self) {
        if let Some(saved) = self.saved_turn.take() {
            self.turn_index = saved.turn_index;
            self.current_text = saved.current_text;
            self.display_text = saved.display_text;
            self.options = saved.options;
        }
    }

    /// Append a streamed delta
    pub fn append_text(&mut self, content: &str) {
        if self.current_text.is_empty() {
            self.current_text.push_str(content);
        } else {
            self.current_text.push(' ');
            self.current_text.push_str(content);
        }
        self.display_text.clone_from(&self.current_text);
    }

    /// Resolve an option key (case-insensitive) to its label
    pub fn option_label(&self, key: char) -> Option<&str> {
        let key = key.to_ascii_uppercase();
        self.options
            .iter()
            .find(|o| o.key == key)
            .map(|o| o.label.as_str())
    }
}

/// Everything the engine owns for one dialogue
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Session {
    pub state: ConversationState,
    /// Append-only; order is the history sent to the backend
    pub context: Vec<ContextEntry>,
    pub metrics: Option<Metrics>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }
}
