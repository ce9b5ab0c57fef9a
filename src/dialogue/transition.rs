//! Pure state transition function
//!
//! Given the same session and event this always produces the same result;
//! all I/O is described by the returned effects.

use super::effect::{Effect, SessionEvent};
use super::event::DialogueEvent;
use super::state::{ContextEntry, Phase, Resume, Session};
use crate::backend::QuestionRequest;
use crate::options::extract;
use crate::stream::Event as StreamEvent;
use thiserror::Error;

/// Synthetic prompt that opens the dialogue
pub const OPENING_PROMPT: &str = "START";

/// Result of a state transition
#[derive(Debug)]
pub struct TransitionResult {
    pub new_session: Session,
    pub effects: Vec<Effect>,
}

impl TransitionResult {
    pub fn new(session: Session) -> Self {
        Self {
            new_session: session,
            effects: vec![],
        }
    }

    pub fn with_effect(mut self, effect: Effect) -> Self {
        self.effects.push(effect);
        self
    }

    /// No change at all
    fn unchanged(session: &Session) -> Self {
        Self::new(session.clone())
    }
}

/// Reasons an event is rejected. Caller-facing rejections are no-ops, not
/// failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TransitionError {
    #[error("A response is still streaming")]
    Busy,
    #[error("Calibration is already finalized")]
    Finalized,
    #[error("Answer is empty")]
    EmptyAnswer,
    #[error("Dialogue already started")]
    AlreadyStarted,
    #[error("Invalid transition: {0}")]
    InvalidTransition(String),
}

/// Pure transition function
pub fn transition(
    session: &Session,
    event: DialogueEvent,
) -> Result<TransitionResult, TransitionError> {
    let state = &session.state;

    match (state.phase, event) {
        // ============================================================
        // Caller events
        // ============================================================
        (Phase::NotStarted, DialogueEvent::Start) => {
            let mut next = session.clone();
            next.state.phase = Phase::Streaming {
                resume: Resume::NotStarted,
            };
            Ok(TransitionResult::new(next).with_effect(Effect::RequestStream {
                request: QuestionRequest {
                    input: OPENING_PROMPT.to_string(),
                    context: Vec::new(),
                },
            }))
        }

        (Phase::Streaming { .. }, DialogueEvent::Start | DialogueEvent::Submit { .. }) => {
            Err(TransitionError::Busy)
        }

        (Phase::Finalized, DialogueEvent::Start | DialogueEvent::Submit { .. }) => {
            Err(TransitionError::Finalized)
        }

        (_, DialogueEvent::Start) => Err(TransitionError::AlreadyStarted),

        (phase @ (Phase::NotStarted | Phase::AwaitingAnswer), DialogueEvent::Submit { answer }) => {
            let answer = answer.trim();
            if answer.is_empty() {
                return Err(TransitionError::EmptyAnswer);
            }

            let mut next = session.clone();
            if let Some(question) = state.prior_question() {
                next.context.push(ContextEntry::new(question, answer));
            }
            next.state.begin_turn();
            next.state.phase = Phase::Streaming {
                resume: if phase == Phase::NotStarted {
                    Resume::NotStarted
                } else {
                    Resume::AwaitingAnswer
                },
            };

            let request = QuestionRequest {
                input: answer.to_string(),
                context: next.context.clone(),
            };
            let turn_index = next.state.turn_index;

            Ok(TransitionResult::new(next)
                .with_effect(Effect::RequestStream { request })
                .with_effect(Effect::notify(SessionEvent::TurnStarted { turn_index })))
        }

        // ============================================================
        // Stream events
        // ============================================================
        (Phase::Streaming { .. }, DialogueEvent::Stream(StreamEvent::Text { content })) => {
            let mut next = opened(session);
            next.state.append_text(&content);
            let text = next.state.current_text.clone();
            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify(SessionEvent::TextUpdated { text }))
                .with_effect(Effect::PauseForRender))
        }

        (Phase::Streaming { .. }, DialogueEvent::Stream(StreamEvent::MetricsFinalized { metrics })) => {
            let mut next = opened(session);
            next.metrics = Some(metrics);
            next.state.phase = Phase::Finalized;
            next.state.options.clear();
            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify(SessionEvent::Synthesizing { metrics })))
        }

        // Backend-reported errors and end markers carry no state
        (
            Phase::Streaming { .. },
            DialogueEvent::Stream(StreamEvent::Error { .. } | StreamEvent::End),
        ) => Ok(TransitionResult::new(opened(session))),

        (Phase::Streaming { .. }, DialogueEvent::StreamClosed { .. }) => {
            let mut next = opened(session);
            next.state.phase = Phase::AwaitingAnswer;

            let extracted = extract(&next.state.current_text);
            if extracted.options.is_empty() {
                let text = next.state.display_text.clone();
                Ok(TransitionResult::new(next)
                    .with_effect(Effect::notify(SessionEvent::TurnComplete { text })))
            } else {
                next.state.display_text.clone_from(&extracted.stem);
                next.state.options.clone_from(&extracted.options);
                Ok(TransitionResult::new(next).with_effect(Effect::notify(
                    SessionEvent::OptionsReady {
                        stem: extracted.stem,
                        options: extracted.options,
                    },
                )))
            }
        }

        // Back to the pre-request turn; the context entry stays
        (Phase::Streaming { resume }, DialogueEvent::TransportFailed { message }) => {
            let mut next = session.clone();
            next.state.restore_turn();
            next.state.phase = resume.into();
            Ok(TransitionResult::new(next)
                .with_effect(Effect::notify(SessionEvent::Failure { message })))
        }

        // Anything left over from a finalized turn is dropped
        (
            Phase::Finalized,
            DialogueEvent::Stream(_)
            | DialogueEvent::StreamClosed { .. }
            | DialogueEvent::TransportFailed { .. },
        ) => Ok(TransitionResult::unchanged(session)),

        (phase, event) => Err(TransitionError::InvalidTransition(format!(
            "{event:?} while {phase:?}"
        ))),
    }
}

/// The stream is live; the pre-request turn can no longer come back
fn opened(session: &Session) -> Session {
    let mut next = session.clone();
    next.state.saved_turn = None;
    next
}
