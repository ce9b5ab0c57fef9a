//! Dialogue engine: runs transitions and executes their effects

use super::effect::{Effect, SessionEvent};
use super::event::DialogueEvent;
use super::state::Session;
use super::transition::{transition, TransitionError};
use crate::backend::{QuestionBackend, QuestionRequest};
use crate::stream::EventStream;
use futures::StreamExt;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::{broadcast, mpsc, oneshot, watch};

const COMMAND_CAPACITY: usize = 32;
const NOTIFY_CAPACITY: usize = 256;

/// The engine task has stopped
#[derive(Debug, Error)]
#[error("Dialogue engine is no longer running")]
pub struct EngineClosed;

/// What happened to a caller request
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Outcome {
    Accepted,
    /// Rejected without any state change
    Ignored(TransitionError),
}

impl Outcome {
    pub fn is_accepted(&self) -> bool {
        matches!(self, Outcome::Accepted)
    }
}

struct Command {
    event: DialogueEvent,
    ack: oneshot::Sender<Outcome>,
}

/// Handle to interact with a running dialogue
#[derive(Clone)]
pub struct DialogueHandle {
    command_tx: mpsc::Sender<Command>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    state_rx: watch::Receiver<Session>,
}

impl DialogueHandle {
    /// Ask for the opening question
    pub async fn start(&self) -> Result<Outcome, EngineClosed> {
        self.send(DialogueEvent::Start).await
    }

    /// Answer the current question
    pub async fn submit(&self, answer: impl Into<String>) -> Result<Outcome, EngineClosed> {
        self.send(DialogueEvent::submit(answer)).await
    }

    /// Subscribe to notifications
    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.broadcast_tx.subscribe()
    }

    /// Current session contents
    pub fn snapshot(&self) -> Session {
        self.state_rx.borrow().clone()
    }

    /// Wait until the session satisfies `predicate`
    pub async fn wait_for(
        &self,
        predicate: impl FnMut(&Session) -> bool,
    ) -> Result<Session, EngineClosed> {
        let mut rx = self.state_rx.clone();
        let session = rx.wait_for(predicate).await.map_err(|_| EngineClosed)?;
        Ok(session.clone())
    }

    async fn send(&self, event: DialogueEvent) -> Result<Outcome, EngineClosed> {
        let (ack, ack_rx) = oneshot::channel();
        self.command_tx
            .send(Command { event, ack })
            .await
            .map_err(|_| EngineClosed)?;
        ack_rx.await.map_err(|_| EngineClosed)
    }
}

/// Owns one dialogue session and drives it from commands and stream events
pub struct DialogueEngine<B: QuestionBackend + 'static> {
    session_id: String,
    session: Session,
    backend: Arc<B>,
    delta_pause: Duration,
    /// Set by a text delta; cleared once the engine has yielded
    pause_pending: bool,
    command_rx: mpsc::Receiver<Command>,
    stream_tx: mpsc::UnboundedSender<DialogueEvent>,
    stream_rx: mpsc::UnboundedReceiver<DialogueEvent>,
    broadcast_tx: broadcast::Sender<SessionEvent>,
    state_tx: watch::Sender<Session>,
}

impl<B: QuestionBackend + 'static> DialogueEngine<B> {
    pub fn new(backend: Arc<B>, delta_pause: Duration) -> (Self, DialogueHandle) {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (stream_tx, stream_rx) = mpsc::unbounded_channel();
        let (broadcast_tx, _) = broadcast::channel(NOTIFY_CAPACITY);
        let (state_tx, state_rx) = watch::channel(Session::new());

        let engine = Self {
            session_id: uuid::Uuid::new_v4().to_string(),
            session: Session::new(),
            backend,
            delta_pause,
            pause_pending: false,
            command_rx,
            stream_tx,
            stream_rx,
            broadcast_tx: broadcast_tx.clone(),
            state_tx,
        };
        let handle = DialogueHandle {
            command_tx,
            broadcast_tx,
            state_rx,
        };
        (engine, handle)
    }

    /// Spawn the engine and return a handle to it
    pub fn spawn(backend: Arc<B>, delta_pause: Duration) -> DialogueHandle {
        let (engine, handle) = Self::new(backend, delta_pause);
        tokio::spawn(engine.run());
        handle
    }

    /// Process events until every handle is gone and no stream is open.
    ///
    /// A stream that never ends keeps the engine alive; there is no watchdog.
    pub async fn run(mut self) {
        tracing::info!(session_id = %self.session_id, "Starting dialogue engine");
        let mut commands_closed = false;

        loop {
            tokio::select! {
                biased;
                Some(event) = self.stream_rx.recv() => {
                    if let Err(e) = self.process_event(event) {
                        tracing::debug!(session_id = %self.session_id, error = %e, "Dropping stream event");
                    }
                    self.run_pending_pause().await;
                }
                command = self.command_rx.recv(), if !commands_closed => match command {
                    Some(Command { event, ack }) => {
                        let outcome = match self.process_event(event) {
                            Ok(()) => Outcome::Accepted,
                            Err(e) => {
                                tracing::debug!(session_id = %self.session_id, error = %e, "Ignoring request");
                                Outcome::Ignored(e)
                            }
                        };
                        let _ = ack.send(outcome);
                    }
                    None => commands_closed = true,
                },
            }

            if commands_closed && !self.session.state.is_streaming() {
                break;
            }
        }

        tracing::info!(session_id = %self.session_id, "Dialogue engine stopped");
    }

    fn process_event(&mut self, event: DialogueEvent) -> Result<(), TransitionError> {
        if let DialogueEvent::Stream(crate::stream::Event::Error { detail }) = &event {
            tracing::warn!(session_id = %self.session_id, detail = %detail, "Backend reported an error");
        }
        if let DialogueEvent::StreamClosed { finalized } = &event {
            tracing::debug!(session_id = %self.session_id, finalized, "Stream closed");
        }

        let result = transition(&self.session, event)?;
        self.session = result.new_session;
        self.state_tx.send_replace(self.session.clone());

        for effect in result.effects {
            self.execute_effect(effect);
        }
        Ok(())
    }

    fn execute_effect(&mut self, effect: Effect) {
        match effect {
            Effect::RequestStream { request } => {
                tracing::info!(
                    session_id = %self.session_id,
                    turn_index = self.session.state.turn_index,
                    context_len = request.context.len(),
                    "Requesting next question"
                );
                let backend = Arc::clone(&self.backend);
                let tx = self.stream_tx.clone();
                tokio::spawn(pump_stream(backend, request, tx));
            }
            Effect::Notify(event) => {
                // No subscribers is fine
                let _ = self.broadcast_tx.send(event);
            }
            Effect::PauseForRender => {
                self.pause_pending = true;
            }
        }
    }

    async fn run_pending_pause(&mut self) {
        if !std::mem::take(&mut self.pause_pending) {
            return;
        }
        if self.delta_pause.is_zero() {
            tokio::task::yield_now().await;
        } else {
            tokio::time::sleep(self.delta_pause).await;
        }
    }
}

/// Open a stream and feed its decoded events back to the engine
async fn pump_stream<B: QuestionBackend>(
    backend: Arc<B>,
    request: QuestionRequest,
    tx: mpsc::UnboundedSender<DialogueEvent>,
) {
    let bytes = match backend.open_question_stream(&request).await {
        Ok(bytes) => bytes,
        Err(e) => {
            let _ = tx.send(DialogueEvent::TransportFailed {
                message: format!("Could not reach the backend ({}): {e}", e.kind.label()),
            });
            return;
        }
    };

    let mut events = EventStream::new(bytes);
    let mut records = 0usize;
    while let Some(event) = events.next().await {
        records += 1;
        if tx.send(DialogueEvent::Stream(event)).is_err() {
            return;
        }
    }

    tracing::debug!(records, finalized = events.saw_finalize(), "Stream drained");
    let _ = tx.send(DialogueEvent::StreamClosed {
        finalized: events.saw_finalize(),
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backend::testing::MockBackend;
    use crate::backend::BackendError;
    use crate::dialogue::{ContextEntry, Phase};
    use crate::options::ChoiceOption;
    use crate::stream::{CoachTone, EfCapacity, MetacognitionStyle, Metrics, ProcessingStyle};
    use serde_json::json;

    const WAIT: Duration = Duration::from_secs(5);

    fn text_record(content: &str) -> String {
        format!("data: {}\n\n", json!({ "type": "text", "content": content }))
    }

    fn end_record() -> String {
        "data: {\"type\":\"end\"}\n\n".to_string()
    }

    fn finalize_record() -> String {
        format!(
            "data: {}\n\n",
            json!({
                "type": "neuro_metrics_finalized",
                "result": {
                    "ef_capacity": "low",
                    "processing_style": "high_friction",
                    "coach_tone": "reassuring",
                    "metacognition_style": "planner"
                }
            })
        )
    }

    fn expected_metrics() -> Metrics {
        Metrics {
            ef_capacity: EfCapacity::Low,
            processing_style: ProcessingStyle::HighFriction,
            coach_tone: CoachTone::Reassuring,
            metacognition_style: MetacognitionStyle::Planner,
        }
    }

    fn queue(backend: &MockBackend, records: &[String]) {
        let refs: Vec<&str> = records.iter().map(String::as_str).collect();
        backend.queue_records(&refs);
    }

    async fn wait_for_phase(handle: &DialogueHandle, phase: Phase) -> Session {
        tokio::time::timeout(WAIT, handle.wait_for(move |s| s.state.phase == phase))
            .await
            .expect("timed out waiting for phase")
            .unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<SessionEvent>) -> Vec<SessionEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    async fn started_engine(backend: &Arc<MockBackend>) -> DialogueHandle {
        let handle = DialogueEngine::spawn(Arc::clone(backend), Duration::ZERO);
        assert_eq!(handle.start().await.unwrap(), Outcome::Accepted);
        handle
    }

    #[tokio::test]
    async fn test_full_dialogue() {
        let backend = Arc::new(MockBackend::new());
        queue(
            &backend,
            &[
                text_record("How do you start big tasks?"),
                text_record("A. Make a plan B. Jump in C. Wait"),
                end_record(),
            ],
        );
        queue(&backend, &[text_record("Thanks."), finalize_record()]);

        let handle = DialogueEngine::spawn(Arc::clone(&backend), Duration::ZERO);
        let mut rx = handle.subscribe();
        assert!(handle.start().await.unwrap().is_accepted());

        let session = wait_for_phase(&handle, Phase::AwaitingAnswer).await;
        assert_eq!(session.state.display_text, "How do you start big tasks?");
        assert_eq!(
            session.state.options,
            vec![
                ChoiceOption::new('A', "Make a plan"),
                ChoiceOption::new('B', "Jump in"),
                ChoiceOption::new('C', "Wait"),
            ]
        );
        assert_eq!(session.state.turn_index, 0);
        assert!(session.context.is_empty());

        let answer = session.state.option_label('a').unwrap().to_string();
        assert!(handle.submit(answer).await.unwrap().is_accepted());

        let session = wait_for_phase(&handle, Phase::Finalized).await;
        assert_eq!(session.metrics, Some(expected_metrics()));
        assert_eq!(session.state.turn_index, 1);
        assert_eq!(
            session.context,
            vec![ContextEntry::new(
                "How do you start big tasks? A. Make a plan B. Jump in C. Wait",
                "Make a plan"
            )]
        );

        let requests = backend.recorded_requests();
        assert_eq!(requests.len(), 2);
        assert!(requests[0].context.is_empty());
        assert_eq!(requests[1].input, "Make a plan");
        assert_eq!(requests[1].context, session.context);

        let events = drain(&mut rx);
        assert!(events.contains(&SessionEvent::TextUpdated {
            text: "How do you start big tasks?".to_string()
        }));
        assert!(events
            .iter()
            .any(|e| matches!(e, SessionEvent::OptionsReady { options, .. } if options.len() == 3)));
        assert!(events.contains(&SessionEvent::TurnStarted { turn_index: 1 }));
        assert_eq!(
            events.last(),
            Some(&SessionEvent::Synthesizing {
                metrics: expected_metrics()
            })
        );
    }

    #[tokio::test]
    async fn test_submit_while_streaming_is_single_flight() {
        let backend = Arc::new(MockBackend::new());
        queue(&backend, &[text_record("First question?")]);
        let handle = started_engine(&backend).await;
        wait_for_phase(&handle, Phase::AwaitingAnswer).await;

        let body = backend.queue_channel();
        let first = handle.submit("one").await.unwrap();
        let second = handle.submit("two").await.unwrap();
        assert_eq!(first, Outcome::Accepted);
        assert_eq!(second, Outcome::Ignored(TransitionError::Busy));

        body.send(text_record("Second question?").into_bytes()).unwrap();
        drop(body);
        let session = wait_for_phase(&handle, Phase::AwaitingAnswer).await;

        assert_eq!(session.context, vec![ContextEntry::new("First question?", "one")]);
        assert_eq!(session.state.turn_index, 1);
        assert_eq!(session.state.current_text, "Second question?");
        assert_eq!(backend.recorded_requests().len(), 2);
    }

    #[tokio::test]
    async fn test_transport_failure_restores_the_turn() {
        let backend = Arc::new(MockBackend::new());
        queue(&backend, &[text_record("Ready? A. Yes B. No")]);
        let handle = started_engine(&backend).await;
        let before = wait_for_phase(&handle, Phase::AwaitingAnswer).await;

        let mut rx = handle.subscribe();
        backend.queue_failure(BackendError::server_error("overloaded"));
        assert!(handle.submit("Yes").await.unwrap().is_accepted());

        let event = tokio::time::timeout(WAIT, async {
            loop {
                if let Ok(SessionEvent::Failure { message }) = rx.recv().await {
                    return message;
                }
            }
        })
        .await
        .unwrap();
        assert!(event.contains("overloaded"));

        let session = handle.snapshot();
        assert_eq!(session.state, before.state);
        assert_eq!(session.state.option_label('a'), Some("Yes"));
        // The aborted turn's context entry is kept
        assert_eq!(
            session.context,
            vec![ContextEntry::new("Ready? A. Yes B. No", "Yes")]
        );

        // A retry pairs the same question again
        queue(&backend, &[text_record("Next?")]);
        assert!(handle.submit("No").await.unwrap().is_accepted());
        let session = wait_for_phase(&handle, Phase::AwaitingAnswer).await;
        assert_eq!(session.state.turn_index, 1);
        assert_eq!(session.state.current_text, "Next?");
        assert_eq!(
            session.context,
            vec![
                ContextEntry::new("Ready? A. Yes B. No", "Yes"),
                ContextEntry::new("Ready? A. Yes B. No", "No"),
            ]
        );
        assert_eq!(backend.recorded_requests()[2].context, session.context);
    }

    #[tokio::test]
    async fn test_finalized_dialogue_ignores_submits() {
        let backend = Arc::new(MockBackend::new());
        queue(&backend, &[finalize_record(), text_record("ignored")]);
        let handle = started_engine(&backend).await;
        let before = wait_for_phase(&handle, Phase::Finalized).await;

        let outcome = handle.submit("anything").await.unwrap();
        assert_eq!(outcome, Outcome::Ignored(TransitionError::Finalized));
        assert_eq!(handle.snapshot(), before);
        assert_eq!(backend.recorded_requests().len(), 1);
    }

    #[tokio::test]
    async fn test_empty_answer_and_repeat_start_are_ignored() {
        let backend = Arc::new(MockBackend::new());
        queue(&backend, &[text_record("Q?")]);
        let handle = started_engine(&backend).await;
        let before = wait_for_phase(&handle, Phase::AwaitingAnswer).await;

        assert_eq!(
            handle.submit("   ").await.unwrap(),
            Outcome::Ignored(TransitionError::EmptyAnswer)
        );
        assert_eq!(
            handle.start().await.unwrap(),
            Outcome::Ignored(TransitionError::AlreadyStarted)
        );
        assert_eq!(handle.snapshot(), before);
    }

    #[tokio::test]
    async fn test_malformed_records_do_not_reach_the_engine() {
        let backend = Arc::new(MockBackend::new());
        queue(
            &backend,
            &[
                "data: {oops\n\n".to_string(),
                "data: {\"type\":\"error\",\"detail\":\"slow\"}\n\n".to_string(),
                text_record("Still here?"),
            ],
        );
        let handle = started_engine(&backend).await;
        let session = wait_for_phase(&handle, Phase::AwaitingAnswer).await;
        assert_eq!(session.state.current_text, "Still here?");
    }
}
