//! Mock backend for tests

use super::{
    BackendError, ByteStream, GenerationRequest, GenerationResponse, QuestionBackend,
    QuestionRequest,
};
use async_trait::async_trait;
use futures::stream;
use std::collections::VecDeque;
use std::sync::Mutex;
use tokio::sync::mpsc;

/// A queued reply to a question request
pub enum MockReply {
    /// Serve these fragments, then end the body
    Fragments(Vec<Vec<u8>>),
    /// Serve fragments as they are pushed through the channel
    Channel(mpsc::UnboundedReceiver<Vec<u8>>),
    /// Fail before any stream exists
    Fail(BackendError),
}

/// Backend that serves queued replies and records requests
pub struct MockBackend {
    replies: Mutex<VecDeque<MockReply>>,
    generations: Mutex<VecDeque<Result<GenerationResponse, BackendError>>>,
    /// Record of question requests, in order
    pub requests: Mutex<Vec<QuestionRequest>>,
    pub generation_requests: Mutex<Vec<GenerationRequest>>,
}

impl MockBackend {
    pub fn new() -> Self {
        Self {
            replies: Mutex::new(VecDeque::new()),
            generations: Mutex::new(VecDeque::new()),
            requests: Mutex::new(Vec::new()),
            generation_requests: Mutex::new(Vec::new()),
        }
    }

    /// Queue a body made of SSE records, delivered as one fragment each
    pub fn queue_records(&self, records: &[&str]) {
        let fragments = records.iter().map(|r| r.as_bytes().to_vec()).collect();
        self.replies
            .lock()
            .unwrap()
            .push_back(MockReply::Fragments(fragments));
    }

    /// Queue a body whose fragments the test pushes by hand
    pub fn queue_channel(&self) -> mpsc::UnboundedSender<Vec<u8>> {
        let (tx, rx) = mpsc::unbounded_channel();
        self.replies
            .lock()
            .unwrap()
            .push_back(MockReply::Channel(rx));
        tx
    }

    pub fn queue_failure(&self, error: BackendError) {
        self.replies.lock().unwrap().push_back(MockReply::Fail(error));
    }

    pub fn queue_generation(&self, response: Result<GenerationResponse, BackendError>) {
        self.generations.lock().unwrap().push_back(response);
    }

    pub fn recorded_requests(&self) -> Vec<QuestionRequest> {
        self.requests.lock().unwrap().clone()
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl QuestionBackend for MockBackend {
    async fn open_question_stream(
        &self,
        request: &QuestionRequest,
    ) -> Result<ByteStream, BackendError> {
        self.requests.lock().unwrap().push(request.clone());
        let reply = self
            .replies
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| MockReply::Fail(BackendError::network("No mock reply queued")));

        match reply {
            MockReply::Fragments(fragments) => Ok(Box::pin(stream::iter(
                fragments.into_iter().map(Ok::<_, BackendError>),
            ))),
            MockReply::Channel(rx) => Ok(Box::pin(stream::unfold(rx, |mut rx| async move {
                rx.recv()
                    .await
                    .map(|fragment| (Ok::<_, BackendError>(fragment), rx))
            }))),
            MockReply::Fail(error) => Err(error),
        }
    }

    async fn generate_microtasks(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError> {
        self.generation_requests.lock().unwrap().push(request.clone());
        self.generations
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(BackendError::network("No mock generation queued")))
    }
}
