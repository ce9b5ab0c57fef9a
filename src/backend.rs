//! Generation backend abstraction
//!
//! The dialogue and export flows only talk to [`QuestionBackend`]; the HTTP
//! transport lives behind it so everything above can be tested with mocks.

mod error;
mod http;

#[cfg(test)]
pub mod testing;

pub use error::{BackendError, BackendErrorKind};
pub use http::HttpBackend;

use crate::dialogue::ContextEntry;
use crate::report::{AttachmentMeta, MicrotaskRecord};
use crate::stream::Metrics;
use async_trait::async_trait;
use futures::stream::Stream;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::pin::Pin;
use std::sync::Arc;

/// Raw body fragments of a streamed response
pub type ByteStream = Pin<Box<dyn Stream<Item = Result<Vec<u8>, BackendError>> + Send>>;

/// Request for the next calibration question
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuestionRequest {
    pub input: String,
    pub context: Vec<ContextEntry>,
}

/// Request for a microtask breakdown once calibration is done
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenerationRequest {
    pub course_id: String,
    pub assignment_id: String,
    pub metrics: Metrics,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attachment: Option<AttachmentMeta>,
}

/// Parsed microtask breakdown, with the untouched body kept alongside
#[derive(Debug, Clone, PartialEq)]
pub struct GenerationResponse {
    pub raw: Value,
    pub microtasks: Vec<MicrotaskRecord>,
    /// The task list as received, one value per entry of `microtasks`
    pub task_values: Vec<Value>,
    pub pedagogical_reasoning: Option<String>,
}

impl GenerationResponse {
    /// Accepts either `{"microtasks": [...], ...}` or a bare array
    pub fn from_value(raw: Value) -> Result<Self, BackendError> {
        let tasks_value = match &raw {
            Value::Array(_) => raw.clone(),
            Value::Object(map) => map
                .get("microtasks")
                .cloned()
                .ok_or_else(|| BackendError::decode("Response has no microtasks field"))?,
            _ => return Err(BackendError::decode("Response is neither an object nor an array")),
        };

        let microtasks = Vec::<MicrotaskRecord>::deserialize(&tasks_value)
            .map_err(|e| BackendError::decode(format!("Invalid microtask list: {e}")))?;
        let Value::Array(task_values) = tasks_value else {
            return Err(BackendError::decode("Microtask list is not an array"));
        };

        let pedagogical_reasoning = raw
            .get("pedagogical_reasoning")
            .and_then(Value::as_str)
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(ToString::to_string);

        Ok(Self {
            raw,
            microtasks,
            task_values,
            pedagogical_reasoning,
        })
    }
}

/// Network collaborator for the sandbox
#[async_trait]
pub trait QuestionBackend: Send + Sync {
    /// Open a streamed answer for the next question
    async fn open_question_stream(&self, request: &QuestionRequest)
        -> Result<ByteStream, BackendError>;

    /// Generate the microtask breakdown
    async fn generate_microtasks(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError>;
}

#[async_trait]
impl<T: QuestionBackend + ?Sized> QuestionBackend for Arc<T> {
    async fn open_question_stream(
        &self,
        request: &QuestionRequest,
    ) -> Result<ByteStream, BackendError> {
        (**self).open_question_stream(request).await
    }

    async fn generate_microtasks(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError> {
        (**self).generate_microtasks(request).await
    }
}

/// Logging wrapper for backends
pub struct LoggingBackend<B> {
    inner: B,
}

impl<B: QuestionBackend> LoggingBackend<B> {
    pub fn new(inner: B) -> Self {
        Self { inner }
    }
}

#[async_trait]
impl<B: QuestionBackend> QuestionBackend for LoggingBackend<B> {
    async fn open_question_stream(
        &self,
        request: &QuestionRequest,
    ) -> Result<ByteStream, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.open_question_stream(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(_) => tracing::info!(
                duration_ms = %duration.as_millis(),
                context_len = request.context.len(),
                "Question stream opened"
            ),
            Err(e) => tracing::error!(
                duration_ms = %duration.as_millis(),
                error = %e.message,
                kind = e.kind.label(),
                "Question stream failed"
            ),
        }

        result
    }

    async fn generate_microtasks(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError> {
        let start = std::time::Instant::now();
        let result = self.inner.generate_microtasks(request).await;
        let duration = start.elapsed();

        match &result {
            Ok(response) => tracing::info!(
                duration_ms = %duration.as_millis(),
                tasks = response.microtasks.len(),
                "Microtask generation completed"
            ),
            Err(e) => tracing::error!(
                duration_ms = %duration.as_millis(),
                error = %e.message,
                kind = e.kind.label(),
                "Microtask generation failed"
            ),
        }

        result
    }
}
