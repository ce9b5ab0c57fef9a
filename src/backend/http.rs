//! HTTP implementation of the backend

use super::{
    BackendError, ByteStream, GenerationRequest, GenerationResponse, QuestionBackend,
    QuestionRequest,
};
use crate::config::SandboxConfig;
use async_trait::async_trait;
use futures::StreamExt;
use reqwest::{Client, RequestBuilder};
use serde_json::Value;
use std::sync::Arc;

const QUESTION_PATH: &str = "calibration/stream";
const GENERATE_PATH: &str = "microtasks/generate";

/// Backend reached over HTTP
pub struct HttpBackend {
    client: Client,
    config: Arc<SandboxConfig>,
}

impl HttpBackend {
    pub fn new(config: Arc<SandboxConfig>) -> Result<Self, BackendError> {
        // Streams stay open as long as the backend keeps them open; only
        // connecting and the one-shot generation call are bounded
        let client = Client::builder()
            .connect_timeout(config.request_timeout)
            .build()
            .map_err(|e| BackendError::unknown(format!("Failed to create HTTP client: {e}")))?;
        Ok(Self { client, config })
    }

    fn post(&self, path: &str) -> RequestBuilder {
        let request = self
            .client
            .post(self.config.endpoint(path))
            .header("content-type", "application/json");
        match &self.config.api_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }
}

#[async_trait]
impl QuestionBackend for HttpBackend {
    async fn open_question_stream(
        &self,
        request: &QuestionRequest,
    ) -> Result<ByteStream, BackendError> {
        let response = self
            .post(QUESTION_PATH)
            .header("accept", "text/event-stream")
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        let stream = response
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(BackendError::from));
        Ok(Box::pin(stream))
    }

    async fn generate_microtasks(
        &self,
        request: &GenerationRequest,
    ) -> Result<GenerationResponse, BackendError> {
        let response = self
            .post(GENERATE_PATH)
            .timeout(self.config.request_timeout)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| BackendError::network(format!("Failed to read response: {e}")))?;

        if !status.is_success() {
            return Err(BackendError::from_status(status.as_u16(), &body));
        }

        let raw: Value = serde_json::from_str(&body)
            .map_err(|e| BackendError::decode(format!("Failed to parse response: {e}")))?;
        GenerationResponse::from_value(raw)
    }
}
