//! AI backend reached over HTTP with `reqwest`.
//!
//! - `POST {base}/chat` answers with one JSON document. The whole exchange is
//!   bounded by the unary timeout.
//! - `POST {base}/chat/stream` answers with a line-framed byte stream. Only
//!   the phase up to the response headers is bounded; once streaming starts
//!   there is no total duration limit.

use std::time::Duration;

use async_trait::async_trait;
use futures_util::StreamExt;
use serde_json::Value;

use crate::{
    domain::{AiBackend, BackendError, ByteStream, ChatRequest},
    infrastructure::dto::http::BackendChatRequestDto,
};

pub struct HttpAiBackend {
    client: reqwest::Client,
    base_url: String,
    unary_timeout: Duration,
    stream_connect_timeout: Duration,
}

impl HttpAiBackend {
    pub fn new(
        base_url: impl Into<String>,
        unary_timeout: Duration,
        stream_connect_timeout: Duration,
    ) -> Result<Self, BackendError> {
        let client = reqwest::Client::builder()
            .build()
            .map_err(|e| BackendError::Protocol(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: base_url.into(),
            unary_timeout,
            stream_connect_timeout,
        })
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/{}", self.base_url.trim_end_matches('/'), path)
    }
}

/// Map a transport error onto the gateway's failure classes
fn classify(e: reqwest::Error) -> BackendError {
    if e.is_timeout() {
        BackendError::Timeout
    } else if e.is_connect() {
        BackendError::Unavailable(e.to_string())
    } else {
        BackendError::Protocol(e.to_string())
    }
}

fn ensure_success(response: reqwest::Response) -> Result<reqwest::Response, BackendError> {
    let status = response.status();
    if status.is_success() {
        Ok(response)
    } else {
        Err(BackendError::Protocol(format!("HTTP {status}")))
    }
}

#[async_trait]
impl AiBackend for HttpAiBackend {
    async fn unary_chat(&self, request: &ChatRequest) -> Result<Value, BackendError> {
        let url = self.endpoint("chat");
        tracing::debug!("POST {} (message '{}')", url, request.message_id);

        let response = self
            .client
            .post(&url)
            .timeout(self.unary_timeout)
            .json(&BackendChatRequestDto::from(request))
            .send()
            .await
            .map_err(classify)?;

        ensure_success(response)?
            .json::<Value>()
            .await
            .map_err(classify)
    }

    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, BackendError> {
        let url = self.endpoint("chat/stream");
        tracing::debug!("POST {} (message '{}')", url, request.message_id);

        let pending = self
            .client
            .post(&url)
            .json(&BackendChatRequestDto::from(request))
            .send();
        let response = tokio::time::timeout(self.stream_connect_timeout, pending)
            .await
            .map_err(|_| BackendError::Timeout)?
            .map_err(classify)?;

        let stream = ensure_success(response)?
            .bytes_stream()
            .map(|chunk| chunk.map(|bytes| bytes.to_vec()).map_err(classify));
        Ok(stream.boxed())
    }
}
