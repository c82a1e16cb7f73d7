//! AI backend trait
//!
//! The backend answers a question either with a single JSON document (unary
//! mode) or with an open-ended byte stream of line-framed events (streaming
//! mode). Decoding the stream is the job of [`super::token_stream`].

use async_trait::async_trait;
use futures_util::stream::BoxStream;

use super::{BackendError, ClientId, MessageId, MessageKind};

/// Raw upstream bytes, chunked however the transport delivers them
pub type ByteStream = BoxStream<'static, Result<Vec<u8>, BackendError>>;

/// One prior turn sent to the backend as context
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HistoryTurn {
    pub kind: MessageKind,
    pub content: String,
}

/// Everything the backend needs to answer one question
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatRequest {
    pub query: String,
    pub user_id: String,
    pub username: String,
    pub session_id: ClientId,
    pub message_id: MessageId,
    pub stream: bool,
    pub history: Vec<HistoryTurn>,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait AiBackend: Send + Sync {
    /// Ask for a complete answer. The body is returned as-is; shape validation
    /// is done by the chat flow.
    async fn unary_chat(&self, request: &ChatRequest) -> Result<serde_json::Value, BackendError>;

    /// Ask for a streamed answer. Resolves once the backend has accepted the
    /// request (response headers received).
    async fn stream_chat(&self, request: &ChatRequest) -> Result<ByteStream, BackendError>;
}
