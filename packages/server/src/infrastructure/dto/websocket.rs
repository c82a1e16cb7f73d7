//! WebSocket message DTOs.
//!
//! Every outbound envelope is `{"type": ..., ...fields, "timestamp": ...}`.
//! Inbound frames are parsed in two steps: first into an [`InboundFrame`]
//! (any JSON object with a string `type`), then into the closed
//! [`InboundMessage`] enum (see `conversion`).

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use kakehashi_shared::time::now_iso8601;

/// Identity block of the `connection` envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserDto {
    pub user_id: String,
    pub username: String,
}

/// Feedback tallies of the `feedback-confirmation` envelope
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeedbackCountsDto {
    pub positive: u64,
    pub negative: u64,
}

/// Payload of an outbound envelope, discriminated by `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "kebab-case")]
pub enum EnvelopeBody {
    #[serde(rename_all = "camelCase")]
    Connection {
        client_id: String,
        message: String,
        user: UserDto,
    },
    #[serde(rename_all = "camelCase")]
    Typing { is_typing: bool },
    #[serde(rename_all = "camelCase")]
    StreamStart { message_id: String },
    #[serde(rename_all = "camelCase")]
    StreamToken { message_id: String, content: String },
    #[serde(rename_all = "camelCase")]
    StreamEnd { message_id: String },
    #[serde(rename_all = "camelCase")]
    AiResponse {
        message_id: String,
        content: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        patient_context: Option<Vec<Value>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        upstream_timestamp: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    FeedbackConfirmation {
        message_id: String,
        feedback_type: String,
        counts: FeedbackCountsDto,
    },
    #[serde(rename_all = "camelCase")]
    HumanEscalationResponse {
        message: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        escalation_id: Option<String>,
    },
    Error { message: String, code: String },
    Pong,
}

/// A complete outbound envelope
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope {
    #[serde(flatten)]
    pub body: EnvelopeBody,
    /// ISO-8601 UTC
    pub timestamp: String,
}

impl Envelope {
    /// Stamp a body with the current time
    pub fn new(body: EnvelopeBody) -> Self {
        Self::at(body, now_iso8601())
    }

    pub fn at(body: EnvelopeBody, timestamp: String) -> Self {
        Self { body, timestamp }
    }

    pub fn error(message: impl Into<String>, code: impl Into<String>) -> Self {
        Self::new(EnvelopeBody::Error {
            message: message.into(),
            code: code.into(),
        })
    }

    /// Wire tag of this envelope, e.g. `"stream-token"`
    pub fn kind(&self) -> &'static str {
        match self.body {
            EnvelopeBody::Connection { .. } => "connection",
            EnvelopeBody::Typing { .. } => "typing",
            EnvelopeBody::StreamStart { .. } => "stream-start",
            EnvelopeBody::StreamToken { .. } => "stream-token",
            EnvelopeBody::StreamEnd { .. } => "stream-end",
            EnvelopeBody::AiResponse { .. } => "ai-response",
            EnvelopeBody::FeedbackConfirmation { .. } => "feedback-confirmation",
            EnvelopeBody::HumanEscalationResponse { .. } => "human-escalation-response",
            EnvelopeBody::Error { .. } => "error",
            EnvelopeBody::Pong => "pong",
        }
    }

    /// Serialize for the wire
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|e| {
            tracing::error!("Failed to serialize '{}' envelope: {}", self.kind(), e);
            format!(
                r#"{{"type":"error","message":"Internal error","code":"INTERNAL","timestamp":"{}"}}"#,
                self.timestamp
            )
        })
    }
}

/// Any JSON object carrying a string `type`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InboundFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}

impl InboundFrame {
    /// First string-valued field among `keys`
    pub fn str_field(&self, keys: &[&str]) -> Option<&str> {
        keys.iter()
            .find_map(|key| self.fields.get(*key).and_then(Value::as_str))
    }

    pub fn bool_field(&self, key: &str) -> Option<bool> {
        self.fields.get(key).and_then(Value::as_bool)
    }
}

/// A `chat` frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChatPayload {
    /// Raw, unvalidated question from `content`, `message` or `query`
    pub query: Option<String>,
    /// Per-message relay mode override
    pub stream: Option<bool>,
}

/// A `feedback` frame
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FeedbackPayload {
    pub message_id: Option<String>,
    pub feedback_type: Option<String>,
}

/// A `human-escalation` frame
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EscalationPayload {
    pub reason: Option<String>,
    pub contact: Option<String>,
    pub priority: Option<String>,
}

/// Closed set of inbound message kinds
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InboundMessage {
    Chat(ChatPayload),
    Feedback(FeedbackPayload),
    HumanEscalation(EscalationPayload),
    Ping,
}
