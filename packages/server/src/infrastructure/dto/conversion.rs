//! Conversion logic between DTOs and domain entities.

use serde_json::Value;

use crate::domain::{
    ChatRequest, ClientId, FeedbackCounts, GatewayError, HistoryTurn, Identity, Message,
    MessageKind, Session,
};
use crate::infrastructure::dto::{http, websocket as ws};

// ========================================
// DTO → Domain
// ========================================

impl TryFrom<ws::InboundFrame> for ws::InboundMessage {
    type Error = GatewayError;

    fn try_from(frame: ws::InboundFrame) -> Result<Self, Self::Error> {
        let owned = |value: Option<&str>| value.map(str::to_string);

        match frame.kind.as_str() {
            "chat" => Ok(Self::Chat(ws::ChatPayload {
                query: owned(frame.str_field(&["content", "message", "query"])),
                stream: frame.bool_field("stream"),
            })),
            "feedback" => Ok(Self::Feedback(ws::FeedbackPayload {
                message_id: owned(frame.str_field(&["messageId"])),
                feedback_type: owned(frame.str_field(&["feedbackType"])),
            })),
            "human-escalation" => Ok(Self::HumanEscalation(ws::EscalationPayload {
                reason: owned(frame.str_field(&["reason"])),
                contact: owned(frame.str_field(&["contact"])),
                priority: owned(frame.str_field(&["priority"])),
            })),
            "ping" => Ok(Self::Ping),
            other => Err(GatewayError::UnknownMessageType(other.to_string())),
        }
    }
}

impl TryFrom<Value> for http::UnaryReplyDto {
    type Error = GatewayError;

    /// Accept only objects whose `response` is a string; optional fields with
    /// an unexpected shape are dropped rather than failing the answer.
    fn try_from(value: Value) -> Result<Self, Self::Error> {
        let response = value
            .get("response")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                GatewayError::UpstreamProtocol("'response' is missing or not a string".to_string())
            })?
            .to_string();

        Ok(Self {
            response,
            patient_context: value
                .get("patient_context")
                .and_then(Value::as_array)
                .cloned(),
            timestamp: value
                .get("timestamp")
                .and_then(Value::as_str)
                .map(str::to_string),
        })
    }
}

// ========================================
// Domain → DTO
// ========================================

impl From<&Identity> for ws::UserDto {
    fn from(identity: &Identity) -> Self {
        Self {
            user_id: identity.user_id.clone(),
            username: identity.username.clone(),
        }
    }
}

impl From<FeedbackCounts> for ws::FeedbackCountsDto {
    fn from(counts: FeedbackCounts) -> Self {
        Self {
            positive: counts.positive,
            negative: counts.negative,
        }
    }
}

fn kind_str(kind: MessageKind) -> &'static str {
    match kind {
        MessageKind::User => "user",
        MessageKind::Assistant => "assistant",
        MessageKind::System => "system",
    }
}

impl From<&Message> for http::SessionMessageDto {
    fn from(message: &Message) -> Self {
        Self {
            kind: kind_str(message.kind).to_string(),
            content: message.content.clone(),
            timestamp: message.timestamp.to_iso8601(),
            message_id: message.message_id.as_ref().map(|id| id.as_str().to_string()),
        }
    }
}

impl http::SessionDto {
    pub fn from_session(client_id: &ClientId, session: &Session) -> Self {
        Self {
            client_id: client_id.as_str().to_string(),
            user_id: session.user_id.clone(),
            username: session.username.clone(),
            created_at: session.created_at.to_iso8601(),
            messages: session.messages().iter().map(Into::into).collect(),
        }
    }
}

impl From<&HistoryTurn> for http::HistoryTurnDto {
    fn from(turn: &HistoryTurn) -> Self {
        Self {
            role: kind_str(turn.kind).to_string(),
            content: turn.content.clone(),
        }
    }
}

impl From<&ChatRequest> for http::BackendChatRequestDto {
    fn from(request: &ChatRequest) -> Self {
        Self {
            query: request.query.clone(),
            user_id: request.user_id.clone(),
            username: request.username.clone(),
            session_id: request.session_id.as_str().to_string(),
            message_id: request.message_id.as_str().to_string(),
            stream: request.stream,
            conversation_history: request.history.iter().map(Into::into).collect(),
        }
    }
}
