//! HTTP DTOs: REST responses exposed by the gateway and the bodies exchanged
//! with the AI backend.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Response of `GET /api/clients/count`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClientCountDto {
    pub count: usize,
}

/// One history entry of [`SessionDto`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionMessageDto {
    pub kind: String,
    pub content: String,
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

/// Response of `GET /api/sessions/{client_id}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionDto {
    pub client_id: String,
    pub user_id: String,
    pub username: String,
    pub created_at: String,
    pub messages: Vec<SessionMessageDto>,
}

/// Prior turn sent to the backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HistoryTurnDto {
    pub role: String,
    pub content: String,
}

/// Request body of the backend's `/chat` and `/chat/stream` endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendChatRequestDto {
    pub query: String,
    pub user_id: String,
    pub username: String,
    pub session_id: String,
    pub message_id: String,
    pub stream: bool,
    pub conversation_history: Vec<HistoryTurnDto>,
}

/// Validated unary backend answer: `{response, patient_context?, timestamp?}`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnaryReplyDto {
    pub response: String,
    #[serde(default)]
    pub patient_context: Option<Vec<Value>>,
    #[serde(default)]
    pub timestamp: Option<String>,
}
