//! Domain error types.

use thiserror::Error;

/// Value object construction errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValueObjectError {
    #[error("client id must not be empty")]
    EmptyClientId,

    #[error("message id must not be empty")]
    EmptyMessageId,

    #[error("query must be a non-empty string")]
    EmptyQuery,

    #[error("query is {length} characters long (max {max})")]
    QueryTooLong { length: usize, max: usize },

    #[error("feedback type must be 'positive' or 'negative', got '{0}'")]
    InvalidFeedbackType(String),

    #[error("priority must be one of low, medium, high, urgent, got '{0}'")]
    InvalidPriority(String),

    #[error("reason must be between 1 and {max} characters (got {length})")]
    InvalidReasonLength { length: usize, max: usize },

    #[error("contact must be 10 to 15 digits, got '{0}'")]
    InvalidContact(String),
}

/// Connection registry errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    /// Registering an id that is already live; indicates a bug in id allocation
    #[error("client '{0}' is already registered")]
    DuplicateClientId(String),

    #[error("client '{0}' is not registered")]
    ClientNotFound(String),
}

/// Credential verification errors
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("no credential supplied")]
    MissingCredential,

    #[error("credential is invalid or expired")]
    InvalidCredential,
}

/// AI backend call errors, classified by how they surface to the user
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum BackendError {
    /// The backend could not be reached (connection refused, DNS, ...)
    #[error("AI backend unavailable: {0}")]
    Unavailable(String),

    #[error("AI backend timed out")]
    Timeout,

    /// Any other transport or protocol failure, including non-2xx responses
    #[error("AI backend protocol error: {0}")]
    Protocol(String),
}

/// Errors reported by persistence-style collaborators (analytics, escalations)
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CollaboratorError {
    #[error("record '{0}' not found")]
    NotFound(String),

    #[error("collaborator unavailable: {0}")]
    Unavailable(String),
}

/// User-facing error taxonomy of the gateway.
///
/// Every variant except [`GatewayError::Unauthorized`] is converted into an
/// `error` envelope at its flow boundary; none of them closes the connection.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum GatewayError {
    #[error("unauthorized")]
    Unauthorized,

    #[error("invalid message format")]
    Format,

    #[error("validation failed: {0}")]
    Validation(String),

    #[error("upstream unavailable")]
    UpstreamUnavailable,

    #[error("upstream timed out")]
    UpstreamTimeout,

    #[error("invalid upstream response: {0}")]
    UpstreamProtocol(String),

    #[error("unknown message type '{0}'")]
    UnknownMessageType(String),

    /// A persistence collaborator the user is waiting on failed
    #[error("collaborator failed: {0}")]
    Collaborator(String),
}

impl GatewayError {
    /// Stable machine-readable code carried by the `error` envelope
    pub fn code(&self) -> &'static str {
        match self {
            Self::Unauthorized => "UNAUTHORIZED",
            Self::Format => "FORMAT_ERROR",
            Self::Validation(_) => "VALIDATION_ERROR",
            Self::UpstreamUnavailable => "UPSTREAM_UNAVAILABLE",
            Self::UpstreamTimeout => "UPSTREAM_TIMEOUT",
            Self::UpstreamProtocol(_) => "UPSTREAM_PROTOCOL_ERROR",
            Self::UnknownMessageType(_) => "UNKNOWN_MESSAGE_TYPE",
            Self::Collaborator(_) => "SERVICE_ERROR",
        }
    }

    /// Message shown to the end user
    pub fn user_message(&self) -> String {
        match self {
            Self::Unauthorized => "Authentication required".to_string(),
            Self::Format => "Invalid message format".to_string(),
            Self::Validation(detail) => detail.clone(),
            Self::UpstreamUnavailable => {
                "AI service unavailable. Please try again later.".to_string()
            }
            Self::UpstreamTimeout => "Request timed out. Please try again.".to_string(),
            Self::UpstreamProtocol(_) => "Failed to get AI response".to_string(),
            Self::UnknownMessageType(_) => "Unknown message type".to_string(),
            Self::Collaborator(detail) => detail.clone(),
        }
    }
}

impl From<ValueObjectError> for GatewayError {
    fn from(e: ValueObjectError) -> Self {
        Self::Validation(e.to_string())
    }
}

impl From<BackendError> for GatewayError {
    fn from(e: BackendError) -> Self {
        match e {
            BackendError::Unavailable(_) => Self::UpstreamUnavailable,
            BackendError::Timeout => Self::UpstreamTimeout,
            BackendError::Protocol(detail) => Self::UpstreamProtocol(detail),
        }
    }
}

impl From<AuthError> for GatewayError {
    fn from(_: AuthError) -> Self {
        Self::Unauthorized
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backend_errors_map_to_distinct_user_messages() {
        // テスト項目: バックエンドエラーの種類ごとに異なるユーザー向けメッセージになる
        // given (前提条件):
        let refused: GatewayError = BackendError::Unavailable("refused".into()).into();
        let timeout: GatewayError = BackendError::Timeout.into();
        let protocol: GatewayError = BackendError::Protocol("HTTP 500".into()).into();

        // when (操作):
        let messages = [
            refused.user_message(),
            timeout.user_message(),
            protocol.user_message(),
        ];

        // then (期待する結果):
        assert_eq!(messages[0], "AI service unavailable. Please try again later.");
        assert_eq!(messages[1], "Request timed out. Please try again.");
        assert_eq!(messages[2], "Failed to get AI response");
        assert_eq!(refused.code(), "UPSTREAM_UNAVAILABLE");
        assert_eq!(timeout.code(), "UPSTREAM_TIMEOUT");
        assert_eq!(protocol.code(), "UPSTREAM_PROTOCOL_ERROR");
    }

    #[test]
    fn test_value_object_error_becomes_validation_error() {
        // テスト項目: 値オブジェクトのエラーは VALIDATION_ERROR として扱われる
        let error: GatewayError = ValueObjectError::EmptyQuery.into();
        assert_eq!(error.code(), "VALIDATION_ERROR");
        assert_eq!(error.user_message(), "query must be a non-empty string");
    }
}
