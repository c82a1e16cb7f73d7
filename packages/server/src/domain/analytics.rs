//! Analytics collaborator trait
//!
//! Records questions, answers and user feedback keyed by message id. Writes
//! from the chat flow are a side channel: callers log and swallow failures.

use async_trait::async_trait;

use super::{ClientId, CollaboratorError, FeedbackType, MessageId, Timestamp};

/// A user question as handed to analytics
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QuestionRecord {
    pub message_id: MessageId,
    pub client_id: ClientId,
    pub user_id: String,
    pub question: String,
    pub asked_at: Timestamp,
}

/// Feedback tallies for one message after an update
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FeedbackCounts {
    pub positive: u64,
    pub negative: u64,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Analytics: Send + Sync {
    async fn store_question(&self, record: QuestionRecord) -> Result<(), CollaboratorError>;

    async fn update_ai_response(
        &self,
        message_id: &MessageId,
        response: &str,
    ) -> Result<(), CollaboratorError>;

    async fn update_feedback(
        &self,
        message_id: &MessageId,
        feedback: FeedbackType,
    ) -> Result<FeedbackCounts, CollaboratorError>;
}
