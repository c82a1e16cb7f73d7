//! Escalation store trait
//!
//! Persists requests to hand a conversation over to a human agent.

use async_trait::async_trait;

use super::{CollaboratorError, ContactNumber, EscalationReason, Priority};

/// A validated escalation ready to be persisted
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EscalationRequest {
    pub user_id: String,
    pub reason: EscalationReason,
    pub contact: ContactNumber,
    pub priority: Priority,
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EscalationStore: Send + Sync {
    /// Persist the escalation and return its id
    async fn create_escalation(
        &self,
        request: EscalationRequest,
    ) -> Result<String, CollaboratorError>;
}
