//! UseCase: 回答へのフィードバック記録

use std::sync::Arc;

use crate::{
    domain::{
        Analytics, ClientId, CollaboratorError, ConnectionRegistry, FeedbackCounts, FeedbackType,
        GatewayError, MessageId,
    },
    infrastructure::dto::websocket::{EnvelopeBody, FeedbackPayload},
};

use super::push;

/// Message of the `error` envelope sent when analytics rejects the update
pub const FEEDBACK_FAILED_MESSAGE: &str = "Failed to record feedback";

/// フィードバック記録のユースケース
pub struct FeedbackUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    analytics: Arc<dyn Analytics>,
}

impl FeedbackUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, analytics: Arc<dyn Analytics>) -> Self {
        Self {
            registry,
            analytics,
        }
    }

    /// フィードバックを記録し、`feedback-confirmation` を返す
    ///
    /// 検証エラー・記録失敗はどちらも `Err` として返し、エラーエンベロープへの変換は
    /// 呼び出し元（MessageRouter）が行う。
    pub async fn execute(
        &self,
        client_id: &ClientId,
        payload: FeedbackPayload,
    ) -> Result<FeedbackCounts, GatewayError> {
        let message_id = MessageId::new(payload.message_id.unwrap_or_default())?;
        let feedback: FeedbackType = payload.feedback_type.as_deref().unwrap_or_default().parse()?;

        let counts = self
            .analytics
            .update_feedback(&message_id, feedback)
            .await
            .map_err(|e| {
                match &e {
                    CollaboratorError::NotFound(_) => {
                        tracing::info!("Feedback for unknown message '{}': {}", message_id, e)
                    }
                    CollaboratorError::Unavailable(_) => {
                        tracing::warn!("Failed to record feedback for '{}': {}", message_id, e)
                    }
                }
                GatewayError::Collaborator(FEEDBACK_FAILED_MESSAGE.to_string())
            })?;

        push(
            self.registry.as_ref(),
            client_id,
            EnvelopeBody::FeedbackConfirmation {
                message_id: message_id.to_string(),
                feedback_type: feedback.as_str().to_string(),
                counts: counts.into(),
            },
        )
        .await;

        tracing::debug!(
            "Recorded {} feedback for '{}' ({}+/{}-)",
            feedback.as_str(),
            message_id,
            counts.positive,
            counts.negative
        );
        Ok(counts)
    }
}
