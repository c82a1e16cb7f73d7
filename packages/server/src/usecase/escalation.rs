//! UseCase: 有人対応（エスカレーション）の受付
//!
//! 受付は常に同じ文面で応答する。連絡先が指定された場合のみ外部のエスカレーション
//! ストアへ登録し、その失敗はログに残すだけでクライアントへの応答は変えない。

use std::sync::Arc;

use crate::{
    domain::{
        ClientId, ConnectionRegistry, ContactNumber, EscalationReason, EscalationRequest,
        EscalationStore, GatewayError, Message, Priority,
    },
    infrastructure::dto::websocket::{EnvelopeBody, EscalationPayload},
};

use super::{push, unregistered};

/// Reason recorded when the client gives none
pub const DEFAULT_ESCALATION_REASON: &str = "User requested human assistance";

/// Fixed text of the `human-escalation-response` envelope
pub const ESCALATION_ACK_MESSAGE: &str =
    "Your request has been forwarded to a human agent. Someone will contact you shortly.";

/// エスカレーション受付のユースケース
pub struct EscalationUseCase {
    registry: Arc<dyn ConnectionRegistry>,
    store: Arc<dyn EscalationStore>,
}

impl EscalationUseCase {
    pub fn new(registry: Arc<dyn ConnectionRegistry>, store: Arc<dyn EscalationStore>) -> Self {
        Self { registry, store }
    }

    /// エスカレーションを受け付ける
    ///
    /// # Returns
    ///
    /// * `Ok(Some(id))` - ストアに登録された場合はその ID
    /// * `Ok(None)` - 受付のみ（連絡先無し、またはストアの失敗）
    /// * `Err(GatewayError)` - 入力が不正
    pub async fn execute(
        &self,
        client_id: &ClientId,
        payload: EscalationPayload,
    ) -> Result<Option<String>, GatewayError> {
        let reason =
            EscalationReason::new(payload.reason.as_deref().unwrap_or(DEFAULT_ESCALATION_REASON))?;
        let priority = match payload.priority.as_deref() {
            Some(raw) => raw.parse::<Priority>()?,
            None => Priority::default(),
        };
        let contact = payload
            .contact
            .as_deref()
            .map(ContactNumber::new)
            .transpose()?;

        let connection = self
            .registry
            .connection(client_id)
            .await
            .ok_or_else(|| unregistered(client_id))?;

        self.append_system(
            client_id,
            format!(
                "Human escalation requested: {} (priority: {})",
                reason.as_str(),
                priority.as_str()
            ),
        )
        .await;

        let escalation_id = match contact {
            Some(contact) => {
                let request = EscalationRequest {
                    user_id: connection.identity.user_id.clone(),
                    reason,
                    contact,
                    priority,
                };
                match self.store.create_escalation(request).await {
                    Ok(id) => Some(id),
                    Err(e) => {
                        tracing::warn!(
                            "Failed to persist escalation for client '{}': {}",
                            client_id,
                            e
                        );
                        None
                    }
                }
            }
            None => None,
        };

        push(
            self.registry.as_ref(),
            client_id,
            EnvelopeBody::HumanEscalationResponse {
                message: ESCALATION_ACK_MESSAGE.to_string(),
                escalation_id: escalation_id.clone(),
            },
        )
        .await;
        self.append_system(client_id, ESCALATION_ACK_MESSAGE.to_string())
            .await;

        tracing::info!(
            "Client '{}' (user '{}') asked for a human, priority {}",
            client_id,
            connection.identity.user_id,
            priority.as_str()
        );
        Ok(escalation_id)
    }

    async fn append_system(&self, client_id: &ClientId, content: String) {
        if let Err(e) = self
            .registry
            .append_message(client_id, Message::system(content))
            .await
        {
            tracing::debug!("Escalation note not kept in session: {}", e);
        }
    }
}
