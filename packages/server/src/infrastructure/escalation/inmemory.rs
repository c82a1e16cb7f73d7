//! In-process escalation store.

use async_trait::async_trait;
use tokio::sync::Mutex;
use uuid::Uuid;

use crate::domain::{CollaboratorError, EscalationRequest, EscalationStore, OwnedResource};

#[derive(Default)]
pub struct InMemoryEscalationStore {
    escalations: Mutex<Vec<(String, EscalationRequest)>>,
}

impl InMemoryEscalationStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn escalations(&self) -> Vec<(String, EscalationRequest)> {
        self.escalations.lock().await.clone()
    }
}

#[async_trait]
impl EscalationStore for InMemoryEscalationStore {
    async fn create_escalation(
        &self,
        request: EscalationRequest,
    ) -> Result<String, CollaboratorError> {
        let id = format!("esc_{}", Uuid::new_v4().simple());
        tracing::info!(
            "Escalation '{}' created for user '{}' (priority: {})",
            id,
            request.user_id,
            request.priority.as_str()
        );
        self.escalations.lock().await.push((id.clone(), request));
        Ok(id)
    }
}

#[async_trait]
impl OwnedResource for InMemoryEscalationStore {
    fn name(&self) -> &str {
        "escalation-store"
    }

    async fn release(&self) -> Result<(), CollaboratorError> {
        self.escalations.lock().await.clear();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ContactNumber, EscalationReason, Priority};

    #[tokio::test]
    async fn test_create_escalation_assigns_unique_ids() {
        // テスト項目: エスカレーションごとに一意の ID が払い出される
        // given (前提条件):
        let store = InMemoryEscalationStore::new();
        let request = EscalationRequest {
            user_id: "u-1".to_string(),
            reason: EscalationReason::new("chest pain").unwrap(),
            contact: ContactNumber::new("0312345678").unwrap(),
            priority: Priority::Urgent,
        };

        // when (操作):
        let first = store.create_escalation(request.clone()).await.unwrap();
        let second = store.create_escalation(request).await.unwrap();

        // then (期待する結果):
        assert_ne!(first, second);
        assert!(first.starts_with("esc_"));
        assert_eq!(store.escalations().await.len(), 2);
    }
}
