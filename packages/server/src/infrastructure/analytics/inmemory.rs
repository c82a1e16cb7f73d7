//! In-process analytics store.
//!
//! Stands in for the external analytics database so the gateway runs
//! standalone. Records are lost on restart.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::Mutex;

use crate::domain::{
    Analytics, CollaboratorError, FeedbackCounts, FeedbackType, MessageId, OwnedResource,
    QuestionRecord,
};

/// A question together with what happened to it afterwards
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AnalyticsEntry {
    pub question: QuestionRecord,
    pub ai_response: Option<String>,
    pub feedback: FeedbackCounts,
}

#[derive(Default)]
pub struct InMemoryAnalytics {
    entries: Mutex<HashMap<MessageId, AnalyticsEntry>>,
}

impl InMemoryAnalytics {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn entry(&self, message_id: &MessageId) -> Option<AnalyticsEntry> {
        self.entries.lock().await.get(message_id).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }
}

#[async_trait]
impl Analytics for InMemoryAnalytics {
    async fn store_question(&self, record: QuestionRecord) -> Result<(), CollaboratorError> {
        let mut entries = self.entries.lock().await;
        entries.insert(
            record.message_id.clone(),
            AnalyticsEntry {
                question: record,
                ai_response: None,
                feedback: FeedbackCounts::default(),
            },
        );
        Ok(())
    }

    async fn update_ai_response(
        &self,
        message_id: &MessageId,
        response: &str,
    ) -> Result<(), CollaboratorError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(message_id)
            .ok_or_else(|| CollaboratorError::NotFound(message_id.to_string()))?;
        entry.ai_response = Some(response.to_string());
        Ok(())
    }

    async fn update_feedback(
        &self,
        message_id: &MessageId,
        feedback: FeedbackType,
    ) -> Result<FeedbackCounts, CollaboratorError> {
        let mut entries = self.entries.lock().await;
        let entry = entries
            .get_mut(message_id)
            .ok_or_else(|| CollaboratorError::NotFound(message_id.to_string()))?;
        match feedback {
            FeedbackType::Positive => entry.feedback.positive += 1,
            FeedbackType::Negative => entry.feedback.negative += 1,
        }
        Ok(entry.feedback)
    }
}

#[async_trait]
impl OwnedResource for InMemoryAnalytics {
    fn name(&self) -> &str {
        "analytics"
    }

    async fn release(&self) -> Result<(), CollaboratorError> {
        let mut entries = self.entries.lock().await;
        tracing::debug!("Dropping {} analytics records", entries.len());
        entries.clear();
        Ok(())
    }
}
