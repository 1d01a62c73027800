use crate::domain::Conversation;
use crate::storage::{ConversationStore, StoreError};
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use tracing::info;

/// One active conversation per principal, expired after a stretch of inactivity.
pub struct ConversationManager {
    store: Arc<dyn ConversationStore>,
    idle_timeout: Duration,
}

impl ConversationManager {
    pub fn new(store: Arc<dyn ConversationStore>, idle_timeout: Duration) -> Self {
        Self {
            store,
            idle_timeout,
        }
    }

    pub async fn get_or_create(&self, principal: &str) -> Result<Conversation, StoreError> {
        self.get_or_create_at(principal, Utc::now()).await
    }

    pub async fn get_or_create_at(
        &self,
        principal: &str,
        now: DateTime<Utc>,
    ) -> Result<Conversation, StoreError> {
        if let Some(mut active) = self.store.active_conversation(principal).await? {
            if !active.is_idle(self.idle_timeout, now) {
                active.last_activity = now.max(active.last_activity);
                self.store
                    .touch_activity(active.id, active.last_activity)
                    .await?;
                return Ok(active);
            }
            info!(conversation = active.id, principal, "conversation idle, starting a new one");
            self.store.deactivate(active.id).await?;
        }
        let created = self.store.create_conversation(principal, now).await?;
        info!(conversation = created.id, principal, "conversation started");
        Ok(created)
    }

    /// Deactivate the principal's conversation. Returns whether there was one.
    pub async fn reset(&self, principal: &str) -> Result<bool, StoreError> {
        match self.store.active_conversation(principal).await? {
            Some(active) => {
                self.store.deactivate(active.id).await?;
                info!(conversation = active.id, principal, "conversation reset");
                Ok(true)
            }
            None => Ok(false),
        }
    }
}
