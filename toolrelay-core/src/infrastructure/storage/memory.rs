use super::error::StoreError;
use super::traits::{ApprovalStore, ConversationStore};
use crate::domain::{
    ApprovalRequest, ApprovalStatus, Conversation, ConversationId, NewTurnMessage, TurnMessage,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use tokio::sync::Mutex;

/// In-process store for conversations, message logs and approvals.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

#[derive(Default)]
struct MemoryState {
    next_conversation: ConversationId,
    next_message: u64,
    conversations: HashMap<ConversationId, Conversation>,
    messages: HashMap<ConversationId, Vec<TurnMessage>>,
    approvals: HashMap<String, ApprovalRequest>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl ConversationStore for MemoryStore {
    async fn active_conversation(
        &self,
        principal: &str,
    ) -> Result<Option<Conversation>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .conversations
            .values()
            .filter(|conversation| conversation.active && conversation.principal == principal)
            .max_by_key(|conversation| conversation.id)
            .cloned())
    }

    async fn create_conversation(
        &self,
        principal: &str,
        now: DateTime<Utc>,
    ) -> Result<Conversation, StoreError> {
        let mut state = self.state.lock().await;
        state.next_conversation += 1;
        let conversation = Conversation {
            id: state.next_conversation,
            principal: principal.to_string(),
            started_at: now,
            last_activity: now,
            active: true,
        };
        state
            .conversations
            .insert(conversation.id, conversation.clone());
        state.messages.insert(conversation.id, Vec::new());
        Ok(conversation)
    }

    async fn deactivate(&self, id: ConversationId) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .get_mut(&id)
            .ok_or(StoreError::ConversationNotFound(id))?;
        conversation.active = false;
        Ok(())
    }

    async fn append(&self, id: ConversationId, message: NewTurnMessage) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let now = Utc::now();
        let conversation = state
            .conversations
            .get_mut(&id)
            .ok_or(StoreError::ConversationNotFound(id))?;
        conversation.last_activity = now;

        state.next_message += 1;
        let entry = TurnMessage {
            id: state.next_message,
            conversation_id: id,
            role: message.role,
            content: message.content,
            created_at: now,
            tool_use_id: message.tool_use_id,
            tool_name: message.tool_name,
        };
        state.messages.entry(id).or_default().push(entry);
        Ok(())
    }

    async fn read_all(&self, id: ConversationId) -> Result<Vec<TurnMessage>, StoreError> {
        let state = self.state.lock().await;
        if !state.conversations.contains_key(&id) {
            return Err(StoreError::ConversationNotFound(id));
        }
        Ok(state.messages.get(&id).cloned().unwrap_or_default())
    }

    async fn touch_activity(
        &self,
        id: ConversationId,
        now: DateTime<Utc>,
    ) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        let conversation = state
            .conversations
            .get_mut(&id)
            .ok_or(StoreError::ConversationNotFound(id))?;
        conversation.last_activity = now;
        Ok(())
    }
}

#[async_trait]
impl ApprovalStore for MemoryStore {
    async fn insert(&self, request: ApprovalRequest) -> Result<(), StoreError> {
        let mut state = self.state.lock().await;
        if state.approvals.contains_key(&request.token) {
            return Err(StoreError::DuplicateApproval(request.token));
        }
        state.approvals.insert(request.token.clone(), request);
        Ok(())
    }

    async fn get(&self, token: &str) -> Result<Option<ApprovalRequest>, StoreError> {
        let state = self.state.lock().await;
        Ok(state.approvals.get(token).cloned())
    }

    async fn transition(
        &self,
        token: &str,
        expected: ApprovalStatus,
        next: ApprovalStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError> {
        let mut state = self.state.lock().await;
        match state.approvals.get_mut(token) {
            Some(record) if record.status == expected => {
                record.status = next;
                record.decided_at = Some(at);
                Ok(true)
            }
            _ => Ok(false),
        }
    }

    async fn pending(&self) -> Result<Vec<ApprovalRequest>, StoreError> {
        let state = self.state.lock().await;
        Ok(state
            .approvals
            .values()
            .filter(|record| record.status == ApprovalStatus::Pending)
            .cloned()
            .collect())
    }
}
