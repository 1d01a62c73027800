use super::error::StoreError;
use crate::domain::{
    ApprovalRequest, ApprovalStatus, Conversation, ConversationId, NewTurnMessage, TurnMessage,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};

/// Storage for conversations and their append-only message logs.
#[async_trait]
pub trait ConversationStore: Send + Sync {
    async fn active_conversation(&self, principal: &str)
    -> Result<Option<Conversation>, StoreError>;

    async fn create_conversation(
        &self,
        principal: &str,
        now: DateTime<Utc>,
    ) -> Result<Conversation, StoreError>;

    async fn deactivate(&self, id: ConversationId) -> Result<(), StoreError>;

    /// Append to the log and bump the conversation's last activity.
    async fn append(&self, id: ConversationId, message: NewTurnMessage) -> Result<(), StoreError>;

    /// Entries in creation order.
    async fn read_all(&self, id: ConversationId) -> Result<Vec<TurnMessage>, StoreError>;

    async fn touch_activity(&self, id: ConversationId, now: DateTime<Utc>)
    -> Result<(), StoreError>;
}

/// Storage for approval requests.
#[async_trait]
pub trait ApprovalStore: Send + Sync {
    async fn insert(&self, request: ApprovalRequest) -> Result<(), StoreError>;

    async fn get(&self, token: &str) -> Result<Option<ApprovalRequest>, StoreError>;

    /// Atomically move `token` from `expected` to `next`.
    ///
    /// Returns `false` (and changes nothing) when the record is missing or no longer in
    /// `expected`; this is what makes a concurrent decision and timeout sweep safe.
    async fn transition(
        &self,
        token: &str,
        expected: ApprovalStatus,
        next: ApprovalStatus,
        at: DateTime<Utc>,
    ) -> Result<bool, StoreError>;

    async fn pending(&self) -> Result<Vec<ApprovalRequest>, StoreError>;
}
