use crate::domain::ConversationId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("conversation {0} does not exist")]
    ConversationNotFound(ConversationId),
    #[error("approval '{0}' already exists")]
    DuplicateApproval(String),
    #[error("storage backend failure: {0}")]
    Backend(String),
}
