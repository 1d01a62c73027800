use crate::agent::AgentError;
use crate::approval::ApprovalError;
use crate::storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServiceError {
    #[error(transparent)]
    Agent(#[from] AgentError),
    #[error(transparent)]
    Approval(#[from] ApprovalError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl ServiceError {
    pub fn user_message(&self) -> String {
        match self {
            ServiceError::Agent(err) => err.user_message(),
            other => format!("Something went wrong: {other}"),
        }
    }
}
