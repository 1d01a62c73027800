use crate::channel::ChannelError;
use crate::storage::StoreError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApprovalError {
    #[error("approval storage failed: {0}")]
    Store(#[from] StoreError),
    #[error("could not notify approver: {0}")]
    Channel(#[from] ChannelError),
}
