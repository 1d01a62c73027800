use crate::model::ModelError;
use crate::storage::StoreError;
use thiserror::Error;

/// Failures that end a turn early. Tool failures never show up here; they are fed
/// back to the model as text.
#[derive(Debug, Error)]
pub enum AgentError {
    #[error(transparent)]
    Model(#[from] ModelError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl AgentError {
    /// Apology sent to the principal when the turn cannot continue.
    pub fn user_message(&self) -> String {
        let detail = match self {
            AgentError::Model(err) => err.user_message(),
            AgentError::Store(err) => err.to_string(),
        };
        format!("Something went wrong: {detail}")
    }
}
