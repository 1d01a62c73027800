//! Model traits

use super::types::{ModelError, ModelRequest, ModelResponse};
use async_trait::async_trait;

/// Trait for model provider implementations
#[async_trait]
pub trait ModelProvider: Send + Sync {
    /// Send the conversation so far and get the next assistant message
    async fn send(&self, request: ModelRequest) -> Result<ModelResponse, ModelError>;
}
