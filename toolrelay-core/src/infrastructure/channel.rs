//! Outbound messaging seam
//!
//! Whatever carries text to the human (a chat network, a terminal) implements
//! [`Channel`]. Chunking, media upload and delivery retries are the channel's business.

use async_trait::async_trait;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ChannelError {
    #[error("failed to deliver message to '{principal}': {reason}")]
    Delivery { principal: String, reason: String },
}

impl ChannelError {
    pub fn delivery(principal: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::Delivery {
            principal: principal.into(),
            reason: reason.into(),
        }
    }
}

#[async_trait]
pub trait Channel: Send + Sync {
    async fn send_text(&self, principal: &str, text: &str) -> Result<(), ChannelError>;

    /// Ask the human to approve an invocation; they answer with the token.
    async fn send_approval_request(
        &self,
        principal: &str,
        description: &str,
        token: &str,
    ) -> Result<(), ChannelError>;

    async fn send_media(
        &self,
        principal: &str,
        media_url: &str,
        caption: &str,
    ) -> Result<(), ChannelError>;
}
