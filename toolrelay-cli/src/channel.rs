use async_trait::async_trait;
use std::time::Duration;
use tokio::io::{self, AsyncWriteExt, Stdout};
use tokio::sync::Mutex;
use toolrelay_core::channel::{Channel, ChannelError};

/// Delivers outbound messages to the terminal.
pub struct ConsoleChannel {
    out: Mutex<Stdout>,
    approval_timeout: Duration,
}

impl ConsoleChannel {
    pub fn new(approval_timeout: Duration) -> Self {
        Self {
            out: Mutex::new(io::stdout()),
            approval_timeout,
        }
    }

    async fn write(&self, principal: &str, text: &str) -> Result<(), ChannelError> {
        let mut out = self.out.lock().await;
        let written = async {
            out.write_all(text.as_bytes()).await?;
            out.write_all(b"\n").await?;
            out.flush().await
        };
        written
            .await
            .map_err(|err| ChannelError::delivery(principal, err.to_string()))
    }
}

#[async_trait]
impl Channel for ConsoleChannel {
    async fn send_text(&self, principal: &str, text: &str) -> Result<(), ChannelError> {
        self.write(principal, &format!("\nassistant> {text}")).await
    }

    async fn send_approval_request(
        &self,
        principal: &str,
        description: &str,
        token: &str,
    ) -> Result<(), ChannelError> {
        let minutes = self.approval_timeout.as_secs().div_ceil(60);
        let body = format!(
            "\n\u{1f510} APPROVAL REQUIRED\n\n{description}\n\n\
             Reply with:\n  APPROVE {token}\n  DENY {token}\n\n\
             \u{23f1} Expires in {minutes} minutes"
        );
        self.write(principal, &body).await
    }

    async fn send_media(
        &self,
        principal: &str,
        media_url: &str,
        caption: &str,
    ) -> Result<(), ChannelError> {
        let body = if caption.is_empty() {
            format!("\n[media] {media_url}")
        } else {
            format!("\n[media] {media_url}\n{caption}")
        };
        self.write(principal, &body).await
    }
}
