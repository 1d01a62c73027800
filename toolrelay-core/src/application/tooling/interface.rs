use async_trait::async_trait;
use serde_json::Value;

use super::error::ConnectionError;

/// A configured server as advertised to the model.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerSummary {
    pub name: String,
    pub description: String,
}

/// Request/response access to named MCP servers.
#[async_trait]
pub trait ToolServerInterface: Send + Sync {
    /// Configured servers in configuration order.
    fn servers(&self) -> Vec<ServerSummary>;

    /// Send one request to `server` and return its `result` member.
    async fn request(
        &self,
        server: &str,
        method: &str,
        params: Value,
    ) -> Result<Value, ConnectionError>;
}
