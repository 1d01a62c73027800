use crate::rpc::CodecError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConnectionError {
    #[error("MCP server '{server}' is not configured")]
    NotConfigured { server: String },
    #[error("failed to spawn MCP server '{server}': {source}")]
    Spawn {
        server: String,
        #[source]
        source: std::io::Error,
    },
    #[error("MCP server '{server}' failed to initialize: {reason}. Stderr: {diagnostics}")]
    Initialization {
        server: String,
        reason: String,
        diagnostics: String,
    },
    #[error("MCP server '{server}' timed out after {after_ms}ms on '{method}'. Stderr: {diagnostics}")]
    Timeout {
        server: String,
        method: String,
        after_ms: u128,
        diagnostics: String,
    },
    #[error("MCP server '{server}' transport error: {message}")]
    Transport { server: String, message: String },
    #[error("MCP server '{server}' sent an unreadable response: {source}")]
    Protocol {
        server: String,
        #[source]
        source: CodecError,
    },
    #[error("MCP server '{server}' returned JSON-RPC error {code}: {message}")]
    Rpc {
        server: String,
        code: i64,
        message: String,
    },
    #[error("MCP server '{server}' terminated unexpectedly. Stderr: {diagnostics}")]
    Terminated { server: String, diagnostics: String },
}

impl ConnectionError {
    pub fn server(&self) -> &str {
        match self {
            ConnectionError::NotConfigured { server }
            | ConnectionError::Spawn { server, .. }
            | ConnectionError::Initialization { server, .. }
            | ConnectionError::Timeout { server, .. }
            | ConnectionError::Transport { server, .. }
            | ConnectionError::Protocol { server, .. }
            | ConnectionError::Rpc { server, .. }
            | ConnectionError::Terminated { server, .. } => server,
        }
    }

    pub fn is_timeout(&self) -> bool {
        matches!(self, ConnectionError::Timeout { .. })
    }
}
