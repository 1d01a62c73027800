//! Persistent MCP stdio server connections
//!
//! One [`ServerConnection`] per configured server, created lazily by the
//! [`ConnectionPool`] and kept alive for the life of the process.

mod connection;
mod diagnostics;
mod error;
mod interface;
mod pool;

pub use connection::{ConnectionSettings, ConnectionState, ServerConnection};
pub use diagnostics::StderrBuffer;
pub use error::ConnectionError;
pub use interface::{ServerSummary, ToolServerInterface};
pub use pool::ConnectionPool;
