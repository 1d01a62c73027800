use thiserror::Error;

#[derive(Debug, Error)]
pub enum CodecError {
    #[error("failed to encode JSON-RPC message: {0}")]
    Encode(#[source] serde_json::Error),
    #[error("stdio transport error: {0}")]
    Io(#[from] std::io::Error),
    #[error("server closed connection (EOF)")]
    Eof,
    #[error("no JSON-RPC response after scanning {scanned} lines")]
    NoResponse { scanned: usize },
    #[error("framed message body is not valid JSON: {0}")]
    InvalidBody(#[source] serde_json::Error),
}

impl CodecError {
    /// The stream is gone; the peer process has exited or closed stdout.
    pub fn is_disconnect(&self) -> bool {
        matches!(self, CodecError::Eof | CodecError::Io(_))
    }
}
