use thiserror::Error;

/// Failures that never leave the capability layer as errors; they are rendered into
/// the textual tool result so the model can react.
#[derive(Debug, Error)]
pub enum CapabilityError {
    #[error("unknown tool '{name}'")]
    UnknownCapability { name: String },
    #[error("invalid input for '{tool}': {source}")]
    InvalidInput {
        tool: &'static str,
        #[source]
        source: serde_json::Error,
    },
}

impl CapabilityError {
    /// Text fed back to the model in place of a result.
    pub fn as_tool_result(&self) -> String {
        format!("Error: {self}")
    }
}
