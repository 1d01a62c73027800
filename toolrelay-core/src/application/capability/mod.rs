//! Capabilities the model can invoke
//!
//! A closed set of tools behind [`Capability`]. Every tool answers with text, failures
//! included, so a broken tool never ends a turn.

mod bridge;
mod error;
mod file;
mod media;
mod registry;
mod search;
mod shell;

pub use bridge::BridgeTool;
pub use error::CapabilityError;
pub use file::{ReadFileTool, WriteFileTool};
pub use media::{MediaMarker, SendMediaTool};
pub use registry::{Capability, CapabilityRegistry};
pub use search::WebSearchTool;
pub use shell::{ShellTool, is_destructive};

use serde::de::DeserializeOwned;
use serde_json::Value;

/// Cut `text` to at most `max_chars` characters. Returns the prefix and whether it was cut.
pub(crate) fn truncate_chars(text: &str, max_chars: usize) -> (&str, bool) {
    match text.char_indices().nth(max_chars) {
        Some((cut, _)) => (&text[..cut], true),
        None => (text, false),
    }
}

pub(crate) fn parse_input<T: DeserializeOwned>(
    tool: &'static str,
    input: Value,
) -> Result<T, CapabilityError> {
    serde_json::from_value(input).map_err(|source| CapabilityError::InvalidInput { tool, source })
}
