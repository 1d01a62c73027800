//! Application constants
//!
//! Single source of truth for paths and fixed user-facing texts.

/// Default configuration file path
pub const CONFIG_PATH: &str = "config/toolrelay.toml";

/// Default environment file path
pub const ENV_PATH: &str = "config/.env";

/// MCP protocol revision announced during the initialize handshake
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Result fed back to the model when a human refuses (or ignores) an approval
pub const DENIED_RESULT: &str = "Denied by user.";

/// Sent when a turn hits the round ceiling
pub const MAX_ROUNDS_MESSAGE: &str = "Reached max tool turns. Please try a simpler request.";

/// Sent when a principal writes while its previous turn is still running
pub const BUSY_MESSAGE: &str = "Please wait for the previous request to finish...";

/// Sent after `/reset`
pub const RESET_MESSAGE: &str = "Conversation reset. Starting fresh!";
