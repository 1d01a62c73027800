pub mod approval;
pub mod conversation;
pub mod types;

pub use approval::{ApprovalRequest, ApprovalStatus, Decision};
pub use conversation::{Conversation, ConversationId, NewTurnMessage, TurnMessage, TurnRole};
pub use types::{ContentBlock, MessageContent, MessageRole, ToolDefinition, WireMessage};
