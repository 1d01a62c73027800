use super::types::{ContentBlock, MessageContent};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};

pub type ConversationId = u64;

/// A conversation thread with one principal (phone number, terminal user, ...).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: ConversationId,
    pub principal: String,
    pub started_at: DateTime<Utc>,
    pub last_activity: DateTime<Utc>,
    pub active: bool,
}

impl Conversation {
    pub fn is_idle(&self, timeout: Duration, now: DateTime<Utc>) -> bool {
        now - self.last_activity > timeout
    }
}

/// Role of a persisted log entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnRole {
    User,
    Assistant,
    ToolResult,
}

impl TurnRole {
    pub fn as_str(self) -> &'static str {
        match self {
            TurnRole::User => "user",
            TurnRole::Assistant => "assistant",
            TurnRole::ToolResult => "tool_result",
        }
    }
}

/// A persisted, append-only conversation log entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TurnMessage {
    pub id: u64,
    pub conversation_id: ConversationId,
    pub role: TurnRole,
    pub content: MessageContent,
    pub created_at: DateTime<Utc>,
    pub tool_use_id: Option<String>,
    pub tool_name: Option<String>,
}

/// A log entry that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewTurnMessage {
    pub role: TurnRole,
    pub content: MessageContent,
    pub tool_use_id: Option<String>,
    pub tool_name: Option<String>,
}

impl NewTurnMessage {
    pub fn user(content: impl Into<MessageContent>) -> Self {
        Self {
            role: TurnRole::User,
            content: content.into(),
            tool_use_id: None,
            tool_name: None,
        }
    }

    pub fn assistant(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: TurnRole::Assistant,
            content: MessageContent::Blocks(blocks),
            tool_use_id: None,
            tool_name: None,
        }
    }

    pub fn tool_result(
        tool_use_id: impl Into<String>,
        tool_name: impl Into<String>,
        result: impl Into<String>,
    ) -> Self {
        Self {
            role: TurnRole::ToolResult,
            content: MessageContent::Text(result.into()),
            tool_use_id: Some(tool_use_id.into()),
            tool_name: Some(tool_name.into()),
        }
    }
}
