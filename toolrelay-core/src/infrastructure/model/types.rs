//! Model types - Request, Response, and Error types

use crate::types::{ContentBlock, ToolDefinition, WireMessage};
use reqwest::StatusCode;
use serde_json::Value;
use thiserror::Error;

/// Model request for one round
#[derive(Debug, Clone)]
pub struct ModelRequest {
    pub model: String,
    pub system: String,
    pub max_tokens: u32,
    pub messages: Vec<WireMessage>,
    pub tools: Vec<ToolDefinition>,
}

/// Why the model stopped producing output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StopReason {
    EndTurn,
    ToolUse,
    Other(String),
}

impl StopReason {
    pub fn from_api(value: &str) -> Self {
        match value {
            "end_turn" => StopReason::EndTurn,
            "tool_use" => StopReason::ToolUse,
            other => StopReason::Other(other.to_string()),
        }
    }
}

/// A tool invocation requested by the model
#[derive(Debug, Clone, PartialEq)]
pub struct ToolInvocation {
    pub id: String,
    pub name: String,
    pub input: Value,
}

/// Model response for one round
#[derive(Debug, Clone)]
pub struct ModelResponse {
    pub stop_reason: StopReason,
    pub content: Vec<ContentBlock>,
}

impl ModelResponse {
    pub fn new(stop_reason: StopReason, content: Vec<ContentBlock>) -> Self {
        Self {
            stop_reason,
            content,
        }
    }

    pub fn text(&self) -> String {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::Text { text } => Some(text.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Invocations in the order the model emitted them.
    pub fn invocations(&self) -> Vec<ToolInvocation> {
        self.content
            .iter()
            .filter_map(|block| match block {
                ContentBlock::ToolUse { id, name, input } => Some(ToolInvocation {
                    id: id.clone(),
                    name: name.clone(),
                    input: input.clone(),
                }),
                _ => None,
            })
            .collect()
    }
}

/// Model errors
#[derive(Debug, Error)]
pub enum ModelError {
    #[error("provider '{provider}' requires an API key")]
    MissingApiKey { provider: String },
    #[error("network error calling provider '{provider}': {source}")]
    Network {
        provider: String,
        #[source]
        source: reqwest::Error,
    },
    #[error("provider '{provider}' returned HTTP {status}: {body}")]
    Api {
        provider: String,
        status: u16,
        body: String,
    },
    #[error("provider '{provider}' returned invalid response: {reason}")]
    InvalidResponse { provider: String, reason: String },
}

impl ModelError {
    pub fn missing_api_key(provider: impl Into<String>) -> Self {
        Self::MissingApiKey {
            provider: provider.into(),
        }
    }

    pub fn network(provider: impl Into<String>, source: reqwest::Error) -> Self {
        Self::Network {
            provider: provider.into(),
            source,
        }
    }

    pub fn api(provider: impl Into<String>, status: StatusCode, body: impl Into<String>) -> Self {
        Self::Api {
            provider: provider.into(),
            status: status.as_u16(),
            body: body.into(),
        }
    }

    pub fn invalid_response(provider: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::InvalidResponse {
            provider: provider.into(),
            reason: reason.into(),
        }
    }

    /// Short explanation suitable for the end user
    pub fn user_message(&self) -> String {
        match self {
            ModelError::MissingApiKey { provider } => {
                format!("The model provider '{provider}' has no API key configured.")
            }
            ModelError::Network { provider, source } => {
                if source.is_connect() {
                    format!("Could not connect to the model provider '{provider}'.")
                } else if source.is_timeout() {
                    format!("The request to '{provider}' timed out.")
                } else {
                    format!("Network error while talking to '{provider}'.")
                }
            }
            ModelError::Api { provider, status, .. } => match *status {
                401 | 403 => format!("The model provider '{provider}' rejected the API key."),
                429 => format!("The model provider '{provider}' is rate limiting requests."),
                500..=599 => format!("The model provider '{provider}' is currently unavailable."),
                other => format!("The request to '{provider}' failed with HTTP {other}."),
            },
            ModelError::InvalidResponse { provider, .. } => {
                format!("The response from '{provider}' could not be understood.")
            }
        }
    }
}
