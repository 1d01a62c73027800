use crate::config::AppConfig;
use crate::config::defaults::{DEFAULT_MAX_ROUNDS, DEFAULT_MAX_TOKENS, DEFAULT_MODEL};
use serde::Serialize;
use serde_json::Value;

#[derive(Debug, Clone)]
pub struct OrchestratorOptions {
    pub model: String,
    pub system: String,
    pub max_tokens: u32,
    /// Model calls allowed per turn.
    pub max_rounds: usize,
    /// Sent once, on the first tool round of a turn.
    pub working_notice: Option<String>,
}

impl OrchestratorOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            model: config.model.model.clone(),
            system: config.model.system_prompt.clone(),
            max_tokens: config.model.max_tokens,
            max_rounds: config.orchestrator.max_rounds,
            working_notice: config.orchestrator.working_notice.clone(),
        }
    }
}

impl Default for OrchestratorOptions {
    fn default() -> Self {
        Self {
            model: DEFAULT_MODEL.to_string(),
            system: String::new(),
            max_tokens: DEFAULT_MAX_TOKENS,
            max_rounds: DEFAULT_MAX_ROUNDS,
            working_notice: None,
        }
    }
}

/// How a turn ended.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TurnStatus {
    Completed,
    MaxRoundsExceeded,
    UnexpectedStop(String),
}

#[derive(Debug, Clone, Serialize)]
pub struct ToolStep {
    pub round: usize,
    pub tool: String,
    pub tool_use_id: String,
    pub input: Value,
    /// False when approval was required and not granted.
    pub executed: bool,
    pub output: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    pub status: TurnStatus,
    /// Text sent to the principal as the final word of the turn.
    pub reply: String,
    pub rounds: usize,
    pub steps: Vec<ToolStep>,
}
