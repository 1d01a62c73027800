use super::defaults::*;
use super::error::ConfigError;
use super::server::ServerConfig;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

/// Application configuration loaded from toolrelay.toml
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub model: ModelSettings,
    pub conversation: ConversationSettings,
    pub approval: ApprovalSettings,
    pub orchestrator: OrchestratorSettings,
    pub rpc: RpcSettings,
    pub tools: ToolSettings,
    pub servers: Vec<ServerConfig>,
}

impl AppConfig {
    /// Load configuration from a file path (or default path if None)
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        super::loader::load_config(path)
    }

    pub fn server(&self, name: &str) -> Option<&ServerConfig> {
        self.servers.iter().find(|server| server.name == name)
    }
}

/// `[model]`. `system_prompt` is the final prompt, instructions file included.
#[derive(Debug, Clone)]
pub struct ModelSettings {
    pub endpoint: String,
    pub model: String,
    pub max_tokens: u32,
    pub api_key: String,
    pub system_prompt: String,
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ConversationSettings {
    pub timeout_minutes: u64,
    pub max_messages: usize,
}

impl Default for ConversationSettings {
    fn default() -> Self {
        Self {
            timeout_minutes: DEFAULT_CONVERSATION_TIMEOUT_MINUTES,
            max_messages: DEFAULT_MAX_MESSAGES,
        }
    }
}

impl ConversationSettings {
    pub fn idle_timeout(&self) -> chrono::Duration {
        chrono::Duration::minutes(self.timeout_minutes as i64)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ApprovalSettings {
    pub timeout_seconds: u64,
    pub poll_interval_ms: u64,
    pub require_for_shell: bool,
}

impl Default for ApprovalSettings {
    fn default() -> Self {
        Self {
            timeout_seconds: DEFAULT_APPROVAL_TIMEOUT_SECONDS,
            poll_interval_ms: DEFAULT_APPROVAL_POLL_MS,
            require_for_shell: true,
        }
    }
}

impl ApprovalSettings {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct OrchestratorSettings {
    pub max_rounds: usize,
    pub working_notice: Option<String>,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            max_rounds: DEFAULT_MAX_ROUNDS,
            working_notice: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RpcSettings {
    pub init_timeout_seconds: u64,
    pub request_timeout_seconds: u64,
    pub max_scan_lines: usize,
}

impl Default for RpcSettings {
    fn default() -> Self {
        Self {
            init_timeout_seconds: DEFAULT_INIT_TIMEOUT_SECONDS,
            request_timeout_seconds: DEFAULT_REQUEST_TIMEOUT_SECONDS,
            max_scan_lines: DEFAULT_MAX_SCAN_LINES,
        }
    }
}

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct ToolSettings {
    pub shell_timeout_seconds: u64,
    pub read_max_chars: usize,
    pub bridge_max_chars: usize,
    pub search_endpoint: String,
}

impl Default for ToolSettings {
    fn default() -> Self {
        Self {
            shell_timeout_seconds: DEFAULT_SHELL_TIMEOUT_SECONDS,
            read_max_chars: DEFAULT_READ_MAX_CHARS,
            bridge_max_chars: DEFAULT_BRIDGE_MAX_CHARS,
            search_endpoint: DEFAULT_SEARCH_ENDPOINT.to_string(),
        }
    }
}

impl ToolSettings {
    pub fn shell_timeout(&self) -> Duration {
        Duration::from_secs(self.shell_timeout_seconds)
    }
}
