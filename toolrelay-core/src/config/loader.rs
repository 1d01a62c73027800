use super::app::{
    AppConfig, ApprovalSettings, ConversationSettings, ModelSettings, OrchestratorSettings,
    RpcSettings, ToolSettings,
};
use super::defaults::{
    API_KEY_ENV, DEFAULT_ENDPOINT, DEFAULT_MAX_TOKENS, DEFAULT_MODEL, DEFAULT_SYSTEM_PROMPT,
    INSTRUCTIONS_MAX_CHARS,
};
use super::error::ConfigError;
use super::server::{RawServer, ServerConfig, expand};
use super::settings::load_settings_servers;
use crate::constants::{CONFIG_PATH, ENV_PATH};
use dotenvy::from_filename;
use serde::Deserialize;
use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Once;
use tracing::{debug, warn};

static ENV_LOADER: Once = Once::new();

/// Raw configuration structure for deserialization from TOML
#[derive(Debug, Deserialize, Default)]
pub(super) struct RawConfig {
    #[serde(default)]
    pub model: RawModel,
    #[serde(default)]
    pub conversation: ConversationSettings,
    #[serde(default)]
    pub approval: ApprovalSettings,
    #[serde(default)]
    pub orchestrator: OrchestratorSettings,
    #[serde(default)]
    pub rpc: RpcSettings,
    #[serde(default)]
    pub tools: ToolSettings,
    #[serde(default)]
    pub servers: Vec<RawServer>,
    #[serde(default)]
    pub mcp_settings_path: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
pub(super) struct RawModel {
    pub endpoint: Option<String>,
    pub model: Option<String>,
    pub max_tokens: Option<u32>,
    pub api_key: Option<String>,
    pub system_prompt: Option<String>,
    pub instructions_path: Option<String>,
}

/// Ensures environment variables are loaded from config/.env
pub fn ensure_env_loaded() {
    ENV_LOADER.call_once(|| {
        let _ = from_filename(ENV_PATH);
    });
}

/// Load and validate configuration from a file path
pub fn load_config(path: Option<&Path>) -> Result<AppConfig, ConfigError> {
    ensure_env_loaded();
    let config_path = path.unwrap_or_else(|| Path::new(CONFIG_PATH));
    debug!(path = %config_path.display(), "Reading configuration file");

    let content = fs::read_to_string(config_path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            ConfigError::NotFound {
                path: config_path.to_path_buf(),
            }
        } else {
            ConfigError::Io {
                path: config_path.to_path_buf(),
                source,
            }
        }
    })?;

    parse_config(&content, config_path)
}

/// Parse configuration text; `path` is only used for error reporting.
pub fn parse_config(content: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let parsed: RawConfig = toml::from_str(content).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    let env_key = std::env::var(API_KEY_ENV).ok();
    validate_and_build(parsed, env_key)
}

fn validate_and_build(parsed: RawConfig, env_key: Option<String>) -> Result<AppConfig, ConfigError> {
    let api_key = parsed
        .model
        .api_key
        .as_deref()
        .map(expand)
        .filter(|key| !key.trim().is_empty())
        .or_else(|| env_key.filter(|key| !key.trim().is_empty()))
        .ok_or(ConfigError::MissingApiKey { env: API_KEY_ENV })?;

    check_positive("orchestrator.max_rounds", parsed.orchestrator.max_rounds as u64)?;
    check_positive(
        "conversation.max_messages",
        parsed.conversation.max_messages as u64,
    )?;
    check_positive(
        "conversation.timeout_minutes",
        parsed.conversation.timeout_minutes,
    )?;
    check_positive("approval.timeout_seconds", parsed.approval.timeout_seconds)?;
    check_positive("approval.poll_interval_ms", parsed.approval.poll_interval_ms)?;
    check_positive("rpc.init_timeout_seconds", parsed.rpc.init_timeout_seconds)?;
    check_positive(
        "rpc.request_timeout_seconds",
        parsed.rpc.request_timeout_seconds,
    )?;
    check_positive("rpc.max_scan_lines", parsed.rpc.max_scan_lines as u64)?;
    check_positive(
        "tools.shell_timeout_seconds",
        parsed.tools.shell_timeout_seconds,
    )?;

    let mut servers: Vec<ServerConfig> = Vec::new();
    let mut seen = HashSet::new();
    for raw in parsed.servers {
        if raw.name.trim().is_empty() {
            return Err(ConfigError::invalid("servers.name", "must not be empty"));
        }
        if raw.command.trim().is_empty() {
            return Err(ConfigError::invalid(
                "servers.command",
                format!("server '{}' has no command", raw.name),
            ));
        }
        if !seen.insert(raw.name.clone()) {
            return Err(ConfigError::DuplicateServer { name: raw.name });
        }
        servers.push(ServerConfig::from(raw));
    }

    if let Some(settings_path) = parsed.mcp_settings_path.as_deref() {
        let settings_path = PathBuf::from(expand(settings_path));
        for server in load_settings_servers(&settings_path)? {
            if seen.insert(server.name.clone()) {
                servers.push(server);
            } else {
                debug!(server = %server.name, "server already configured in TOML, ignoring settings entry");
            }
        }
    }

    let base_prompt = parsed
        .model
        .system_prompt
        .unwrap_or_else(|| DEFAULT_SYSTEM_PROMPT.to_string());
    let system_prompt = match parsed.model.instructions_path.as_deref() {
        Some(path) => compose_system_prompt(&base_prompt, &PathBuf::from(expand(path))),
        None => base_prompt,
    };

    let mut tools = parsed.tools;
    tools.search_endpoint = expand(&tools.search_endpoint);

    Ok(AppConfig {
        model: ModelSettings {
            endpoint: parsed
                .model
                .endpoint
                .unwrap_or_else(|| DEFAULT_ENDPOINT.to_string()),
            model: parsed
                .model
                .model
                .unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            max_tokens: parsed.model.max_tokens.unwrap_or(DEFAULT_MAX_TOKENS),
            api_key,
            system_prompt,
        },
        conversation: parsed.conversation,
        approval: parsed.approval,
        orchestrator: parsed.orchestrator,
        rpc: parsed.rpc,
        tools,
        servers,
    })
}

fn check_positive(field: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::invalid(field, "must be greater than zero"));
    }
    Ok(())
}

/// Append the instructions file to the base prompt; an unreadable file is skipped.
fn compose_system_prompt(base: &str, instructions_path: &Path) -> String {
    match fs::read_to_string(instructions_path) {
        Ok(content) => {
            let content = truncate_instructions(&content);
            format!(
                "{base}\n\n--- {} (user instructions) ---\n{content}",
                instructions_path
                    .file_name()
                    .map(|name| name.to_string_lossy().into_owned())
                    .unwrap_or_else(|| "instructions".to_string())
            )
        }
        Err(err) => {
            warn!(
                path = %instructions_path.display(),
                error = %err,
                "Could not load instructions file"
            );
            base.to_string()
        }
    }
}

fn truncate_instructions(content: &str) -> String {
    match content.char_indices().nth(INSTRUCTIONS_MAX_CHARS) {
        Some((cut, _)) => format!("{}\n\n... (truncated)", &content[..cut]),
        None => content.to_string(),
    }
}
