//! Import of `mcpServers` maps from editor-style JSON settings files.

use super::error::ConfigError;
use super::server::{RawServer, ServerConfig};
use serde::Deserialize;
use std::collections::{BTreeMap, HashMap};
use std::fs;
use std::io;
use std::path::Path;
use tracing::{debug, warn};

#[derive(Debug, Default, Deserialize)]
struct SettingsFile {
    #[serde(default, rename = "mcpServers")]
    mcp_servers: BTreeMap<String, SettingsEntry>,
}

#[derive(Debug, Deserialize)]
struct SettingsEntry {
    #[serde(default)]
    command: String,
    #[serde(default)]
    args: Vec<String>,
    #[serde(default)]
    env: HashMap<String, String>,
    #[serde(default)]
    description: Option<String>,
}

/// Read servers from a settings file. A missing file yields no servers.
pub fn load_settings_servers(path: &Path) -> Result<Vec<ServerConfig>, ConfigError> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            warn!(path = %path.display(), "MCP settings file not found, skipping");
            return Ok(Vec::new());
        }
        Err(source) => {
            return Err(ConfigError::Io {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_settings(&content, path)
}

pub(crate) fn parse_settings(content: &str, path: &Path) -> Result<Vec<ServerConfig>, ConfigError> {
    let parsed: SettingsFile = serde_json::from_str(content).map_err(|source| ConfigError::Json {
        path: path.to_path_buf(),
        source,
    })?;

    let servers: Vec<ServerConfig> = parsed
        .mcp_servers
        .into_iter()
        .filter_map(|(name, entry)| {
            if entry.command.trim().is_empty() {
                warn!(server = %name, "settings entry has no command, skipping");
                return None;
            }
            Some(ServerConfig::from(RawServer {
                name,
                command: entry.command,
                args: entry.args,
                env: entry.env,
                workdir: None,
                description: entry.description,
            }))
        })
        .collect();

    debug!(
        path = %path.display(),
        count = servers.len(),
        "Loaded MCP servers from settings"
    );
    Ok(servers)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_mcp_servers_map() {
        let json = r#"{
            "theme": "dark",
            "mcpServers": {
                "sheets": {"command": "npx", "args": ["-y", "sheets-mcp"], "description": "Spreadsheets"},
                "mail": {"command": "uvx", "env": {"TOKEN": "abc"}},
                "broken": {"args": []}
            }
        }"#;
        let servers = parse_settings(json, Path::new("settings.json")).expect("parse");

        let names: Vec<&str> = servers.iter().map(|s| s.name.as_str()).collect();
        assert_eq!(names, vec!["mail", "sheets"]);
        assert_eq!(servers[0].env.get("TOKEN").map(String::as_str), Some("abc"));
        assert_eq!(servers[0].description, "mail MCP server");
        assert_eq!(servers[1].description, "Spreadsheets");
        assert_eq!(servers[1].args, vec!["-y", "sheets-mcp"]);
    }

    #[test]
    fn file_without_servers_is_empty() {
        let servers = parse_settings("{}", Path::new("settings.json")).expect("parse");
        assert!(servers.is_empty());
    }

    #[test]
    fn malformed_json_is_reported() {
        let result = parse_settings("{not json", Path::new("settings.json"));
        assert!(matches!(result, Err(ConfigError::Json { .. })));
    }

    #[test]
    fn missing_file_yields_no_servers() {
        let dir = tempfile::tempdir().expect("tempdir");
        let servers = load_settings_servers(&dir.path().join("absent.json")).expect("load");
        assert!(servers.is_empty());
    }
}
