use serde::Deserialize;
use std::collections::HashMap;
use std::path::PathBuf;

/// Launch description of one external MCP stdio server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub name: String,
    pub command: PathBuf,
    pub args: Vec<String>,
    pub env: HashMap<String, String>,
    pub workdir: Option<PathBuf>,
    pub description: String,
}

impl ServerConfig {
    pub fn new(name: impl Into<String>, command: impl Into<PathBuf>) -> Self {
        let name = name.into();
        Self {
            description: default_description(&name),
            name,
            command: command.into(),
            args: Vec::new(),
            env: HashMap::new(),
            workdir: None,
        }
    }

    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }
}

#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RawServer {
    pub(crate) name: String,
    pub(crate) command: String,
    #[serde(default)]
    pub(crate) args: Vec<String>,
    #[serde(default)]
    pub(crate) env: HashMap<String, String>,
    #[serde(default)]
    pub(crate) workdir: Option<String>,
    #[serde(default)]
    pub(crate) description: Option<String>,
}

pub(crate) fn expand(value: &str) -> String {
    shellexpand::full(value)
        .map(|cow| cow.into_owned())
        .unwrap_or_else(|_| value.to_string())
}

fn default_description(name: &str) -> String {
    format!("{name} MCP server")
}

impl From<RawServer> for ServerConfig {
    fn from(raw: RawServer) -> Self {
        let description = raw
            .description
            .filter(|text| !text.trim().is_empty())
            .unwrap_or_else(|| default_description(&raw.name));

        Self {
            command: PathBuf::from(expand(&raw.command)),
            args: raw.args.iter().map(|arg| expand(arg)).collect(),
            env: raw
                .env
                .into_iter()
                .map(|(key, value)| (key, expand(&value)))
                .collect(),
            workdir: raw.workdir.map(|dir| PathBuf::from(expand(&dir))),
            name: raw.name,
            description,
        }
    }
}
