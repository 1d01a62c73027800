use super::bridge::BridgeTool;
use super::error::CapabilityError;
use super::file::{ReadFileTool, WriteFileTool};
use super::media::SendMediaTool;
use super::search::WebSearchTool;
use super::shell::ShellTool;
use super::truncate_chars;
use crate::config::AppConfig;
use crate::tooling::ToolServerInterface;
use crate::types::ToolDefinition;
use serde_json::Value;
use std::sync::Arc;
use tracing::{debug, warn};

const DESCRIPTION_INPUT_CHARS: usize = 200;

/// One invocable tool.
#[derive(Clone)]
pub enum Capability {
    Shell(ShellTool),
    ReadFile(ReadFileTool),
    WriteFile(WriteFileTool),
    WebSearch(WebSearchTool),
    SendMedia(SendMediaTool),
    RemoteBridge(BridgeTool),
}

impl Capability {
    pub fn name(&self) -> &'static str {
        match self {
            Capability::Shell(_) => ShellTool::NAME,
            Capability::ReadFile(_) => ReadFileTool::NAME,
            Capability::WriteFile(_) => WriteFileTool::NAME,
            Capability::WebSearch(_) => WebSearchTool::NAME,
            Capability::SendMedia(_) => SendMediaTool::NAME,
            Capability::RemoteBridge(_) => BridgeTool::NAME,
        }
    }

    pub fn describe(&self) -> ToolDefinition {
        let (description, input_schema) = match self {
            Capability::Shell(tool) => (tool.description(), tool.input_schema()),
            Capability::ReadFile(tool) => (tool.description(), tool.input_schema()),
            Capability::WriteFile(tool) => (tool.description().to_string(), tool.input_schema()),
            Capability::WebSearch(tool) => (tool.description().to_string(), tool.input_schema()),
            Capability::SendMedia(tool) => (tool.description().to_string(), tool.input_schema()),
            Capability::RemoteBridge(tool) => (tool.description(), tool.input_schema()),
        };
        ToolDefinition {
            name: self.name().to_string(),
            description,
            input_schema,
        }
    }

    /// Static policy, before looking at the input.
    pub fn always_needs_approval(&self) -> bool {
        matches!(self, Capability::Shell(_) | Capability::WriteFile(_))
    }

    /// Whether this particular invocation must be approved by a human.
    pub fn needs_approval(&self, input: &Value) -> bool {
        match self {
            Capability::Shell(tool) => tool.needs_approval(input),
            _ => self.always_needs_approval(),
        }
    }

    /// Run the tool. Failures come back as text.
    pub async fn execute(&self, input: Value) -> String {
        match self {
            Capability::Shell(tool) => tool.execute(input).await,
            Capability::ReadFile(tool) => tool.execute(input).await,
            Capability::WriteFile(tool) => tool.execute(input).await,
            Capability::WebSearch(tool) => tool.execute(input).await,
            Capability::SendMedia(tool) => tool.execute(input).await,
            Capability::RemoteBridge(tool) => tool.execute(input).await,
        }
    }

    /// Human-readable summary shown in approval requests.
    pub fn describe_invocation(&self, input: &Value) -> String {
        describe_invocation(self.name(), input)
    }
}

pub(crate) fn describe_invocation(name: &str, input: &Value) -> String {
    let field = |key: &str| {
        input
            .get(key)
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    match name {
        ShellTool::NAME => format!("Run command:\n{}", field("command").unwrap_or_else(|| "?".into())),
        WriteFileTool::NAME => format!(
            "Write file:\n{} ({} chars)",
            field("file_path").unwrap_or_else(|| "?".into()),
            field("content").map(|c| c.chars().count()).unwrap_or(0)
        ),
        other => {
            let serialized = input.to_string();
            let (head, _) = truncate_chars(&serialized, DESCRIPTION_INPUT_CHARS);
            format!("Tool: {other}\n{head}")
        }
    }
}

/// The fixed set of capabilities for one orchestrator.
#[derive(Clone, Default)]
pub struct CapabilityRegistry {
    capabilities: Vec<Capability>,
}

impl CapabilityRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a capability. A later one with the same name replaces the earlier.
    pub fn with(mut self, capability: Capability) -> Self {
        self.capabilities
            .retain(|existing| existing.name() != capability.name());
        self.capabilities.push(capability);
        self
    }

    /// The standard table: shell, files, search, media and (when servers exist) the bridge.
    pub fn from_config(config: &AppConfig, servers: Arc<dyn ToolServerInterface>) -> Self {
        let mut registry = Self::new()
            .with(Capability::Shell(ShellTool::new(
                config.tools.shell_timeout(),
                config.approval.require_for_shell,
            )))
            .with(Capability::ReadFile(ReadFileTool::new(
                config.tools.read_max_chars,
            )))
            .with(Capability::WriteFile(WriteFileTool))
            .with(Capability::WebSearch(WebSearchTool::new(
                config.tools.search_endpoint.clone(),
            )))
            .with(Capability::SendMedia(SendMediaTool));
        if !servers.servers().is_empty() {
            registry = registry.with(Capability::RemoteBridge(BridgeTool::new(
                servers,
                config.tools.bridge_max_chars,
            )));
        }
        registry
    }

    pub fn get(&self, name: &str) -> Option<&Capability> {
        self.capabilities.iter().find(|cap| cap.name() == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.capabilities.iter().map(Capability::name).collect()
    }

    pub fn definitions(&self) -> Vec<ToolDefinition> {
        self.capabilities.iter().map(Capability::describe).collect()
    }

    /// Unknown tools never need approval; executing them yields an error text.
    pub fn needs_approval(&self, name: &str, input: &Value) -> bool {
        let needed = self
            .get(name)
            .is_some_and(|capability| capability.needs_approval(input));
        debug!(tool = name, needed, "approval check");
        needed
    }

    pub fn describe_invocation(&self, name: &str, input: &Value) -> String {
        describe_invocation(name, input)
    }

    pub async fn execute(&self, name: &str, input: Value) -> String {
        match self.get(name) {
            Some(capability) => capability.execute(input).await,
            None => {
                let err = CapabilityError::UnknownCapability {
                    name: name.to_string(),
                };
                warn!(tool = name, "model requested an unknown tool");
                err.as_tool_result()
            }
        }
    }
}
