use super::{parse_input, truncate_chars};
use crate::tooling::{ConnectionError, ToolServerInterface};
use serde::Deserialize;
use serde_json::{Map, Value, json};
use std::sync::Arc;
use tracing::{info, warn};

const MAX_TOOL_DESCRIPTION_CHARS: usize = 100;

#[derive(Debug, Deserialize)]
struct BridgeInput {
    action: String,
    server_name: String,
    #[serde(default)]
    tool_name: Option<String>,
    #[serde(default)]
    arguments: Option<Value>,
}

/// Forwards `list_tools` / `call_tool` to the user's MCP servers.
#[derive(Clone)]
pub struct BridgeTool {
    servers: Arc<dyn ToolServerInterface>,
    max_chars: usize,
}

impl BridgeTool {
    pub const NAME: &'static str = "mcp_call";

    pub fn new(servers: Arc<dyn ToolServerInterface>, max_chars: usize) -> Self {
        Self { servers, max_chars }
    }

    pub fn description(&self) -> String {
        let server_list = self
            .servers
            .servers()
            .iter()
            .map(|server| format!("  - **{}**: {}", server.name, server.description))
            .collect::<Vec<_>>()
            .join("\n");
        format!(
            "Call a tool on one of the user's MCP servers.\n\n\
             Available servers:\n{server_list}\n\n\
             USAGE:\n\
             1. First call with action='list_tools' and server_name to see available tools.\n\
             2. Then call with action='call_tool', server_name, tool_name, and arguments.\n\n\
             IMPORTANT: You must know the exact tool name. Use list_tools first if unsure."
        )
    }

    pub fn input_schema(&self) -> Value {
        let names: Vec<String> = self
            .servers
            .servers()
            .into_iter()
            .map(|server| server.name)
            .collect();
        json!({
            "type": "object",
            "properties": {
                "action": {
                    "type": "string",
                    "enum": ["list_tools", "call_tool"],
                    "description": "Either 'list_tools' to discover tools, or 'call_tool' to invoke one",
                },
                "server_name": {
                    "type": "string",
                    "enum": names,
                    "description": "Which MCP server to use",
                },
                "tool_name": {
                    "type": "string",
                    "description": "The tool to call (required when action='call_tool')",
                },
                "arguments": {
                    "type": "object",
                    "description": "Arguments to pass to the tool (required when action='call_tool')",
                },
            },
            "required": ["action", "server_name"],
        })
    }

    pub async fn execute(&self, input: Value) -> String {
        let input: BridgeInput = match parse_input(Self::NAME, input) {
            Ok(input) => input,
            Err(err) => return err.as_tool_result(),
        };
        info!(
            action = %input.action,
            server = %input.server_name,
            tool = input.tool_name.as_deref().unwrap_or_default(),
            "MCP bridge call"
        );

        let known: Vec<String> = self
            .servers
            .servers()
            .into_iter()
            .map(|server| server.name)
            .collect();
        if !known.iter().any(|name| *name == input.server_name) {
            return format!(
                "Error: Unknown server '{}'. Available: {}",
                input.server_name,
                known.join(", ")
            );
        }

        let outcome = match input.action.as_str() {
            "list_tools" => self.list_tools(&input.server_name).await,
            "call_tool" => match input.tool_name.as_deref().filter(|name| !name.is_empty()) {
                Some(tool) => {
                    self.call_tool(&input.server_name, tool, input.arguments)
                        .await
                }
                None => return "Error: tool_name is required when action='call_tool'".to_string(),
            },
            other => {
                return format!("Error: Unknown action '{other}'. Use 'list_tools' or 'call_tool'.");
            }
        };

        match outcome {
            Ok(text) => text,
            Err(ConnectionError::Rpc { code, message, .. }) => {
                format!("Error: {message} (code {code})")
            }
            Err(err) => {
                warn!(server = %input.server_name, error = %err, "MCP bridge call failed");
                format!("MCP error: {err}")
            }
        }
    }

    async fn list_tools(&self, server: &str) -> Result<String, ConnectionError> {
        let result = self.servers.request(server, "tools/list", json!({})).await?;
        Ok(format_tool_list(&result))
    }

    async fn call_tool(
        &self,
        server: &str,
        tool: &str,
        arguments: Option<Value>,
    ) -> Result<String, ConnectionError> {
        let arguments = match arguments {
            Some(Value::Object(map)) => Value::Object(map),
            _ => Value::Object(Map::new()),
        };
        let result = self
            .servers
            .request(
                server,
                "tools/call",
                json!({"name": tool, "arguments": arguments}),
            )
            .await?;
        Ok(self.flatten_result(&result))
    }

    fn flatten_result(&self, result: &Value) -> String {
        let parts: Vec<&str> = result
            .get("content")
            .and_then(Value::as_array)
            .map(|blocks| {
                blocks
                    .iter()
                    .filter_map(|block| match block {
                        Value::String(text) => Some(text.as_str()),
                        Value::Object(_) => block.get("text").and_then(Value::as_str),
                        _ => None,
                    })
                    .filter(|text| !text.is_empty())
                    .collect()
            })
            .unwrap_or_default();

        let output = if parts.is_empty() {
            serde_json::to_string_pretty(result).unwrap_or_else(|_| result.to_string())
        } else {
            parts.join("\n")
        };

        match truncate_chars(&output, self.max_chars) {
            (head, true) => format!("{head}\n\n... (truncated)"),
            (whole, false) => whole.to_string(),
        }
    }
}

fn format_tool_list(result: &Value) -> String {
    let tools = result
        .get("tools")
        .and_then(Value::as_array)
        .cloned()
        .unwrap_or_default();
    if tools.is_empty() {
        return "No tools found on this server.".to_string();
    }

    let lines: Vec<String> = tools
        .iter()
        .map(|tool| {
            let name = tool.get("name").and_then(Value::as_str).unwrap_or("?");
            let description = tool
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default();
            let description = match truncate_chars(description, MAX_TOOL_DESCRIPTION_CHARS) {
                (head, true) => format!("{head}..."),
                (whole, false) => whole.to_string(),
            };
            format!("- **{name}**: {description}")
        })
        .collect();
    format!("Available tools ({}):\n{}", tools.len(), lines.join("\n"))
}
