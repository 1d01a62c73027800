pub const DEFAULT_ENDPOINT: &str = "https://api.anthropic.com";
pub const DEFAULT_MODEL: &str = "claude-sonnet-4-5-20250929";
pub const DEFAULT_MAX_TOKENS: u32 = 4096;
pub const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

pub const DEFAULT_CONVERSATION_TIMEOUT_MINUTES: u64 = 60;
pub const DEFAULT_MAX_MESSAGES: usize = 50;

pub const DEFAULT_APPROVAL_TIMEOUT_SECONDS: u64 = 300;
pub const DEFAULT_APPROVAL_POLL_MS: u64 = 2000;

pub const DEFAULT_MAX_ROUNDS: usize = 10;

pub const DEFAULT_INIT_TIMEOUT_SECONDS: u64 = 60;
pub const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 120;
pub const DEFAULT_MAX_SCAN_LINES: usize = 200;

pub const DEFAULT_SHELL_TIMEOUT_SECONDS: u64 = 30;
pub const DEFAULT_READ_MAX_CHARS: usize = 10_000;
pub const DEFAULT_BRIDGE_MAX_CHARS: usize = 8_000;
pub const DEFAULT_SEARCH_ENDPOINT: &str = "https://api.duckduckgo.com/";

/// Upper bound for the optional instructions file appended to the system prompt
pub const INSTRUCTIONS_MAX_CHARS: usize = 12_000;

pub const DEFAULT_SYSTEM_PROMPT: &str = r#"You are an assistant that talks to the user through a chat channel.

CONSTRAINTS:
- Keep responses concise and use short paragraphs or bullet points.

CAPABILITIES (tools you can call):
- execute_bash - run shell commands on the user's machine.
- read_file - read a local file (absolute path).
- write_file - create or overwrite a local file (absolute path).
- web_search - search the web for current information.
- send_media - send an image or document to the user by URL.
- mcp_call - call tools on the user's MCP servers.

MCP USAGE:
1. Call mcp_call with action="list_tools" to see the tools a server offers.
2. Then call mcp_call with action="call_tool", the tool_name and arguments.

SAFETY:
- Destructive shell commands and file writes are sent to the user for approval first.
- Read-only commands, file reads and MCP calls run without approval.
- Never reveal secrets, API keys or credentials.

Be helpful, direct and action-oriented."#;
