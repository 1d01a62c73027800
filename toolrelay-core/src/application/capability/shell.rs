use super::parse_input;
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::{Value, json};
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;
use tracing::{debug, warn};

/// Commands that delete, kill, reconfigure or publish something.
static DESTRUCTIVE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?ix)
        \b(?:
            rm\b | rmdir\b | del\b | erase\b | shred\b
          | remove-item\b
          | format\b | mkfs
          | kill\b | pkill\b | killall\b | stop-process\b | taskkill\b
          | shutdown\b | reboot\b | restart-computer\b
          | net\s+(?:user|localgroup)\b | useradd\b | userdel\b
          | reg\s+(?:delete|add)\b
          | sc\s+(?:delete|stop)\b | systemctl\s+(?:stop|disable|mask)\b
          | mklink\b
          | attrib\b | chattr\b
          | icacls\b | cacls\b | chmod\b | chown\b
          | schtasks\s+/(?:create|delete)\b
          | mv\b | move\b | ren\b | rename\b
          | curl\b.*\s-[dX]
          | invoke-webrequest\b.*-method\b
          | pip\s+(?:install|uninstall)\b
          | npm\s+(?:install|uninstall)\b
          | git\s+(?:push|reset|rebase|merge|checkout)\b
        )",
    )
    .expect("valid regex")
});

/// Whether a shell command matches the destructive-verb list.
pub fn is_destructive(command: &str) -> bool {
    DESTRUCTIVE.is_match(command)
}

#[derive(Debug, Deserialize)]
struct ShellInput {
    command: String,
}

#[derive(Debug, Clone)]
pub struct ShellTool {
    timeout: Duration,
    require_approval: bool,
}

impl ShellTool {
    pub const NAME: &'static str = "execute_bash";

    pub fn new(timeout: Duration, require_approval: bool) -> Self {
        Self {
            timeout,
            require_approval,
        }
    }

    pub fn description(&self) -> String {
        format!(
            "Execute a shell command on the local machine. Output (stdout + stderr) is \
             captured and returned. Commands time out after {} seconds. Read-only commands \
             (ls, cat, date, echo, grep, find, pwd, whoami, ...) run immediately. \
             Destructive commands (rm, kill, mv, chmod, git push, ...) require user approval.",
            self.timeout.as_secs()
        )
    }

    pub fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "command": {
                    "type": "string",
                    "description": "The shell command to execute",
                },
                "reason": {
                    "type": "string",
                    "description": "Brief explanation of why this command is needed",
                },
            },
            "required": ["command"],
        })
    }

    pub fn needs_approval(&self, input: &Value) -> bool {
        if !self.require_approval {
            return false;
        }
        let command = input.get("command").and_then(Value::as_str).unwrap_or_default();
        let destructive = is_destructive(command);
        debug!(destructive, command, "classified shell command");
        destructive
    }

    pub async fn execute(&self, input: Value) -> String {
        let input: ShellInput = match parse_input(Self::NAME, input) {
            Ok(input) => input,
            Err(err) => return err.as_tool_result(),
        };

        let mut command = shell_command(&input.command);
        command
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        let output = match timeout(self.timeout, command.output()).await {
            Ok(Ok(output)) => output,
            Ok(Err(err)) => return format!("Error: {err}"),
            Err(_) => {
                warn!(command = %input.command, "shell command timed out");
                return format!(
                    "Error: Command timed out after {} seconds",
                    self.timeout.as_secs()
                );
            }
        };

        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let mut parts = Vec::new();
        if !stdout.trim().is_empty() {
            parts.push(format!("STDOUT:\n{}", stdout.trim()));
        }
        if !stderr.trim().is_empty() {
            parts.push(format!("STDERR:\n{}", stderr.trim()));
        }
        parts.push(format!("Exit code: {}", output.status.code().unwrap_or(-1)));
        parts.join("\n\n")
    }
}

#[cfg(windows)]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("cmd");
    command.arg("/C").arg(line);
    command
}

#[cfg(not(windows))]
fn shell_command(line: &str) -> Command {
    let mut command = Command::new("sh");
    command.arg("-c").arg(line);
    command
}
