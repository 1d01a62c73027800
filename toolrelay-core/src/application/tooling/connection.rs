use super::diagnostics::StderrBuffer;
use super::error::ConnectionError;
use crate::config::{RpcSettings, ServerConfig};
use crate::constants::PROTOCOL_VERSION;
use crate::rpc::{
    CodecError, JsonRpcMessage, RpcErrorObject, decode_one, encode_error, encode_message,
    encode_response,
};
use serde_json::{Value, json};
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStderr, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex as AsyncMutex;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tracing::{debug, info, warn};

const DIAGNOSTIC_EXCERPT_CHARS: usize = 300;
const STDERR_DRAIN_GRACE: Duration = Duration::from_millis(500);
const METHOD_NOT_FOUND: i64 = -32601;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConnectionSettings {
    pub init_timeout: Duration,
    pub request_timeout: Duration,
    pub max_scan_lines: usize,
}

impl From<&RpcSettings> for ConnectionSettings {
    fn from(settings: &RpcSettings) -> Self {
        Self {
            init_timeout: Duration::from_secs(settings.init_timeout_seconds),
            request_timeout: Duration::from_secs(settings.request_timeout_seconds),
            max_scan_lines: settings.max_scan_lines,
        }
    }
}

impl Default for ConnectionSettings {
    fn default() -> Self {
        Self::from(&RpcSettings::default())
    }
}

/// Lifecycle of one server process.
///
/// `Busy` is `Initialized` with an exchange in flight; a timeout while busy drops back
/// to `Stopped` and the next request goes through `Starting` again.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Stopped,
    Starting,
    Initialized,
    Busy,
}

/// A persistent connection to a single MCP server process.
///
/// The process mutex doubles as the request lock: at most one JSON-RPC exchange is
/// in flight per server.
#[derive(Debug)]
pub struct ServerConnection {
    config: ServerConfig,
    settings: ConnectionSettings,
    process: AsyncMutex<Option<RunningProcess>>,
    state: Mutex<ConnectionState>,
    next_id: AtomicU64,
    start_count: AtomicU64,
    stderr: Arc<StderrBuffer>,
}

#[derive(Debug)]
struct RunningProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    stderr_task: Option<JoinHandle<()>>,
}

enum ExchangeError {
    Codec(CodecError),
    Rpc(RpcErrorObject),
}

impl From<CodecError> for ExchangeError {
    fn from(value: CodecError) -> Self {
        ExchangeError::Codec(value)
    }
}

impl ServerConnection {
    pub fn new(config: ServerConfig, settings: ConnectionSettings) -> Self {
        Self {
            config,
            settings,
            process: AsyncMutex::new(None),
            state: Mutex::new(ConnectionState::Stopped),
            next_id: AtomicU64::new(0),
            start_count: AtomicU64::new(0),
            stderr: Arc::new(StderrBuffer::default()),
        }
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &ServerConfig {
        &self.config
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn is_initialized(&self) -> bool {
        matches!(
            self.state(),
            ConnectionState::Initialized | ConnectionState::Busy
        )
    }

    /// How many times a process has been spawned for this server.
    pub fn start_count(&self) -> u64 {
        self.start_count.load(Ordering::SeqCst)
    }

    /// Recent stderr output of the current (or last) process.
    pub fn diagnostics(&self) -> String {
        self.stderr.snapshot()
    }

    pub async fn ensure_running(&self) -> Result<(), ConnectionError> {
        let mut process = self.process.lock().await;
        self.ensure_running_locked(&mut process).await
    }

    /// Send one request and wait for its correlated response.
    ///
    /// A timeout kills the process and leaves the connection stopped; the request is
    /// not retried.
    pub async fn send_request(&self, method: &str, params: Value) -> Result<Value, ConnectionError> {
        let mut process = self.process.lock().await;
        self.ensure_running_locked(&mut process).await?;

        let Some(running) = process.as_mut() else {
            return Err(ConnectionError::Terminated {
                server: self.config.name.clone(),
                diagnostics: self.stderr.excerpt(DIAGNOSTIC_EXCERPT_CHARS),
            });
        };

        let id = self.next_id();
        self.set_state(ConnectionState::Busy);
        let outcome = timeout(
            self.settings.request_timeout,
            running.exchange(
                &self.config.name,
                method,
                &params,
                id,
                self.settings.max_scan_lines,
            ),
        )
        .await;

        match outcome {
            Ok(Ok(result)) => {
                self.set_state(ConnectionState::Initialized);
                debug!(server = %self.config.name, method, id, "received response");
                Ok(result)
            }
            Ok(Err(ExchangeError::Rpc(error))) => {
                self.set_state(ConnectionState::Initialized);
                Err(ConnectionError::Rpc {
                    server: self.config.name.clone(),
                    code: error.code,
                    message: error.message,
                })
            }
            Ok(Err(ExchangeError::Codec(source))) if source.is_disconnect() => {
                warn!(server = %self.config.name, method, error = %source, "MCP server went away");
                self.stop_locked(&mut process).await;
                Err(ConnectionError::Terminated {
                    server: self.config.name.clone(),
                    diagnostics: self.stderr.excerpt(DIAGNOSTIC_EXCERPT_CHARS),
                })
            }
            Ok(Err(ExchangeError::Codec(source))) => {
                self.set_state(ConnectionState::Initialized);
                warn!(server = %self.config.name, method, error = %source, "unreadable response");
                Err(ConnectionError::Protocol {
                    server: self.config.name.clone(),
                    source,
                })
            }
            Err(_) => {
                warn!(
                    server = %self.config.name,
                    method,
                    timeout_secs = self.settings.request_timeout.as_secs(),
                    "request timed out, killing server"
                );
                self.stop_locked(&mut process).await;
                Err(ConnectionError::Timeout {
                    server: self.config.name.clone(),
                    method: method.to_string(),
                    after_ms: self.settings.request_timeout.as_millis(),
                    diagnostics: self.stderr.excerpt(DIAGNOSTIC_EXCERPT_CHARS),
                })
            }
        }
    }

    /// Close stdin and kill the process. Safe to call repeatedly.
    pub async fn shutdown(&self) {
        let mut process = self.process.lock().await;
        let was_running = process.is_some();
        self.stop_locked(&mut process).await;
        if was_running {
            info!(server = %self.config.name, "MCP server shut down");
        }
    }

    async fn ensure_running_locked(
        &self,
        process: &mut Option<RunningProcess>,
    ) -> Result<(), ConnectionError> {
        if let Some(running) = process.as_mut() {
            let alive = matches!(running.child.try_wait(), Ok(None));
            if alive && self.is_initialized() {
                return Ok(());
            }
            if !alive {
                warn!(server = %self.config.name, "MCP server process exited, restarting");
            }
            self.stop_locked(process).await;
        }

        self.set_state(ConnectionState::Starting);
        let mut running = match self.spawn() {
            Ok(running) => running,
            Err(err) => {
                self.set_state(ConnectionState::Stopped);
                return Err(err);
            }
        };

        let reason = match timeout(self.settings.init_timeout, self.handshake(&mut running)).await
        {
            Ok(Ok(())) => {
                *process = Some(running);
                self.set_state(ConnectionState::Initialized);
                info!(server = %self.config.name, "MCP server initialized");
                return Ok(());
            }
            Ok(Err(reason)) => reason,
            Err(_) => format!(
                "no initialize response within {}s",
                self.settings.init_timeout.as_secs()
            ),
        };

        running.stop().await;
        self.set_state(ConnectionState::Stopped);
        let diagnostics = self.stderr.excerpt(DIAGNOSTIC_EXCERPT_CHARS);
        warn!(server = %self.config.name, %reason, "MCP server failed to initialize");
        Err(ConnectionError::Initialization {
            server: self.config.name.clone(),
            reason,
            diagnostics,
        })
    }

    async fn handshake(&self, running: &mut RunningProcess) -> Result<(), String> {
        let params = json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": env!("CARGO_PKG_NAME"),
                "version": env!("CARGO_PKG_VERSION"),
            },
        });
        let id = self.next_id();
        running
            .exchange(
                &self.config.name,
                "initialize",
                &params,
                id,
                self.settings.max_scan_lines,
            )
            .await
            .map_err(|err| match err {
                ExchangeError::Codec(source) => source.to_string(),
                ExchangeError::Rpc(error) => format!("error {}: {}", error.code, error.message),
            })?;

        let notification = encode_message("notifications/initialized", &json!({}), None)
            .map_err(|err| err.to_string())?;
        running
            .write(&notification)
            .await
            .map_err(|err| err.to_string())
    }

    fn spawn(&self) -> Result<RunningProcess, ConnectionError> {
        let mut command = Command::new(&self.config.command);
        command
            .args(&self.config.args)
            .envs(&self.config.env)
            .env("PYTHONIOENCODING", "utf-8")
            .env("PYTHONUTF8", "1")
            .env("NO_UPDATE_NOTIFIER", "1")
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        if let Some(dir) = &self.config.workdir {
            command.current_dir(dir);
        }

        info!(
            server = %self.config.name,
            command = %self.config.command.display(),
            args = ?self.config.args,
            "Starting MCP server"
        );

        let mut child = command.spawn().map_err(|source| ConnectionError::Spawn {
            server: self.config.name.clone(),
            source,
        })?;
        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| self.transport_error("failed to capture server stdout"))?;

        self.stderr.clear();
        let stderr_task = child
            .stderr
            .take()
            .map(|stderr| self.spawn_stderr_drain(stderr));
        self.start_count.fetch_add(1, Ordering::SeqCst);

        Ok(RunningProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            stderr_task,
        })
    }

    fn spawn_stderr_drain(&self, stderr: ChildStderr) -> JoinHandle<()> {
        let buffer = Arc::clone(&self.stderr);
        let server = self.config.name.clone();
        tokio::spawn(async move {
            let mut reader = BufReader::new(stderr);
            let mut raw = Vec::new();
            loop {
                raw.clear();
                match reader.read_until(b'\n', &mut raw).await {
                    Ok(0) | Err(_) => break,
                    Ok(_) => {
                        let line = String::from_utf8_lossy(&raw).trim_end().to_string();
                        if line.is_empty() {
                            continue;
                        }
                        debug!(server = %server, line = %line, "server stderr");
                        buffer.push(line);
                    }
                }
            }
        })
    }

    async fn stop_locked(&self, process: &mut Option<RunningProcess>) {
        if let Some(running) = process.take() {
            running.stop().await;
        }
        self.set_state(ConnectionState::Stopped);
    }

    fn set_state(&self, next: ConnectionState) {
        *self.state.lock().unwrap_or_else(|e| e.into_inner()) = next;
    }

    fn next_id(&self) -> u64 {
        self.next_id.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn transport_error(&self, message: impl Into<String>) -> ConnectionError {
        ConnectionError::Transport {
            server: self.config.name.clone(),
            message: message.into(),
        }
    }
}

impl RunningProcess {
    async fn write(&mut self, bytes: &[u8]) -> Result<(), CodecError> {
        self.stdin.write_all(bytes).await?;
        self.stdin.flush().await?;
        Ok(())
    }

    async fn exchange(
        &mut self,
        server: &str,
        method: &str,
        params: &Value,
        id: u64,
        max_lines: usize,
    ) -> Result<Value, ExchangeError> {
        let request = encode_message(method, params, Some(id))?;
        self.write(&request).await?;
        debug!(server, method, id, "sent request");

        loop {
            let message = decode_one(&mut self.stdout, max_lines).await?;
            if message.is_server_request() {
                self.answer_server_request(server, message).await?;
                continue;
            }
            if message.numeric_id() != Some(id) {
                debug!(server, expected = id, received = %message.id, "ignoring stale response");
                continue;
            }
            return message.into_result().map_err(ExchangeError::Rpc);
        }
    }

    async fn answer_server_request(
        &mut self,
        server: &str,
        message: JsonRpcMessage,
    ) -> Result<(), CodecError> {
        let method = message.method.as_deref().unwrap_or_default();
        let reply = if method == "ping" {
            encode_response(message.id.clone(), json!({}))?
        } else {
            warn!(server, method, "server sent unsupported request");
            encode_error(
                message.id.clone(),
                METHOD_NOT_FOUND,
                &format!("client does not implement method '{method}'"),
            )?
        };
        self.write(&reply).await
    }

    async fn stop(self) {
        let RunningProcess {
            mut child,
            stdin,
            stdout,
            stderr_task,
        } = self;
        drop(stdin);
        drop(stdout);
        if let Err(err) = child.kill().await {
            debug!(%err, "failed to kill MCP server process (may have already exited)");
        }
        if let Some(task) = stderr_task {
            let _ = timeout(STDERR_DRAIN_GRACE, task).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> ConnectionSettings {
        ConnectionSettings {
            init_timeout: Duration::from_secs(5),
            request_timeout: Duration::from_secs(5),
            max_scan_lines: 50,
        }
    }

    #[test]
    fn settings_follow_rpc_section() {
        let rpc = RpcSettings {
            init_timeout_seconds: 7,
            request_timeout_seconds: 9,
            max_scan_lines: 11,
        };
        let converted = ConnectionSettings::from(&rpc);
        assert_eq!(converted.init_timeout, Duration::from_secs(7));
        assert_eq!(converted.request_timeout, Duration::from_secs(9));
        assert_eq!(converted.max_scan_lines, 11);
    }

    #[tokio::test]
    async fn new_connection_is_stopped() {
        let connection = ServerConnection::new(ServerConfig::new("idle", "true"), settings());
        assert_eq!(connection.state(), ConnectionState::Stopped);
        assert_eq!(connection.start_count(), 0);
        connection.shutdown().await;
        assert_eq!(connection.state(), ConnectionState::Stopped);
    }

    #[tokio::test]
    async fn spawn_failure_leaves_connection_stopped() {
        let connection = ServerConnection::new(
            ServerConfig::new("missing", "/nonexistent/toolrelay-server"),
            settings(),
        );
        let err = connection
            .send_request("tools/list", json!({}))
            .await
            .expect_err("spawn must fail");
        assert!(matches!(err, ConnectionError::Spawn { .. }));
        assert_eq!(connection.state(), ConnectionState::Stopped);
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn exiting_server_reports_initialization_error_with_stderr() {
        let config = ServerConfig::new("crashy", "sh")
            .with_args(["-c", "echo 'fatal: missing token' >&2; exit 3"]);
        let connection = ServerConnection::new(config, settings());

        let err = connection
            .ensure_running()
            .await
            .expect_err("init must fail");
        match err {
            ConnectionError::Initialization { diagnostics, .. } => {
                assert!(diagnostics.contains("missing token"), "{diagnostics}");
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(!connection.is_initialized());
        assert_eq!(connection.start_count(), 1);
    }
}
