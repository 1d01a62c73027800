//! Shared fakes for the integration tests: a scripted model, a recording channel and
//! `sh` scripts that speak just enough MCP to be driven by a real connection.

#![allow(dead_code)]

use async_trait::async_trait;
use serde_json::Value;
use std::collections::VecDeque;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;
use toolrelay_core::channel::{Channel, ChannelError};
use toolrelay_core::config::{AppConfig, parse_config};
use toolrelay_core::model::{ModelError, ModelProvider, ModelRequest, ModelResponse, StopReason};
use toolrelay_core::types::ContentBlock;

#[derive(Default)]
pub struct ScriptedProvider {
    responses: Mutex<VecDeque<ModelResponse>>,
    fallback: Option<ModelResponse>,
    recordings: Mutex<Vec<ModelRequest>>,
}

impl ScriptedProvider {
    pub fn new(responses: Vec<ModelResponse>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            ..Self::default()
        }
    }

    pub fn repeating(response: ModelResponse) -> Self {
        Self {
            fallback: Some(response),
            ..Self::default()
        }
    }

    pub fn requests(&self) -> Vec<ModelRequest> {
        self.recordings.lock().expect("recordings").clone()
    }
}

#[async_trait]
impl ModelProvider for ScriptedProvider {
    async fn send(&self, request: ModelRequest) -> Result<ModelResponse, ModelError> {
        self.recordings.lock().expect("recordings").push(request);
        let next = self.responses.lock().expect("responses").pop_front();
        next.or_else(|| self.fallback.clone())
            .ok_or_else(|| ModelError::invalid_response("scripted", "script exhausted"))
    }
}

/// Model step that ends the turn with `text`.
pub fn end_turn(text: &str) -> ModelResponse {
    ModelResponse::new(StopReason::EndTurn, vec![ContentBlock::text(text)])
}

/// Model step that asks for one tool invocation.
pub fn tool_use(id: &str, name: &str, input: Value) -> ModelResponse {
    ModelResponse::new(
        StopReason::ToolUse,
        vec![ContentBlock::ToolUse {
            id: id.to_string(),
            name: name.to_string(),
            input,
        }],
    )
}

/// Tool results carried by the last message of a recorded request.
pub fn fed_back_results(request: &ModelRequest) -> Vec<(String, String)> {
    request
        .messages
        .last()
        .map(|message| {
            message
                .content
                .blocks()
                .iter()
                .filter_map(|block| match block {
                    ContentBlock::ToolResult {
                        tool_use_id,
                        content,
                    } => Some((tool_use_id.clone(), content.clone())),
                    _ => None,
                })
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Default)]
pub struct RecordingChannel {
    texts: Mutex<Vec<String>>,
    approvals: Mutex<Vec<(String, String)>>,
}

impl RecordingChannel {
    pub fn texts(&self) -> Vec<String> {
        self.texts.lock().expect("texts").clone()
    }

    pub fn approvals(&self) -> Vec<(String, String)> {
        self.approvals.lock().expect("approvals").clone()
    }

    /// Wait until an approval request has been sent and return its token.
    pub async fn next_token(&self) -> String {
        loop {
            if let Some((_, token)) = self.approvals().last() {
                return token.clone();
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }
}

#[async_trait]
impl Channel for RecordingChannel {
    async fn send_text(&self, _principal: &str, text: &str) -> Result<(), ChannelError> {
        self.texts.lock().expect("texts").push(text.to_string());
        Ok(())
    }

    async fn send_approval_request(
        &self,
        _principal: &str,
        description: &str,
        token: &str,
    ) -> Result<(), ChannelError> {
        self.approvals
            .lock()
            .expect("approvals")
            .push((description.to_string(), token.to_string()));
        Ok(())
    }

    async fn send_media(&self, _: &str, _: &str, _: &str) -> Result<(), ChannelError> {
        Ok(())
    }
}

/// Build a validated config from TOML text with a test API key.
pub fn config_from(body: &str) -> AppConfig {
    let content = format!("[model]\napi_key = \"sk-test\"\n\n{body}");
    parse_config(&content, Path::new("test.toml")).expect("valid test config")
}

/// How the fake server frames its replies.
#[derive(Debug, Clone, Copy)]
pub enum Framing {
    Lines,
    ContentLength,
}

/// Write a fake MCP server script into `dir` and return its path.
///
/// It answers `initialize`, lists two tools, echoes `pong` for `tools/call`, never
/// answers a call to `slow`, exits on `crash`, answers a stale id before the real one for `stale`, and
/// pings the client before answering `needs_ping`.
pub fn write_fake_server(dir: &Path, framing: Framing) -> PathBuf {
    let reply = match framing {
        Framing::Lines => {
            r#"reply() { printf '{"jsonrpc":"2.0","id":%s,"result":%s}\n' "$1" "$2"; }"#
        }
        Framing::ContentLength => {
            r#"reply() { body=$(printf '{"jsonrpc":"2.0","id":%s,"result":%s}' "$1" "$2"); printf 'Content-Length: %s\r\n\r\n%s' "${#body}" "$body"; }"#
        }
    };
    let script = format!(
        r#"#!/bin/sh
{reply}
echo "fake server booting"
echo "fake: ready" >&2
while IFS= read -r line; do
  id=$(printf '%s\n' "$line" | sed -n 's/.*"id":\([0-9][0-9]*\).*/\1/p')
  [ -z "$id" ] && continue
  case "$line" in
    *'"method":"initialize"'*)
      reply "$id" '{{"protocolVersion":"2024-11-05","capabilities":{{}},"serverInfo":{{"name":"fake","version":"0.1.0"}}}}' ;;
    *'"method":"tools/list"'*)
      reply "$id" '{{"tools":[{{"name":"echo","description":"Echo text back"}},{{"name":"slow","description":"Never answers"}}]}}' ;;
    *'"name":"slow"'*)
      echo "fake: going to sleep" >&2
      exec sleep 30 ;;
    *'"name":"crash"'*)
      echo "fake: crashing" >&2
      exit 1 ;;
    *'"name":"stale"'*)
      reply 99999 '{{"content":[{{"type":"text","text":"stale"}}]}}'
      reply "$id" '{{"content":[{{"type":"text","text":"fresh"}}]}}' ;;
    *'"name":"needs_ping"'*)
      printf '{{"jsonrpc":"2.0","id":"srv-1","method":"ping"}}\n'
      IFS= read -r pong
      case "$pong" in
        *'"result"'*) reply "$id" '{{"content":[{{"type":"text","text":"pinged"}}]}}' ;;
        *) reply "$id" '{{"content":[{{"type":"text","text":"no pong"}}]}}' ;;
      esac ;;
    *'"method":"tools/call"'*)
      reply "$id" '{{"content":[{{"type":"text","text":"pong"}}]}}' ;;
    *)
      printf '{{"jsonrpc":"2.0","id":%s,"error":{{"code":-32601,"message":"unknown method"}}}}\n' "$id" ;;
  esac
done
"#
    );
    let path = dir.join(match framing {
        Framing::Lines => "fake_server.sh",
        Framing::ContentLength => "fake_server_framed.sh",
    });
    fs::write(&path, script).expect("write fake server");
    path
}
