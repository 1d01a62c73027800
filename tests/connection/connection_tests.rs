// Connection tests - real child processes speaking JSON-RPC over stdio
//
// The servers are small `sh` scripts (see support/mod.rs), so these only run on Unix.
#![cfg(unix)]

#[path = "../support/mod.rs"]
mod support;

use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use support::{Framing, write_fake_server};
use tempfile::{TempDir, tempdir};
use toolrelay_core::capability::BridgeTool;
use toolrelay_core::config::ServerConfig;
use toolrelay_core::tooling::{
    ConnectionError, ConnectionPool, ConnectionSettings, ConnectionState, ServerConnection,
};

fn settings(request_timeout: Duration) -> ConnectionSettings {
    ConnectionSettings {
        init_timeout: Duration::from_secs(10),
        request_timeout,
        max_scan_lines: 50,
    }
}

fn fake_config(name: &str, dir: &TempDir, framing: Framing) -> ServerConfig {
    let script = write_fake_server(dir.path(), framing);
    ServerConfig::new(name, "sh").with_args([script.to_string_lossy().into_owned()])
}

fn connection(framing: Framing, request_timeout: Duration) -> (ServerConnection, TempDir) {
    let dir = tempdir().expect("tempdir");
    let config = fake_config("fake", &dir, framing);
    (ServerConnection::new(config, settings(request_timeout)), dir)
}

async fn call(connection: &ServerConnection, tool: &str) -> Result<Value, ConnectionError> {
    connection
        .send_request("tools/call", json!({"name": tool, "arguments": {}}))
        .await
}

fn first_text(result: &Value) -> &str {
    result["content"][0]["text"].as_str().unwrap_or_default()
}

#[tokio::test]
async fn first_request_spawns_and_initializes_once() {
    let (connection, _dir) = connection(Framing::Lines, Duration::from_secs(10));

    let tools = connection
        .send_request("tools/list", json!({}))
        .await
        .expect("tools/list");
    assert_eq!(tools["tools"].as_array().map(Vec::len), Some(2));
    assert!(connection.is_initialized());

    let result = call(&connection, "echo").await.expect("echo");
    assert_eq!(first_text(&result), "pong");
    assert_eq!(connection.start_count(), 1);
    assert!(connection.diagnostics().contains("fake: ready"));

    connection.shutdown().await;
    assert_eq!(connection.state(), ConnectionState::Stopped);
}

#[tokio::test]
async fn timeout_kills_the_server_and_next_request_reinitializes() {
    let (connection, _dir) = connection(Framing::Lines, Duration::from_millis(500));
    call(&connection, "echo").await.expect("warm up");
    assert_eq!(connection.start_count(), 1);

    let err = call(&connection, "slow").await.expect_err("must time out");
    assert!(err.is_timeout(), "{err}");
    assert!(!connection.is_initialized());
    assert_eq!(connection.state(), ConnectionState::Stopped);

    let result = call(&connection, "echo").await.expect("after restart");
    assert_eq!(first_text(&result), "pong");
    assert!(connection.is_initialized());
    assert_eq!(connection.start_count(), 2);

    connection.shutdown().await;
}

#[tokio::test]
async fn content_length_framed_replies_are_understood() {
    let (connection, _dir) = connection(Framing::ContentLength, Duration::from_secs(10));

    let tools = connection
        .send_request("tools/list", json!({}))
        .await
        .expect("tools/list");
    assert_eq!(tools["tools"][0]["name"], "echo");
    let result = call(&connection, "echo").await.expect("echo");
    assert_eq!(first_text(&result), "pong");

    connection.shutdown().await;
}

#[tokio::test]
async fn stale_responses_are_skipped() {
    let (connection, _dir) = connection(Framing::Lines, Duration::from_secs(10));
    let result = call(&connection, "stale").await.expect("stale");
    assert_eq!(first_text(&result), "fresh");
    connection.shutdown().await;
}

#[tokio::test]
async fn server_ping_is_answered_mid_exchange() {
    let (connection, _dir) = connection(Framing::Lines, Duration::from_secs(10));
    let result = call(&connection, "needs_ping").await.expect("needs_ping");
    assert_eq!(first_text(&result), "pinged");
    connection.shutdown().await;
}

#[tokio::test]
async fn rpc_errors_keep_the_connection() {
    let (connection, _dir) = connection(Framing::Lines, Duration::from_secs(10));
    let err = connection
        .send_request("resources/list", json!({}))
        .await
        .expect_err("unknown method");
    assert!(
        matches!(err, ConnectionError::Rpc { code: -32601, .. }),
        "{err}"
    );
    assert!(connection.is_initialized());
    assert_eq!(connection.start_count(), 1);
    connection.shutdown().await;
}

#[tokio::test]
async fn crashed_server_is_restarted_on_next_use() {
    let (connection, _dir) = connection(Framing::Lines, Duration::from_secs(10));
    call(&connection, "echo").await.expect("warm up");

    let err = call(&connection, "crash").await.expect_err("crash");
    assert!(matches!(err, ConnectionError::Terminated { .. }), "{err}");
    assert!(!connection.is_initialized());

    let result = call(&connection, "echo").await.expect("after crash");
    assert_eq!(first_text(&result), "pong");
    assert_eq!(connection.start_count(), 2);
    connection.shutdown().await;
}

#[tokio::test]
async fn concurrent_requests_to_one_server_are_serialized() {
    let (connection, _dir) = connection(Framing::Lines, Duration::from_secs(10));
    let (first, second) = tokio::join!(call(&connection, "echo"), call(&connection, "stale"));
    assert_eq!(first_text(&first.expect("first")), "pong");
    assert_eq!(first_text(&second.expect("second")), "fresh");
    assert_eq!(connection.start_count(), 1);
    connection.shutdown().await;
}

#[tokio::test]
async fn bridge_timeout_becomes_error_text_and_leaves_server_stopped() {
    let dir = tempdir().expect("tempdir");
    let pool = Arc::new(ConnectionPool::new(
        vec![
            fake_config("notes", &dir, Framing::Lines),
            fake_config("files", &dir, Framing::ContentLength),
        ],
        settings(Duration::from_millis(500)),
    ));
    let bridge = BridgeTool::new(pool.clone(), 8000);

    let listing = bridge
        .execute(json!({"action": "list_tools", "server_name": "files"}))
        .await;
    assert!(listing.starts_with("Available tools (2):"), "{listing}");

    let text = bridge
        .execute(json!({
            "action": "call_tool",
            "server_name": "notes",
            "tool_name": "slow",
            "arguments": {},
        }))
        .await;
    assert!(text.starts_with("MCP error:"), "{text}");
    assert!(text.contains("timed out"), "{text}");

    let notes = pool.get_or_create("notes").expect("notes");
    assert!(!notes.is_initialized());
    let files = pool.get_or_create("files").expect("files");
    assert!(files.is_initialized());

    pool.shutdown_all().await;
    assert!(pool.is_empty());
}
