// Configuration loading from files on disk

use serial_test::serial;
use std::fs;
use std::path::Path;
use tempfile::tempdir;
use toolrelay_core::config::{ConfigError, load_config};

const API_KEY_ENV: &str = "ANTHROPIC_API_KEY";

fn with_api_key_env<T>(value: Option<&str>, f: impl FnOnce() -> T) -> T {
    let previous = std::env::var(API_KEY_ENV).ok();
    // SAFETY: every test touching the environment runs under #[serial].
    unsafe {
        match value {
            Some(value) => std::env::set_var(API_KEY_ENV, value),
            None => std::env::remove_var(API_KEY_ENV),
        }
    }
    let result = f();
    unsafe {
        match previous {
            Some(value) => std::env::set_var(API_KEY_ENV, value),
            None => std::env::remove_var(API_KEY_ENV),
        }
    }
    result
}

#[test]
#[serial]
fn full_config_with_settings_import() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("mcp.json");
    fs::write(
        &settings,
        r#"{
  "mcpServers": {
    "notes": {"command": "notes-server", "args": ["--ignored"]},
    "search": {"command": "search-server", "args": ["--fast"], "env": {"TOKEN": "abc"}},
    "broken": {"args": ["no command"]}
  }
}"#,
    )
    .expect("write settings");
    let config_path = dir.path().join("toolrelay.toml");
    fs::write(
        &config_path,
        format!(
            r#"mcp_settings_path = {:?}

[model]
api_key = "sk-file"
model = "claude-test"

[approval]
timeout_seconds = 60

[orchestrator]
max_rounds = 4

[[servers]]
name = "notes"
command = "notes-server"
args = ["--stdio"]
"#,
            settings.to_string_lossy()
        ),
    )
    .expect("write config");

    let config = with_api_key_env(None, || load_config(Some(&config_path))).expect("config");

    assert_eq!(config.model.api_key, "sk-file");
    assert_eq!(config.model.model, "claude-test");
    assert_eq!(config.approval.timeout_seconds, 60);
    assert_eq!(config.orchestrator.max_rounds, 4);

    let names: Vec<&str> = config.servers.iter().map(|s| s.name.as_str()).collect();
    assert_eq!(names, vec!["notes", "search"]);
    assert_eq!(config.servers[0].args, vec!["--stdio"]);
    assert_eq!(config.servers[1].args, vec!["--fast"]);
    assert_eq!(config.servers[1].env.get("TOKEN").map(String::as_str), Some("abc"));
}

#[test]
#[serial]
fn file_key_wins_over_environment() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("toolrelay.toml");
    fs::write(&path, "[model]\napi_key = \"sk-file\"\n").expect("write");

    let config = with_api_key_env(Some("sk-env"), || load_config(Some(&path))).expect("config");
    assert_eq!(config.model.api_key, "sk-file");
}

#[test]
#[serial]
fn environment_key_is_used_when_file_has_none() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("toolrelay.toml");
    fs::write(&path, "[conversation]\nmax_messages = 20\n").expect("write");

    let config = with_api_key_env(Some("sk-env"), || load_config(Some(&path))).expect("config");
    assert_eq!(config.model.api_key, "sk-env");
    assert_eq!(config.conversation.max_messages, 20);
}

#[test]
#[serial]
fn missing_key_everywhere_is_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("toolrelay.toml");
    fs::write(&path, "").expect("write");

    let err = with_api_key_env(None, || load_config(Some(&path))).expect_err("no key");
    assert!(matches!(err, ConfigError::MissingApiKey { .. }), "{err}");
}

#[test]
#[serial]
fn missing_file_is_not_found() {
    let err = load_config(Some(Path::new("/definitely/not/here/toolrelay.toml")))
        .expect_err("missing file");
    assert!(matches!(err, ConfigError::NotFound { .. }), "{err}");
}

#[test]
#[serial]
fn malformed_toml_is_a_parse_error() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("toolrelay.toml");
    fs::write(&path, "[model\napi_key = ").expect("write");

    let err = load_config(Some(&path)).expect_err("bad toml");
    assert!(matches!(err, ConfigError::Parse { .. }), "{err}");
}

#[test]
#[serial]
fn malformed_settings_json_is_reported() {
    let dir = tempdir().expect("tempdir");
    let settings = dir.path().join("mcp.json");
    fs::write(&settings, "{ not json").expect("write settings");
    let path = dir.path().join("toolrelay.toml");
    fs::write(
        &path,
        format!(
            "mcp_settings_path = {:?}\n[model]\napi_key = \"sk\"\n",
            settings.to_string_lossy()
        ),
    )
    .expect("write");

    let err = load_config(Some(&path)).expect_err("bad json");
    assert!(matches!(err, ConfigError::Json { .. }), "{err}");
}

#[test]
#[serial]
fn duplicate_servers_are_rejected() {
    let dir = tempdir().expect("tempdir");
    let path = dir.path().join("toolrelay.toml");
    fs::write(
        &path,
        "[model]\napi_key = \"sk\"\n\n[[servers]]\nname = \"a\"\ncommand = \"x\"\n\n[[servers]]\nname = \"a\"\ncommand = \"y\"\n",
    )
    .expect("write");

    let err = load_config(Some(&path)).expect_err("duplicate");
    assert!(matches!(err, ConfigError::DuplicateServer { ref name } if name == "a"), "{err}");
}
