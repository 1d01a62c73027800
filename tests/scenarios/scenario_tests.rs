// End-to-end turn scenarios through the conversation service
//
// A scripted model drives the real orchestrator, approval gate, history rebuild and
// (for the bridge scenario) a real MCP child process.

#[path = "../support/mod.rs"]
mod support;

use serde_json::json;
use std::sync::Arc;
use support::{RecordingChannel, ScriptedProvider, config_from, end_turn, fed_back_results, tool_use};
use tempfile::tempdir;
use toolrelay_core::agent::{TurnOutcome, TurnStatus};
use toolrelay_core::config::AppConfig;
use toolrelay_core::constants::{BUSY_MESSAGE, DENIED_RESULT, MAX_ROUNDS_MESSAGE, RESET_MESSAGE};
use toolrelay_core::service::{Bridge, InboundOutcome};

const FAST_APPROVALS: &str = "[approval]\ntimeout_seconds = 5\npoll_interval_ms = 20\n";

struct Setup {
    bridge: Bridge,
    provider: Arc<ScriptedProvider>,
    channel: Arc<RecordingChannel>,
}

fn setup(config: &AppConfig, provider: ScriptedProvider) -> Setup {
    let provider = Arc::new(provider);
    let channel = Arc::new(RecordingChannel::default());
    let bridge = Bridge::with_provider(config, channel.clone(), provider.clone());
    Setup {
        bridge,
        provider,
        channel,
    }
}

fn expect_turn(outcome: InboundOutcome) -> TurnOutcome {
    match outcome {
        InboundOutcome::Turn(turn) => turn,
        other => panic!("expected a turn, got {other:?}"),
    }
}

#[tokio::test]
async fn plain_question_gets_exactly_one_reply() {
    let setup = setup(
        &config_from(""),
        ScriptedProvider::new(vec![end_turn("4")]),
    );

    let turn = expect_turn(setup.bridge.service.handle_inbound("alice", "what's 2+2").await);

    assert_eq!(turn.status, TurnStatus::Completed);
    assert_eq!(turn.rounds, 1);
    assert!(turn.steps.is_empty());
    assert_eq!(setup.channel.texts(), vec!["4"]);
    assert_eq!(setup.provider.requests().len(), 1);
}

#[tokio::test]
async fn denied_invocation_is_never_executed() {
    let dir = tempdir().expect("tempdir");
    let victim = dir.path().join("x.txt");
    std::fs::write(&victim, "keep me").expect("seed file");
    let setup = setup(
        &config_from(FAST_APPROVALS),
        ScriptedProvider::new(vec![
            tool_use(
                "toolu_del",
                "write_file",
                json!({"file_path": victim.to_string_lossy(), "content": ""}),
            ),
            end_turn("Understood, I did not touch it."),
        ]),
    );
    let service = setup.bridge.service.clone();

    let decider = async {
        let token = setup.channel.next_token().await;
        let outcome = service.handle_inbound("alice", &format!("DENY {token}")).await;
        (token, outcome)
    };
    let (turn, (token, decision)) = tokio::join!(
        setup.bridge.service.handle_inbound("alice", "delete file X"),
        decider
    );
    let turn = expect_turn(turn);

    assert!(matches!(decision, InboundOutcome::Decision { .. }));
    assert_eq!(std::fs::read_to_string(&victim).expect("still there"), "keep me");
    assert!(!turn.steps[0].executed);

    let requests = setup.provider.requests();
    assert_eq!(requests.len(), 2);
    assert_eq!(
        fed_back_results(&requests[1]),
        vec![("toolu_del".to_string(), DENIED_RESULT.to_string())]
    );

    let approvals = setup.channel.approvals();
    assert!(approvals[0].0.starts_with("Write file:\n"));
    let texts = setup.channel.texts();
    assert!(texts.contains(&format!("\u{274c} Request {token} denied.")));
    assert_eq!(texts.last().map(String::as_str), Some("Understood, I did not touch it."));
}

#[cfg(unix)]
#[tokio::test]
async fn bridge_timeout_is_reported_as_text_and_server_is_stopped() {
    let dir = tempdir().expect("tempdir");
    let script = support::write_fake_server(dir.path(), support::Framing::Lines);
    let config = config_from(&format!(
        "[rpc]\nrequest_timeout_seconds = 1\n\n[[servers]]\nname = \"fake\"\ncommand = \"sh\"\nargs = [{:?}]\n",
        script.to_string_lossy()
    ));
    let setup = setup(
        &config,
        ScriptedProvider::new(vec![
            tool_use(
                "toolu_slow",
                "mcp_call",
                json!({"action": "call_tool", "server_name": "fake", "tool_name": "slow"}),
            ),
            end_turn("The server did not answer in time."),
        ]),
    );

    let turn = expect_turn(setup.bridge.service.handle_inbound("alice", "run the slow tool").await);

    assert_eq!(turn.status, TurnStatus::Completed);
    let requests = setup.provider.requests();
    let results = fed_back_results(&requests[1]);
    assert_eq!(results[0].0, "toolu_slow");
    assert!(results[0].1.starts_with("MCP error:"), "{}", results[0].1);
    assert!(requests[0].tools.iter().any(|tool| tool.name == "mcp_call"));

    let connection = setup.bridge.pool.get_or_create("fake").expect("fake");
    assert!(!connection.is_initialized());
    assert_eq!(connection.start_count(), 1);
    setup.bridge.shutdown().await;
}

#[tokio::test]
async fn round_ceiling_stops_after_ten_model_calls() {
    let setup = setup(
        &config_from(""),
        ScriptedProvider::repeating(tool_use(
            "toolu_again",
            "read_file",
            json!({"file_path": "/definitely/missing.txt"}),
        )),
    );

    let turn = expect_turn(setup.bridge.service.handle_inbound("alice", "keep going").await);

    assert_eq!(turn.status, TurnStatus::MaxRoundsExceeded);
    assert_eq!(setup.provider.requests().len(), 10);
    assert_eq!(setup.channel.texts(), vec![MAX_ROUNDS_MESSAGE]);
}

#[tokio::test]
async fn second_message_while_busy_is_refused() {
    let dir = tempdir().expect("tempdir");
    let target = dir.path().join("out.txt");
    let setup = setup(
        &config_from(FAST_APPROVALS),
        ScriptedProvider::new(vec![
            tool_use(
                "toolu_w",
                "write_file",
                json!({"file_path": target.to_string_lossy(), "content": "data"}),
            ),
            end_turn("Saved."),
        ]),
    );
    let service = setup.bridge.service.clone();

    let interloper = async {
        let token = setup.channel.next_token().await;
        let refused = service.handle_inbound("alice", "are you done yet?").await;
        service.handle_inbound("alice", &format!("approve {token}")).await;
        refused
    };
    let (turn, refused) = tokio::join!(
        setup.bridge.service.handle_inbound("alice", "save data"),
        interloper
    );

    assert!(matches!(refused, InboundOutcome::Busy));
    let turn = expect_turn(turn);
    assert!(turn.steps[0].executed);
    assert_eq!(std::fs::read_to_string(&target).expect("written"), "data");
    assert!(setup.channel.texts().contains(&BUSY_MESSAGE.to_string()));
    assert_eq!(setup.provider.requests().len(), 2);
}

#[tokio::test]
async fn history_carries_over_and_reset_starts_fresh() {
    let setup = setup(
        &config_from(""),
        ScriptedProvider::new(vec![end_turn("hello"), end_turn("still here"), end_turn("new")]),
    );
    let service = &setup.bridge.service;

    service.handle_inbound("alice", "hi").await;
    service.handle_inbound("alice", "again").await;
    assert!(matches!(
        service.handle_inbound("alice", "/reset").await,
        InboundOutcome::Reset
    ));
    service.handle_inbound("alice", "after reset").await;

    let requests = setup.provider.requests();
    assert_eq!(requests[0].messages.len(), 1);
    assert_eq!(requests[1].messages.len(), 3);
    assert_eq!(requests[1].messages[1].content.text(), "hello");
    assert_eq!(requests[2].messages.len(), 1);
    assert_eq!(requests[2].messages[0].content.text(), "after reset");
    assert!(setup.channel.texts().contains(&RESET_MESSAGE.to_string()));
}

#[tokio::test]
async fn unanswered_approval_expires_and_counts_as_denied() {
    let setup = setup(
        &config_from("[approval]\ntimeout_seconds = 1\npoll_interval_ms = 50\n"),
        ScriptedProvider::new(vec![
            tool_use("toolu_rm", "execute_bash", json!({"command": "rm -rf /tmp/toolrelay-none"})),
            end_turn("Nobody approved that."),
        ]),
    );

    let turn = expect_turn(setup.bridge.service.handle_inbound("alice", "clean up").await);

    let token = setup.channel.approvals()[0].1.clone();
    assert_eq!(setup.channel.approvals()[0].0, "Run command:\nrm -rf /tmp/toolrelay-none");
    assert!(!turn.steps[0].executed);
    assert!(setup.channel.texts().contains(&format!("Approval {token} expired.")));
    assert_eq!(
        fed_back_results(&setup.provider.requests()[1])[0].1,
        DENIED_RESULT
    );

    let late = setup
        .bridge
        .service
        .handle_inbound("alice", &format!("APPROVE {token}"))
        .await;
    assert!(matches!(late, InboundOutcome::Decision { .. }));
    assert_eq!(
        setup.channel.texts().last().map(String::as_str),
        Some(format!("Approval {token} not found or already handled.").as_str())
    );
}

#[tokio::test]
async fn decision_commands_are_validated() {
    let setup = setup(&config_from(""), ScriptedProvider::default());
    let service = &setup.bridge.service;

    assert!(matches!(
        service.handle_inbound("alice", "APPROVE").await,
        InboundOutcome::MalformedDecision
    ));
    service.handle_inbound("alice", "deny deadbeef").await;

    assert_eq!(
        setup.channel.texts(),
        vec![
            "Invalid format. Use: APPROVE <id> or DENY <id>".to_string(),
            "Approval DEADBEEF not found or already handled.".to_string(),
        ]
    );
    assert_eq!(setup.bridge.recover().await.expect("sweep"), 0);
    assert!(setup.provider.requests().is_empty());
}

#[tokio::test]
async fn model_failure_is_reported_to_the_user() {
    let setup = setup(&config_from(""), ScriptedProvider::default());

    let outcome = setup.bridge.service.handle_inbound("alice", "hello?").await;

    match outcome {
        InboundOutcome::Failed(message) => {
            assert!(message.starts_with("Something went wrong: "), "{message}");
        }
        other => panic!("expected failure, got {other:?}"),
    }
    assert_eq!(setup.channel.texts().len(), 1);
}
