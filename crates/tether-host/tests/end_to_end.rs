//! Drive the real `tether-host` binary over its stdio pipes.

use std::process::Stdio;
use std::time::Duration;
use tether::agent::{Agent, AgentConfig, AgentResult};
use tether::backend::ScriptedBackend;
use tether::client::{Client, ClientConfig};
use tether::protocol::{Arguments, codes};
use tether::{ClientError, TransportError};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::Command;

const HOST: &str = env!("CARGO_BIN_EXE_tether-host");

fn host_args() -> Vec<String> {
    vec!["--offline".to_string()]
}

fn config() -> ClientConfig {
    ClientConfig::default()
        .with_request_timeout(Some(Duration::from_secs(10)))
        .with_shutdown_grace(Duration::from_secs(1))
}

async fn connect() -> Client {
    Client::connect(HOST, &host_args(), config())
        .await
        .expect("tether-host should start")
}

fn args(pairs: &[(&str, &str)]) -> Arguments {
    pairs
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
}

const ECHO_42: &str = "```json\n{\"tool\": \"echo\", \"parameters\": {\"text\": \"42\"}}\n```";

#[tokio::test]
async fn handshake_reports_server_and_catalog() {
    let mut client = connect().await;
    assert_eq!(client.server_info().unwrap().name, "tether-host");
    let names: Vec<String> = client.descriptors().iter().map(|d| d.name.clone()).collect();
    assert_eq!(names, vec!["echo", "current_day"]);

    let again: Vec<String> = client
        .discover_capabilities()
        .await
        .unwrap()
        .iter()
        .map(|d| d.name.clone())
        .collect();
    assert_eq!(again, names);
    client.close().await;
}

#[tokio::test]
async fn echo_round_trip() {
    let mut client = connect().await;
    let outcome = client.call("echo", &args(&[("text", "hi")])).await.unwrap();
    assert_eq!((outcome.text.as_str(), outcome.is_error), ("hi", false));
    client.close().await;
}

#[tokio::test]
async fn failing_tool_is_an_error_outcome() {
    let mut client = connect().await;
    let outcome = client.call("echo", &Arguments::new()).await.unwrap();
    assert!(outcome.is_error);
    assert!(outcome.text.contains("argument validation failed"));
    assert!(!client.is_closed());
    client.close().await;
}

#[tokio::test]
async fn validation_can_be_switched_off() {
    let host_args = ["--offline".to_string(), "--no-validate-args".to_string()];
    let mut client = Client::connect(HOST, &host_args, config()).await.unwrap();
    let outcome = client.call("echo", &Arguments::new()).await.unwrap();
    assert!(outcome.is_error);
    assert!(!outcome.text.contains("argument validation failed"));
    client.close().await;
}

#[tokio::test]
async fn unknown_tool_is_rejected_with_invalid_params() {
    let mut client = connect().await;
    let err = client.call("nope", &Arguments::new()).await.unwrap_err();
    match err {
        ClientError::Invocation { error, .. } => {
            assert_eq!(error.code, codes::INVALID_PARAMS);
            assert_eq!(error.message, "Unknown tool: nope");
        }
        other => panic!("expected Invocation, got {other:?}"),
    }
    // The session survives a rejected request.
    assert!(client.call("echo", &args(&[("text", "still here")])).await.is_ok());
    client.close().await;
}

#[tokio::test]
async fn agent_answers_after_one_tool_call() {
    let mut client = connect().await;
    let backend = ScriptedBackend::new([ECHO_42, "The answer is 42."]);

    let result = Agent::new(&backend, &mut client, AgentConfig::default())
        .run("What is six times seven?")
        .await
        .unwrap();
    client.close().await;

    assert_eq!(
        result,
        AgentResult {
            response: "The answer is 42.".into(),
            iterations: 2,
            completed: true,
        }
    );
    assert!(backend.prompts()[1].contains("Observation: 42"));
}

#[tokio::test]
async fn agent_stops_at_iteration_cap() {
    let mut client = connect().await;
    let backend = ScriptedBackend::repeating(ECHO_42);

    let result = Agent::new(
        &backend,
        &mut client,
        AgentConfig::default().with_max_iterations(3),
    )
    .run("never finishes")
    .await
    .unwrap();
    client.close().await;

    assert!(!result.completed);
    assert_eq!(result.iterations, 3);
    assert!(!result.response.is_empty());
}

#[cfg(unix)]
#[tokio::test]
async fn killed_host_breaks_the_session() {
    let mut client = connect().await;
    let pid = client.process_id().expect("host should be running");

    let status = std::process::Command::new("kill")
        .args(["-9", &pid.to_string()])
        .status()
        .expect("kill should run");
    assert!(status.success());
    tokio::time::sleep(Duration::from_millis(200)).await;

    let err = client.call("echo", &args(&[("text", "hi")])).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(_)), "got {err:?}");
    assert!(err.is_fatal());
    assert!(client.is_closed());

    client.close().await;
    client.close().await;
}

#[tokio::test]
async fn closing_twice_is_harmless() {
    let mut client = connect().await;
    client.close().await;
    client.close().await;
    let err = client.call("echo", &args(&[("text", "hi")])).await.unwrap_err();
    assert!(matches!(err, ClientError::Transport(TransportError::Closed)));
}

#[tokio::test]
async fn missing_host_binary_fails_to_connect() {
    let err = Client::connect("/nonexistent/tether-host", &[], config())
        .await
        .unwrap_err();
    assert!(matches!(err, ClientError::Spawn { .. }));
}

// ── Raw frames ─────────────────────────────────────────────────────

/// Write `frames` to a fresh host, close its stdin, and collect every line
/// it prints before exiting.
async fn raw_exchange(frames: &[&str]) -> Vec<serde_json::Value> {
    let mut child = Command::new(HOST)
        .args(host_args())
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::null())
        .kill_on_drop(true)
        .spawn()
        .unwrap();

    let mut stdin = child.stdin.take().unwrap();
    for frame in frames {
        stdin.write_all(frame.as_bytes()).await.unwrap();
        stdin.write_all(b"\n").await.unwrap();
    }
    drop(stdin);

    let mut lines = BufReader::new(child.stdout.take().unwrap()).lines();
    let mut replies = Vec::new();
    while let Some(line) = tokio::time::timeout(Duration::from_secs(10), lines.next_line())
        .await
        .unwrap()
        .unwrap()
    {
        replies.push(serde_json::from_str(&line).unwrap());
    }
    assert!(child.wait().await.unwrap().success());
    replies
}

#[tokio::test]
async fn ids_are_echoed_verbatim() {
    let replies = raw_exchange(&[
        r#"{"jsonrpc":"2.0","id":"abc","method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":null,"method":"tools/list"}"#,
        r#"{"jsonrpc":"2.0","id":7,"method":"tools/list"}"#,
    ])
    .await;
    let ids: Vec<_> = replies.iter().map(|r| r["id"].clone()).collect();
    assert_eq!(
        ids,
        vec![serde_json::json!("abc"), serde_json::Value::Null, serde_json::json!(7)]
    );
}

#[tokio::test]
async fn malformed_and_unknown_frames_get_error_replies() {
    let replies = raw_exchange(&[
        "this is not json",
        r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        r#"{"jsonrpc":"2.0","id":2,"method":"resources/list"}"#,
        r#"{"jsonrpc":"2.0","id":3,"method":"tools/call","params":{"name":"echo","arguments":{"text":5}}}"#,
    ])
    .await;
    assert_eq!(replies.len(), 3, "notifications get no reply: {replies:?}");

    let code = |reply: &serde_json::Value| reply["error"]["code"].as_i64();
    assert_eq!(code(&replies[0]), Some(codes::PARSE_ERROR));
    assert!(replies[0]["id"].is_null());
    assert_eq!(code(&replies[1]), Some(codes::METHOD_NOT_FOUND));
    assert_eq!(replies[2]["id"], 3);
    assert_eq!(replies[2]["result"]["content"][0]["text"], "5");
    assert_eq!(replies[2]["result"]["isError"], false);
}
