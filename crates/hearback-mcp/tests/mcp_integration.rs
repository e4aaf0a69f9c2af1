#![cfg(unix)]
#![allow(clippy::unwrap_used, clippy::expect_used)]

//! Integration tests for the hearback-mcp crate.
//!
//! Drives a real `McpServer` over an in-memory duplex stream, with `sh`
//! scripts standing in for the collection agent.

use hearback_mcp::{feedback_registry, McpServer};
use hearback_session::{AgentCommand, CoordinatorConfig, SessionCoordinator};
use std::sync::Arc;
use tempfile::TempDir;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader, DuplexStream, Lines, ReadHalf, WriteHalf};
use tokio::task::JoinHandle;

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

struct Client {
    writer: WriteHalf<DuplexStream>,
    lines: Lines<BufReader<ReadHalf<DuplexStream>>>,
    server: JoinHandle<hearback_core::HearbackResult<()>>,
    _dirs: (TempDir, TempDir),
}

impl Client {
    async fn send(&mut self, message: serde_json::Value) {
        self.send_raw(&message.to_string()).await;
    }

    async fn send_raw(&mut self, line: &str) {
        self.writer.write_all(line.as_bytes()).await.unwrap();
        self.writer.write_all(b"\n").await.unwrap();
        self.writer.flush().await.unwrap();
    }

    async fn recv(&mut self) -> serde_json::Value {
        let line = tokio::time::timeout(std::time::Duration::from_secs(10), self.lines.next_line())
            .await
            .expect("server did not answer in time")
            .unwrap()
            .expect("server closed the stream");
        serde_json::from_str(&line).unwrap()
    }
}

/// Start a server whose collection agent is `sh -c <script> stub ...`.
fn start(script: &str) -> Client {
    let channels = tempfile::tempdir().unwrap();
    let storage = tempfile::tempdir().unwrap();
    let agent = AgentCommand::new("sh").with_args(["-c", script, "stub"]);
    let config = CoordinatorConfig::new(agent, storage.path()).with_channel_dir(channels.path());
    let coordinator = Arc::new(SessionCoordinator::new(config));
    let registry = Arc::new(feedback_registry(coordinator));

    let (client_io, server_io) = tokio::io::duplex(64 * 1024);
    let (server_read, server_write) = tokio::io::split(server_io);
    let server = tokio::spawn(
        McpServer::new(registry, "hearback", "test").serve(server_read, server_write),
    );

    let (client_read, writer) = tokio::io::split(client_io);
    Client {
        writer,
        lines: BufReader::new(client_read).lines(),
        server,
        _dirs: (channels, storage),
    }
}

fn call(id: u64, arguments: serde_json::Value) -> serde_json::Value {
    serde_json::json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": "interactive_feedback", "arguments": arguments}
    })
}

const HELLO_AGENT: &str = r#"printf '%s' '{"interactive_feedback":"hello"}' > "$4""#;

// ---------------------------------------------------------------------------
// 1. Handshake and discovery
// ---------------------------------------------------------------------------

#[tokio::test]
async fn initialize_reports_server_info() {
    let mut client = start(HELLO_AGENT);
    client
        .send(serde_json::json!({
            "jsonrpc": "2.0", "id": 1, "method": "initialize",
            "params": {"protocolVersion": "2024-11-05", "capabilities": {},
                       "clientInfo": {"name": "test", "version": "1"}}
        }))
        .await;

    let resp = client.recv().await;
    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"]["protocolVersion"], "2024-11-05");
    assert_eq!(resp["result"]["serverInfo"]["name"], "hearback");
    assert!(resp["result"]["capabilities"]["tools"].is_object());
}

#[tokio::test]
async fn notifications_get_no_response() {
    let mut client = start(HELLO_AGENT);
    client
        .send(serde_json::json!({"jsonrpc": "2.0", "method": "notifications/initialized"}))
        .await;
    client
        .send(serde_json::json!({"jsonrpc": "2.0", "id": "p", "method": "ping"}))
        .await;

    let resp = client.recv().await;
    assert_eq!(resp["id"], "p");
    assert_eq!(resp["result"], serde_json::json!({}));
}

#[tokio::test]
async fn null_id_request_is_answered() {
    let mut client = start(HELLO_AGENT);
    client
        .send(serde_json::json!({"jsonrpc": "2.0", "id": null, "method": "ping"}))
        .await;

    let resp = client.recv().await;
    assert!(resp["id"].is_null());
    assert_eq!(resp["result"], serde_json::json!({}));
}

#[tokio::test]
async fn tools_list_describes_feedback_tool() {
    let mut client = start(HELLO_AGENT);
    client
        .send(serde_json::json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}))
        .await;

    let resp = client.recv().await;
    let tools = resp["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 1);
    assert_eq!(tools[0]["name"], "interactive_feedback");
    assert_eq!(tools[0]["inputSchema"]["required"], serde_json::json!(["message"]));
}

// ---------------------------------------------------------------------------
// 2. Tool calls
// ---------------------------------------------------------------------------

#[tokio::test]
async fn tools_call_returns_feedback() {
    let mut client = start(HELLO_AGENT);
    client.send(call(3, serde_json::json!({"message": "Done?"}))).await;

    let resp = client.recv().await;
    assert_eq!(resp["id"], 3);
    assert_eq!(resp["result"]["isError"], false);
    let text = resp["result"]["content"][0]["text"].as_str().unwrap();
    let feedback: serde_json::Value = serde_json::from_str(text).unwrap();
    assert_eq!(
        feedback,
        serde_json::json!({"interactive_feedback": "hello", "attachments": []})
    );
}

#[tokio::test]
async fn tools_call_passes_options_to_agent() {
    let mut client = start(r#"printf '{"interactive_feedback":"%s"}' "$6" > "$4""#);
    client
        .send(call(
            4,
            serde_json::json!({"message": "Pick", "predefined_options": ["A", "B"]}),
        ))
        .await;

    let resp = client.recv().await;
    let text = resp["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("A|||B"), "got {text}");
}

#[tokio::test]
async fn tools_call_without_message_is_tool_error() {
    let mut client = start(HELLO_AGENT);
    client.send(call(5, serde_json::json!({}))).await;

    let resp = client.recv().await;
    assert_eq!(resp["result"]["isError"], true);
    assert!(resp["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("message"));
}

#[tokio::test]
async fn failing_agent_is_tool_error() {
    let mut client = start("exit 2");
    client.send(call(6, serde_json::json!({"message": "?"}))).await;

    let resp = client.recv().await;
    assert_eq!(resp["result"]["isError"], true);
    assert!(resp["result"]["content"][0]["text"]
        .as_str()
        .unwrap()
        .contains("status 2"));
}

#[tokio::test]
async fn pending_call_does_not_block_other_requests() {
    let mut client = start(
        r#"sleep 0.5; printf '%s' '{"interactive_feedback":"late"}' > "$4""#,
    );
    client.send(call(7, serde_json::json!({"message": "slow"}))).await;
    client
        .send(serde_json::json!({"jsonrpc": "2.0", "id": 8, "method": "ping"}))
        .await;

    let first = client.recv().await;
    assert_eq!(first["id"], 8, "ping should overtake the pending call");
    let second = client.recv().await;
    assert_eq!(second["id"], 7);
    assert_eq!(second["result"]["isError"], false);
}

// ---------------------------------------------------------------------------
// 3. Protocol errors and shutdown
// ---------------------------------------------------------------------------

#[tokio::test]
async fn garbage_line_is_parse_error() {
    let mut client = start(HELLO_AGENT);
    client.send_raw("this is not json").await;

    let resp = client.recv().await;
    assert!(resp["id"].is_null());
    assert_eq!(resp["error"]["code"], -32700);
}

#[tokio::test]
async fn unknown_method_is_method_not_found() {
    let mut client = start(HELLO_AGENT);
    client
        .send(serde_json::json!({"jsonrpc": "2.0", "id": 9, "method": "prompts/list"}))
        .await;

    let resp = client.recv().await;
    assert_eq!(resp["id"], 9);
    assert_eq!(resp["error"]["code"], -32601);
}

#[tokio::test]
async fn server_stops_when_client_disconnects() {
    let client = start(HELLO_AGENT);
    let Client {
        writer,
        lines,
        server,
        _dirs,
    } = client;
    drop(writer);
    drop(lines);

    let outcome = tokio::time::timeout(std::time::Duration::from_secs(5), server)
        .await
        .expect("server should stop after EOF")
        .unwrap();
    assert!(outcome.is_ok());
}
