//! End-to-end MCP sessions over an in-memory transport.
//!
//! Drives [`serve`] with scripted JSON-RPC lines against the in-memory
//! native store, the same wiring `eventkit-mcp` uses with
//! `EVENTKIT_MCP_BACKEND=memory`.
#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::sync::Arc;

use eventkit_mcp::config::{StoreConfig, ToolMode};
use eventkit_mcp::mcp::{McpServer, PROTOCOL_VERSION, serve};
use eventkit_mcp::permissions::{AuthorizationStatus, PermissionGate, StaticAuthorization};
use eventkit_mcp::store::{ItemStore, MemoryNativeStore};
use eventkit_mcp::tools::build_registry;
use serde_json::{Value, json};
use tokio::io::BufReader;

// ─── Helpers ─────────────────────────────────────────────────────────────────

fn server(
    events: AuthorizationStatus,
    reminders: AuthorizationStatus,
    mode: ToolMode,
) -> Arc<McpServer> {
    let gate = Arc::new(PermissionGate::new(Arc::new(StaticAuthorization::new(
        events, reminders,
    ))));
    let store = Arc::new(ItemStore::new(
        Box::new(MemoryNativeStore::with_defaults()),
        gate,
        StoreConfig::default(),
        "Created by Claude Desktop",
    ));
    Arc::new(McpServer::new(
        Arc::new(build_registry(store, mode)),
        "apple-eventkit",
    ))
}

fn authorized(mode: ToolMode) -> Arc<McpServer> {
    server(
        AuthorizationStatus::Authorized,
        AuthorizationStatus::Authorized,
        mode,
    )
}

fn call(id: u64, name: &str, arguments: Value) -> String {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments },
    })
    .to_string()
}

async fn session(server: Arc<McpServer>, lines: &[String]) -> Vec<Value> {
    let mut input = lines.join("\n");
    input.push('\n');
    let mut output = Vec::new();
    serve(server, BufReader::new(input.as_bytes()), &mut output)
        .await
        .unwrap();
    String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect()
}

fn envelope(reply: &Value) -> &Value {
    &reply["result"]["structuredContent"]
}

// ─── Handshake ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn handshake_then_tool_listing() {
    let replies = session(
        authorized(ToolMode::Full),
        &[
            r#"{"jsonrpc":"2.0","id":0,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test","version":"1"}}}"#.to_owned(),
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#.to_owned(),
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#.to_owned(),
        ],
    )
    .await;

    assert_eq!(replies.len(), 2);
    assert_eq!(replies[0]["result"]["protocolVersion"], PROTOCOL_VERSION);
    assert_eq!(
        replies[0]["result"]["serverInfo"]["version"],
        env!("CARGO_PKG_VERSION")
    );

    let tools = replies[1]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 16);
    for tool in tools {
        assert!(!tool["description"].as_str().unwrap().is_empty());
        assert_eq!(tool["inputSchema"]["type"], "object");
    }
}

#[tokio::test]
async fn read_only_mode_hides_mutations() {
    let replies = session(
        authorized(ToolMode::ReadOnly),
        &[
            r#"{"jsonrpc":"2.0","id":1,"method":"tools/list"}"#.to_owned(),
            call(2, "create_reminder", json!({"title": "x"})),
        ],
    )
    .await;

    let tools = replies[0]["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 9);
    assert_eq!(replies[1]["error"]["code"], -32602);
}

// ─── Reminders ───────────────────────────────────────────────────────────────

#[tokio::test]
async fn reminder_lifecycle() {
    let server = authorized(ToolMode::Full);
    let created = session(
        Arc::clone(&server),
        &[call(
            1,
            "create_reminder",
            json!({
                "title": "Buy milk",
                "due_date": "2025-03-01T09:00:00",
                "priority": "high",
                "tags": ["Errand", "home"],
            }),
        )],
    )
    .await;
    let created = envelope(&created[0]);
    assert_eq!(created["success"], true);
    assert_eq!(created["reminder"]["priority"], "high");
    assert_eq!(created["reminder"]["tags"], json!(["errand", "home"]));
    let id = created["reminder"]["id"].as_str().unwrap().to_owned();

    let replies = session(
        Arc::clone(&server),
        &[
            call(2, "search_reminders", json!({"query": "milk", "tags": ["home"]})),
            call(3, "complete_reminder", json!({"id": id})),
            call(4, "list_reminders", json!({})),
            call(5, "list_reminders", json!({"include_completed": true})),
            call(6, "delete_reminder", json!({"id": id})),
            call(7, "get_reminder", json!({"id": id})),
        ],
    )
    .await;

    assert_eq!(envelope(&replies[0])["count"], 1);
    assert_eq!(envelope(&replies[0])["query"], "milk");

    let completed = envelope(&replies[1]);
    assert_eq!(completed["message"], "Reminder marked as completed");
    assert_eq!(completed["reminder"]["completed"], true);
    assert!(completed["reminder"]["completion_date"].is_string());

    assert_eq!(envelope(&replies[2])["count"], 0);
    assert_eq!(envelope(&replies[3])["count"], 1);

    assert_eq!(
        envelope(&replies[4]),
        &json!({"success": true, "message": "Reminder deleted successfully"})
    );
    assert_eq!(replies[5]["result"]["isError"], true);
    assert_eq!(envelope(&replies[5])["error"], "not_found");
}

#[tokio::test]
async fn reminders_denied_while_calendar_still_works() {
    let replies = session(
        server(
            AuthorizationStatus::Authorized,
            AuthorizationStatus::Denied,
            ToolMode::Full,
        ),
        &[
            call(1, "list_reminders", json!({})),
            call(2, "list_calendars", json!({})),
            call(3, "check_permissions", json!({})),
        ],
    )
    .await;

    let denied = envelope(&replies[0]);
    assert_eq!(denied["success"], false);
    assert_eq!(denied["error"], "permission_denied");
    assert!(denied["message"].as_str().unwrap().contains("Reminders"));

    assert_eq!(envelope(&replies[1])["success"], true);
    assert_eq!(envelope(&replies[1])["count"], 1);

    let report = envelope(&replies[2]);
    assert_eq!(report["all_authorized"], false);
    assert_eq!(report["calendar"]["authorized"], true);
    assert_eq!(report["reminders"]["status"], "denied");
    assert_eq!(report["instructions"].as_array().unwrap().len(), 1);
}

// ─── Events ──────────────────────────────────────────────────────────────────

#[tokio::test]
async fn event_lifecycle_with_tag_edits() {
    let server = authorized(ToolMode::Full);
    let created = session(
        Arc::clone(&server),
        &[call(
            1,
            "create_event",
            json!({
                "title": "Design review",
                "start": "2025-03-04T14:00:00",
                "end": "2025-03-04T15:00:00",
                "location": "Room 2",
                "notes": "Bring mockups",
                "tags": ["work"],
            }),
        )],
    )
    .await;
    let created = envelope(&created[0]);
    assert_eq!(created["message"], "Event 'Design review' created successfully");
    assert_eq!(created["event"]["calendar"], "Calendar");
    let id = created["event"]["id"].as_str().unwrap().to_owned();

    let replies = session(
        Arc::clone(&server),
        &[
            call(2, "list_events", json!({"start": "2025-03-04", "end": "2025-03-05"})),
            call(
                3,
                "search_events",
                json!({
                    "query": "review",
                    "start": "2025-03-01",
                    "end": "2025-03-31",
                    "tags": ["work"],
                }),
            ),
            call(
                4,
                "edit_event",
                json!({"id": id, "span": "this_event", "title": "Final review", "tags": []}),
            ),
            call(5, "get_event", json!({"id": id})),
            call(6, "delete_event", json!({"id": id, "span": "bogus"})),
            call(7, "delete_event", json!({"id": id, "span": "this_event"})),
        ],
    )
    .await;

    let listed = envelope(&replies[0]);
    assert_eq!(listed["count"], 1);
    assert!(listed["today"].is_object());

    assert_eq!(envelope(&replies[1])["count"], 1);

    let edited = envelope(&replies[2]);
    assert_eq!(edited["event"]["title"], "Final review");
    assert_eq!(edited["event"]["tags"], json!([]));

    let fetched = envelope(&replies[3]);
    assert_eq!(fetched["event"]["notes"], "Created by Claude Desktop\n\nBring mockups");
    assert_eq!(fetched["event"]["location"], "Room 2");

    assert_eq!(envelope(&replies[4])["error"], "invalid_span");
    assert_eq!(
        envelope(&replies[5])["message"],
        "Event deleted successfully"
    );
}

#[tokio::test]
async fn bad_dates_are_reported_in_the_envelope() {
    let replies = session(
        authorized(ToolMode::Full),
        &[call(1, "list_events", json!({"start": "tomorrow", "end": "2025-03-05"}))],
    )
    .await;

    let out = envelope(&replies[0]);
    assert_eq!(out["error"], "invalid_date");
    assert!(out["message"].as_str().unwrap().starts_with("Invalid date format: 'tomorrow'"));
}

#[tokio::test]
async fn requests_are_answered_in_order() {
    let lines: Vec<String> = (1..=5)
        .map(|id| json!({"jsonrpc": "2.0", "id": id, "method": "ping"}).to_string())
        .collect();
    let replies = session(authorized(ToolMode::Full), &lines).await;
    let ids: Vec<u64> = replies.iter().map(|r| r["id"].as_u64().unwrap()).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5]);
}

#[tokio::test]
async fn garbled_bytes_and_null_ids_are_answered() {
    let mut input = b"\xc3\x28 not utf-8\n".to_vec();
    input.extend_from_slice(br#"{"jsonrpc":"2.0","id":null,"method":"ping"}"#);
    input.push(b'\n');
    input.extend_from_slice(br#"{"jsonrpc":"2.0","id":9,"method":"ping"}"#);
    input.push(b'\n');

    let mut output = Vec::new();
    serve(authorized(ToolMode::Full), BufReader::new(input.as_slice()), &mut output)
        .await
        .unwrap();
    let replies: Vec<Value> = String::from_utf8(output)
        .unwrap()
        .lines()
        .map(|line| serde_json::from_str(line).unwrap())
        .collect();

    assert_eq!(replies.len(), 3);
    assert_eq!(replies[0]["error"]["code"], -32700);
    assert!(replies[0]["id"].is_null());
    assert!(replies[1]["id"].is_null());
    assert_eq!(replies[1]["result"], json!({}));
    assert_eq!(replies[2]["id"], 9);
}
