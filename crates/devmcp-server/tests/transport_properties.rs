//! Transport property tests against a real server on an ephemeral port.
//!
//! Covers: the handshake/ack/stream-response scenario, session isolation,
//! unknown-session rejection, response correlation under concurrent
//! requests, validation-before-execution over the wire, and disconnect
//! cleanup.

mod support;

use serde_json::{Value, json};
use std::time::Duration;

use support::{SseClient, call_tool_request, post_with_header, start_test_server};

const WAIT: Duration = Duration::from_secs(5);
const QUIET: Duration = Duration::from_millis(300);

fn response_text(message: &Value) -> &str {
    message["result"]["content"][0]["text"]
        .as_str()
        .unwrap_or_default()
}

#[tokio::test]
async fn handshake_ack_and_streamed_response() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();

    // Open stream, receive handshake with the session id.
    let mut client = SseClient::connect(&base).await;
    assert!(!client.session_id.is_empty());
    assert!(client.messages_url.contains("/__mcp/messages?sessionId="));

    // Post a request; the POST itself returns a bare acknowledgement.
    let request = call_tool_request(1, "add", json!({"a": 2, "b": 3}));
    let ack = post_with_header(&http, &base, &client.session_id, &request).await;
    assert_eq!(ack.status(), reqwest::StatusCode::ACCEPTED);
    let ack_body: Value = ack.json().await.unwrap();
    assert_eq!(ack_body["status"], "accepted");
    assert!(ack_body.get("result").is_none(), "ack must not carry the RPC result");

    // The actual result arrives on the stream, correlated by id.
    let message = client.next_message(WAIT).await.expect("no response on stream");
    assert_eq!(message["id"], 1);
    assert_eq!(
        message["result"]["content"][0],
        json!({"type": "text", "text": "5"})
    );

    server.stop().await;
}

#[tokio::test]
async fn session_id_accepted_via_query_parameter() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();
    let mut client = SseClient::connect(&base).await;

    // The handshake URL already carries sessionId as a query parameter.
    let ack = http
        .post(&client.messages_url)
        .body(call_tool_request(7, "add", json!({"a": 1, "b": 1})).to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(ack.status(), reqwest::StatusCode::ACCEPTED);

    let message = client.next_message(WAIT).await.unwrap();
    assert_eq!(message["id"], 7);
    assert_eq!(response_text(&message), "2");

    server.stop().await;
}

#[tokio::test]
async fn sessions_are_isolated() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();

    let mut client_a = SseClient::connect(&base).await;
    let mut client_b = SseClient::connect(&base).await;
    assert_ne!(client_a.session_id, client_b.session_id);

    let req_a = call_tool_request(1, "add", json!({"a": 2, "b": 3}));
    let req_b = call_tool_request(2, "add", json!({"a": 10, "b": 20}));
    post_with_header(&http, &base, &client_a.session_id, &req_a).await;
    post_with_header(&http, &base, &client_b.session_id, &req_b).await;

    let message_a = client_a.next_message(WAIT).await.unwrap();
    assert_eq!(message_a["id"], 1);
    assert_eq!(response_text(&message_a), "5");

    let message_b = client_b.next_message(WAIT).await.unwrap();
    assert_eq!(message_b["id"], 2);
    assert_eq!(response_text(&message_b), "30");

    // Neither stream carries the other's output.
    assert!(client_a.next_message(QUIET).await.is_none());
    assert!(client_b.next_message(QUIET).await.is_none());

    server.stop().await;
}

#[tokio::test]
async fn unknown_or_missing_session_is_rejected_on_the_post() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();
    let request = call_tool_request(1, "add", json!({"a": 1, "b": 2}));

    // Never-opened session id.
    let response = post_with_header(&http, &base, "no-such-session", &request).await;
    assert_eq!(response.status(), reqwest::StatusCode::NOT_FOUND);
    let body: Value = response.json().await.unwrap();
    assert!(body["error"].as_str().unwrap().contains("no-such-session"));

    // No session id at all.
    let response = http
        .post(format!("{base}/__mcp/messages"))
        .body(request.to_string())
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);

    server.stop().await;
}

#[tokio::test]
async fn responses_correlate_under_concurrent_requests() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();
    let mut client = SseClient::connect(&base).await;

    // A slow request posted first, then several fast ones.
    let slow = call_tool_request(1, "slow", json!({"ms": 500, "reply": "slow-done"}));
    post_with_header(&http, &base, &client.session_id, &slow).await;
    for id in 2..=6 {
        let fast = call_tool_request(id, "add", json!({"a": id, "b": 0}));
        post_with_header(&http, &base, &client.session_id, &fast).await;
    }

    let mut seen = Vec::new();
    for _ in 1..=6 {
        let message = client.next_message(WAIT).await.expect("missing response");
        seen.push(message["id"].as_i64().unwrap());
    }

    // Delivery is completion order: the slow request finishes last.
    assert_eq!(*seen.last().unwrap(), 1);

    // Every id appears exactly once.
    seen.sort_unstable();
    assert_eq!(seen, vec![1, 2, 3, 4, 5, 6]);

    server.stop().await;
}

#[tokio::test]
async fn invalid_params_yield_a_structured_error_on_the_stream() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();
    let mut client = SseClient::connect(&base).await;

    let bad = call_tool_request(3, "add", json!({"a": "two"}));
    let ack = post_with_header(&http, &base, &client.session_id, &bad).await;
    assert_eq!(ack.status(), reqwest::StatusCode::ACCEPTED);

    let message = client.next_message(WAIT).await.unwrap();
    assert_eq!(message["id"], 3);
    assert_eq!(message["error"]["code"], -32602);
    assert!(message["error"]["data"].is_array());

    server.stop().await;
}

#[tokio::test]
async fn handler_failure_detail_stays_server_side() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();
    let mut client = SseClient::connect(&base).await;

    let request = call_tool_request(4, "fail", json!({}));
    post_with_header(&http, &base, &client.session_id, &request).await;

    let message = client.next_message(WAIT).await.unwrap();
    assert_eq!(message["id"], 4);
    assert_eq!(message["error"]["code"], -32603);
    let wire = message.to_string();
    assert!(!wire.contains("secret internal detail"));

    server.stop().await;
}

#[tokio::test]
async fn malformed_body_is_rejected_on_the_post() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();
    let client = SseClient::connect(&base).await;

    let response = http
        .post(format!("{base}/__mcp/messages"))
        .header("x-session-id", &client.session_id)
        .body("{this is not json")
        .send()
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::BAD_REQUEST);
    let body: Value = response.json().await.unwrap();
    assert_eq!(body["error"]["code"], -32700);
    assert_eq!(body["id"], Value::Null);

    client.disconnect();
    server.stop().await;
}

#[tokio::test]
async fn disconnect_evicts_the_session() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();

    let client = SseClient::connect(&base).await;
    let session_id = client.session_id.clone();
    assert_eq!(server.session_count(), 1);

    client.disconnect();

    // Eviction is bounded: the post must start failing with 404.
    let request = call_tool_request(9, "add", json!({"a": 1, "b": 1}));
    let deadline = tokio::time::Instant::now() + WAIT;
    loop {
        let response = post_with_header(&http, &base, &session_id, &request).await;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            break;
        }
        assert!(
            tokio::time::Instant::now() < deadline,
            "session was not evicted after disconnect"
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
    }
    assert_eq!(server.session_count(), 0);

    server.stop().await;
}

#[tokio::test]
async fn notifications_are_accepted_without_a_response() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();
    let mut client = SseClient::connect(&base).await;

    let notification = json!({
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    });
    let ack = post_with_header(&http, &base, &client.session_id, &notification).await;
    assert_eq!(ack.status(), reqwest::StatusCode::ACCEPTED);

    // No envelope is produced for a notification.
    assert!(client.next_message(QUIET).await.is_none());

    server.stop().await;
}

#[tokio::test]
async fn initialize_and_list_tools_over_the_wire() {
    let (mut server, base) = start_test_server().await;
    let http = reqwest::Client::new();
    let mut client = SseClient::connect(&base).await;

    let init = json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}});
    post_with_header(&http, &base, &client.session_id, &init).await;
    let message = client.next_message(WAIT).await.unwrap();
    assert_eq!(message["result"]["serverInfo"]["name"], "test-bridge");
    assert!(message["result"]["capabilities"].get("tools").is_some());

    let list = json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"});
    post_with_header(&http, &base, &client.session_id, &list).await;
    let message = client.next_message(WAIT).await.unwrap();
    let tools = message["result"]["tools"].as_array().unwrap();
    let names: Vec<&str> = tools.iter().filter_map(|t| t["name"].as_str()).collect();
    assert!(names.contains(&"add"));
    assert!(names.contains(&"slow"));

    server.stop().await;
}
