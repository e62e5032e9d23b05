//! Shared helpers for the real-network transport tests: a server factory
//! with a few test tools, and a minimal SSE client over reqwest.

use futures::StreamExt;
use serde_json::{Value, json};
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::timeout;

use devmcp_protocol::{CallToolResult, Implementation, McpError, Tool};
use devmcp_server::{McpServer, ServerConfig};

/// Start a server on an ephemeral port with `add`, `slow`, and `fail`
/// tools registered. Returns the server (keep it alive!) and its base URL.
pub async fn start_test_server() -> (McpServer, String) {
    let config = ServerConfig {
        port: 0,
        print_url: false,
        keep_alive_interval: Duration::from_secs(1),
        ..Default::default()
    };
    let mut server = McpServer::new(Implementation::new("test-bridge", "0.0.0"), config);

    server
        .register_tool(
            Tool::new(
                "add",
                "Add two numbers",
                json!({
                    "type": "object",
                    "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                    "required": ["a", "b"]
                }),
            ),
            |req| async move {
                let args = req.arguments.unwrap_or_default();
                let a = args.get("a").and_then(Value::as_f64).unwrap_or(0.0);
                let b = args.get("b").and_then(Value::as_f64).unwrap_or(0.0);
                let sum = a + b;
                let text = if sum.fract() == 0.0 {
                    format!("{}", sum as i64)
                } else {
                    format!("{sum}")
                };
                Ok(CallToolResult::text(text))
            },
        )
        .unwrap();

    server
        .register_tool(
            Tool::new(
                "slow",
                "Reply after a delay",
                json!({
                    "type": "object",
                    "properties": {"ms": {"type": "number"}, "reply": {"type": "string"}},
                    "required": ["ms", "reply"]
                }),
            ),
            |req| async move {
                let args = req.arguments.unwrap_or_default();
                let ms = args.get("ms").and_then(Value::as_u64).unwrap_or(0);
                let reply = args
                    .get("reply")
                    .and_then(Value::as_str)
                    .unwrap_or_default()
                    .to_string();
                tokio::time::sleep(Duration::from_millis(ms)).await;
                Ok(CallToolResult::text(reply))
            },
        )
        .unwrap();

    server
        .register_tool(
            Tool::new("fail", "Always fails", json!({"type": "object"})),
            |_req| async { Err(McpError::internal("secret internal detail")) },
        )
        .unwrap();

    let addr = server.start().await.unwrap();
    (server, format!("http://{addr}"))
}

/// One parsed SSE event: (event name, data).
pub type SseEvent = (String, String);

/// Minimal SSE client: connects to the stream endpoint, consumes the
/// handshake, and exposes subsequent events through a channel.
pub struct SseClient {
    /// Session id announced in the handshake event
    pub session_id: String,
    /// Full URL of the message endpoint, including the sessionId query
    pub messages_url: String,
    events: mpsc::UnboundedReceiver<SseEvent>,
    reader: JoinHandle<()>,
}

impl SseClient {
    /// Connect and wait for the `endpoint` handshake event.
    pub async fn connect(base_url: &str) -> Self {
        let response = reqwest::get(format!("{base_url}/__mcp/sse"))
            .await
            .expect("SSE connect failed");
        assert_eq!(response.status(), reqwest::StatusCode::OK);

        let (tx, mut events) = mpsc::unbounded_channel();
        let reader = tokio::spawn(async move {
            let mut stream = response.bytes_stream();
            let mut buffer = String::new();
            while let Some(Ok(chunk)) = stream.next().await {
                buffer.push_str(&String::from_utf8_lossy(&chunk));
                while let Some(end) = buffer.find("\n\n") {
                    let block: String = buffer.drain(..end + 2).collect();
                    if let Some(event) = parse_sse_block(&block)
                        && tx.send(event).is_err()
                    {
                        return;
                    }
                }
            }
        });

        let (event, data) = timeout(Duration::from_secs(5), events.recv())
            .await
            .expect("timed out waiting for handshake")
            .expect("stream closed before handshake");
        assert_eq!(event, "endpoint", "first event must be the handshake");
        let session_id = data
            .rsplit("sessionId=")
            .next()
            .expect("handshake carries a sessionId")
            .to_string();

        Self {
            session_id,
            messages_url: format!("{base_url}{data}"),
            events,
            reader,
        }
    }

    /// Next `message` event parsed as JSON, or None on timeout.
    pub async fn next_message(&mut self, wait: Duration) -> Option<Value> {
        loop {
            match timeout(wait, self.events.recv()).await {
                Ok(Some((event, data))) if event == "message" => {
                    return Some(serde_json::from_str(&data).expect("message event is JSON"));
                }
                Ok(Some(_)) => continue,
                Ok(None) | Err(_) => return None,
            }
        }
    }

    /// True once the server has ended the stream.
    pub async fn stream_closed(&mut self, wait: Duration) -> bool {
        loop {
            match timeout(wait, self.events.recv()).await {
                Ok(Some(_)) => continue,
                Ok(None) => return true,
                Err(_) => return false,
            }
        }
    }

    /// Tear the connection down from the client side.
    pub fn disconnect(self) {
        self.reader.abort();
    }
}

fn parse_sse_block(block: &str) -> Option<SseEvent> {
    let mut event = "message".to_string();
    let mut data_lines = Vec::new();
    for line in block.lines() {
        if let Some(rest) = line.strip_prefix("event:") {
            event = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("data:") {
            data_lines.push(rest.trim_start().to_string());
        }
        // Lines starting with ':' are keep-alive comments.
    }
    if data_lines.is_empty() {
        None
    } else {
        Some((event, data_lines.join("\n")))
    }
}

/// Post one JSON-RPC body to the message endpoint with the session id in
/// the `x-session-id` header.
pub async fn post_with_header(
    client: &reqwest::Client,
    base_url: &str,
    session_id: &str,
    body: &Value,
) -> reqwest::Response {
    client
        .post(format!("{base_url}/__mcp/messages"))
        .header("x-session-id", session_id)
        .body(body.to_string())
        .send()
        .await
        .expect("POST failed")
}

/// A well-formed tools/call request envelope.
pub fn call_tool_request(id: i64, tool: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": {"name": tool, "arguments": arguments}
    })
}
