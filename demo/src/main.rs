//! Minimal devmcp bridge: registers an `add` tool and a fake host
//! inspector, then serves until interrupted.
//!
//! Try it:
//! ```sh
//! cargo run -p devmcp-demo
//! curl -N http://127.0.0.1:3001/__mcp/sse
//! ```

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use devmcp_protocol::{CallToolResult, Implementation, McpResult, Tool};
use devmcp_server::{HostCapabilities, HostInspector, McpServer, ServerConfig};

struct DemoHost;

#[async_trait]
impl HostInspector for DemoHost {
    async fn config_json(&self) -> McpResult<Value> {
        Ok(json!({
            "root": std::env::current_dir().ok(),
            "mode": "development",
        }))
    }

    async fn routes(&self) -> McpResult<Value> {
        Ok(json!([
            {"path": "/", "name": "index"},
            {"path": "/about", "name": "about"},
        ]))
    }
}

#[tokio::main]
async fn main() -> McpResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .init();

    let mut server = McpServer::new(
        Implementation::new("devmcp-demo", env!("CARGO_PKG_VERSION")),
        ServerConfig::default(),
    );

    server.register_tool(
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
            Ok(CallToolResult::text((a + b).to_string()))
        },
    )?;

    server.register_host(Arc::new(DemoHost), HostCapabilities::none().with_routes())?;

    server.run_until_shutdown().await
}
