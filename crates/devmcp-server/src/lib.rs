//! # devmcp-server
//!
//! An embeddable MCP bridge for web dev servers. A running dev server
//! constructs one [`McpServer`] per process, registers its tools,
//! resources, and prompts, and starts the streaming transport; an external
//! AI agent then connects over HTTP + Server-Sent-Events and invokes the
//! registered capabilities via JSON-RPC 2.0.
//!
//! ## Architecture
//!
//! - [`registry::HandlerRegistry`] - named, schema-validated handlers in
//!   three namespaces (tools, resources, prompts)
//! - [`routing::RequestRouter`] - decodes and dispatches inbound requests
//! - [`session::SessionRegistry`] - one [`session::Session`] per connected
//!   client, owning that client's outbound event stream
//! - [`transport`] - the two HTTP endpoints: a long-lived SSE stream and a
//!   short-lived message post endpoint
//! - [`server::McpServer`] - the facade tying identity, registry, config,
//!   and lifecycle together
//!
//! ## The one subtle protocol property
//!
//! A posted request is only *acknowledged* on the POST call; the RPC
//! result travels asynchronously over the SSE stream of the session named
//! by the request. Nothing in this crate ever answers a POST with an RPC
//! result directly.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use devmcp_protocol::{CallToolResult, Implementation, Tool};
//! use devmcp_server::{McpServer, ServerConfig};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> devmcp_protocol::McpResult<()> {
//!     let mut server = McpServer::new(
//!         Implementation::new("my-dev-server", "1.0.0"),
//!         ServerConfig::default(),
//!     );
//!
//!     server.register_tool(
//!         Tool::new("add", "Add two numbers", json!({
//!             "type": "object",
//!             "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
//!             "required": ["a", "b"]
//!         })),
//!         |req| async move {
//!             let args = req.arguments.unwrap_or_default();
//!             let sum = args["a"].as_f64().unwrap_or(0.0) + args["b"].as_f64().unwrap_or(0.0);
//!             Ok(CallToolResult::text(sum.to_string()))
//!         },
//!     )?;
//!
//!     server.run_until_shutdown().await
//! }
//! ```

pub mod builtin;
pub mod capabilities;
pub mod config;
pub mod handler;
pub mod registry;
pub mod routing;
pub mod server;
pub mod session;
pub mod transport;

pub use builtin::HostInspector;
pub use capabilities::HostCapabilities;
pub use config::{EditorConfig, ServerConfig};
pub use handler::{
    FunctionPromptHandler, FunctionResourceHandler, FunctionToolHandler, PromptHandler,
    ResourceHandler, ToolHandler,
};
pub use registry::HandlerRegistry;
pub use routing::RequestRouter;
pub use server::McpServer;
pub use session::{Session, SessionEvent, SessionRegistry};

// The protocol crate is part of the public API surface.
pub use devmcp_protocol as protocol;
pub use devmcp_protocol::{ErrorKind, McpError, McpResult};
