//! # devmcp-protocol
//!
//! Wire-level types for the devmcp dev-server bridge: JSON-RPC 2.0
//! envelopes, the text codec used over the SSE transport, MCP data types
//! (tools, resources, prompts, content blocks), and the unified error
//! taxonomy shared by the server crate.
//!
//! This crate is a leaf: pure data transformation, no I/O, no runtime.

pub mod error;
pub mod jsonrpc;
pub mod types;

pub use error::{ErrorKind, McpError, McpResult};
pub use jsonrpc::{
    JsonRpcError, JsonRpcMessage, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse,
    JsonRpcResponsePayload, RequestId, ResponseId, decode_message, encode_message,
};
pub use types::{
    CallToolRequest, CallToolResult, CapabilitySection, Content, GetPromptRequest, GetPromptResult,
    Implementation, InitializeResult, ListPromptsResult, ListResourcesResult, ListToolsResult,
    Prompt, PromptArgument, PromptMessage, ReadResourceRequest, ReadResourceResult, Resource,
    ResourceContents, Role, ServerCapabilities, TextContent, Tool,
};

/// MCP protocol revision this bridge speaks.
pub const PROTOCOL_VERSION: &str = "2025-06-18";
