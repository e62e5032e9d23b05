//! Request routing and handler dispatch.
//!
//! The router turns one decoded request envelope into exactly one
//! response envelope. Dispatch order per request: method lookup, then
//! schema validation of the params, then handler invocation. A handler
//! failure is reported to the client with a generic message; the
//! underlying detail is logged server-side only.

use serde_json::{Value, json};
use std::sync::Arc;
use tracing::{debug, error};

use devmcp_protocol::{
    CallToolRequest, CapabilitySection, ErrorKind, GetPromptRequest, Implementation,
    InitializeResult, JsonRpcNotification, JsonRpcRequest, JsonRpcResponse, ListPromptsResult,
    ListResourcesResult, ListToolsResult, McpError, McpResult, PROTOCOL_VERSION,
    ReadResourceRequest, ServerCapabilities,
};

use crate::registry::HandlerRegistry;

/// Dispatches decoded requests into the handler registry.
pub struct RequestRouter {
    registry: Arc<HandlerRegistry>,
    server_info: Implementation,
}

impl std::fmt::Debug for RequestRouter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RequestRouter")
            .field("server_info", &self.server_info)
            .field("registry", &self.registry)
            .finish()
    }
}

impl RequestRouter {
    /// Create a router over the given registry.
    pub fn new(registry: Arc<HandlerRegistry>, server_info: Implementation) -> Self {
        Self {
            registry,
            server_info,
        }
    }

    /// Handle one request, always producing a response correlated by the
    /// request's id. Errors never escape: they become structured error
    /// responses.
    pub async fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!(method = %request.method, id = %request.id, "dispatching request");

        match self.dispatch(&request.method, request.params).await {
            Ok(result) => JsonRpcResponse::success(request.id, result),
            Err(err) => {
                match err.kind {
                    // Client-caused; routine at debug level.
                    ErrorKind::UnknownMethod | ErrorKind::InvalidParams => {
                        debug!(method = %request.method, %err, "request rejected");
                    }
                    _ => {
                        error!(
                            method = %request.method,
                            %err,
                            detail = err.detail.as_deref().unwrap_or(""),
                            "request failed"
                        );
                    }
                }
                JsonRpcResponse::error(request.id, err.to_json_rpc_error())
            }
        }
    }

    /// Handle a notification. No response is produced.
    pub async fn handle_notification(&self, notification: JsonRpcNotification) {
        debug!(method = %notification.method, "notification received");
    }

    async fn dispatch(&self, method: &str, params: Option<Value>) -> McpResult<Value> {
        match method {
            "initialize" => self.initialize(),
            "ping" => Ok(json!({})),
            "tools/list" => to_value(ListToolsResult {
                tools: self.registry.list_tools(),
            }),
            "tools/call" => self.call_tool(params).await,
            "resources/list" => to_value(ListResourcesResult {
                resources: self.registry.list_resources(),
            }),
            "resources/read" => self.read_resource(params).await,
            "prompts/list" => to_value(ListPromptsResult {
                prompts: self.registry.list_prompts(),
            }),
            "prompts/get" => self.get_prompt(params).await,
            other => Err(McpError::unknown_method(other)),
        }
    }

    fn initialize(&self) -> McpResult<Value> {
        let section = |present: bool| present.then(CapabilitySection::default);
        to_value(InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            server_info: self.server_info.clone(),
            capabilities: ServerCapabilities {
                tools: section(self.registry.tool_count() > 0),
                resources: section(self.registry.resource_count() > 0),
                prompts: section(self.registry.prompt_count() > 0),
            },
        })
    }

    async fn call_tool(&self, params: Option<Value>) -> McpResult<Value> {
        let request: CallToolRequest = parse_params(params)?;
        let entry = self.registry.get_tool(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorKind::UnknownMethod,
                format!("unknown tool: {}", request.name),
            )
        })?;

        // Validation happens before the handler body runs.
        let arguments = request
            .arguments
            .clone()
            .map_or_else(|| json!({}), Value::Object);
        entry.validate(&request.name, &arguments)?;

        let name = request.name.clone();
        let result = entry
            .handler
            .handle(request)
            .await
            .map_err(|e| wrap_handler_error(&name, e))?;
        to_value(result)
    }

    async fn read_resource(&self, params: Option<Value>) -> McpResult<Value> {
        let request: ReadResourceRequest = parse_params(params)?;
        let handler = self.registry.get_resource(&request.uri).ok_or_else(|| {
            McpError::new(
                ErrorKind::UnknownMethod,
                format!("unknown resource: {}", request.uri),
            )
        })?;

        let uri = request.uri.clone();
        let result = handler
            .handle(request)
            .await
            .map_err(|e| wrap_handler_error(&uri, e))?;
        to_value(result)
    }

    async fn get_prompt(&self, params: Option<Value>) -> McpResult<Value> {
        let request: GetPromptRequest = parse_params(params)?;
        let handler = self.registry.get_prompt(&request.name).ok_or_else(|| {
            McpError::new(
                ErrorKind::UnknownMethod,
                format!("unknown prompt: {}", request.name),
            )
        })?;

        let name = request.name.clone();
        let result = handler
            .handle(request)
            .await
            .map_err(|e| wrap_handler_error(&name, e))?;
        to_value(result)
    }
}

fn parse_params<T: serde::de::DeserializeOwned>(params: Option<Value>) -> McpResult<T> {
    let value = params.unwrap_or_else(|| json!({}));
    serde_json::from_value(value).map_err(|e| McpError::invalid_params(format!("bad params: {e}")))
}

fn to_value<T: serde::Serialize>(value: T) -> McpResult<Value> {
    serde_json::to_value(value)
        .map_err(|e| McpError::internal(format!("serialization failed: {e}")))
}

/// Client-caused errors pass through; anything else from a handler body is
/// wrapped so raw failure detail stays out of the wire response.
fn wrap_handler_error(name: &str, err: McpError) -> McpError {
    match err.kind {
        ErrorKind::InvalidParams | ErrorKind::UnknownMethod => err,
        _ => McpError::handler(name, err.to_string()),
    }
}
