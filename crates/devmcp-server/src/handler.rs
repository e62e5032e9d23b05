//! Handler traits and function-backed adapters.
//!
//! Handlers never touch the transport: they take validated params and
//! return a typed result or error. Only the streaming transport writes to
//! a session's outbound stream.

use async_trait::async_trait;
use futures::FutureExt;
use futures::future::BoxFuture;
use std::sync::Arc;

use devmcp_protocol::{
    CallToolRequest, CallToolResult, GetPromptRequest, GetPromptResult, McpResult, Prompt,
    ReadResourceRequest, ReadResourceResult, Resource, Tool,
};

/// Tool handler trait for processing tool calls.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Handle a tool call whose arguments already passed schema validation.
    async fn handle(&self, request: CallToolRequest) -> McpResult<CallToolResult>;

    /// Get the tool definition.
    fn tool_definition(&self) -> Tool;
}

/// Resource handler trait for processing resource reads.
#[async_trait]
pub trait ResourceHandler: Send + Sync {
    /// Handle a resource read request.
    async fn handle(&self, request: ReadResourceRequest) -> McpResult<ReadResourceResult>;

    /// Get the resource definition.
    fn resource_definition(&self) -> Resource;
}

/// Prompt handler trait for processing prompt requests.
#[async_trait]
pub trait PromptHandler: Send + Sync {
    /// Handle a prompt request.
    async fn handle(&self, request: GetPromptRequest) -> McpResult<GetPromptResult>;

    /// Get the prompt definition.
    fn prompt_definition(&self) -> Prompt;
}

type ToolFn =
    Arc<dyn Fn(CallToolRequest) -> BoxFuture<'static, McpResult<CallToolResult>> + Send + Sync>;
type ResourceFn = Arc<
    dyn Fn(ReadResourceRequest) -> BoxFuture<'static, McpResult<ReadResourceResult>> + Send + Sync,
>;
type PromptFn =
    Arc<dyn Fn(GetPromptRequest) -> BoxFuture<'static, McpResult<GetPromptResult>> + Send + Sync>;

/// Tool handler backed by an async function or closure.
pub struct FunctionToolHandler {
    definition: Tool,
    func: ToolFn,
}

impl FunctionToolHandler {
    /// Wrap an async function as a tool handler.
    pub fn new<F, Fut>(definition: Tool, func: F) -> Self
    where
        F: Fn(CallToolRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<CallToolResult>> + Send + 'static,
    {
        Self {
            definition,
            func: Arc::new(move |req| func(req).boxed()),
        }
    }
}

#[async_trait]
impl ToolHandler for FunctionToolHandler {
    async fn handle(&self, request: CallToolRequest) -> McpResult<CallToolResult> {
        (self.func)(request).await
    }

    fn tool_definition(&self) -> Tool {
        self.definition.clone()
    }
}

/// Resource handler backed by an async function or closure.
pub struct FunctionResourceHandler {
    definition: Resource,
    func: ResourceFn,
}

impl FunctionResourceHandler {
    /// Wrap an async function as a resource handler.
    pub fn new<F, Fut>(definition: Resource, func: F) -> Self
    where
        F: Fn(ReadResourceRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<ReadResourceResult>> + Send + 'static,
    {
        Self {
            definition,
            func: Arc::new(move |req| func(req).boxed()),
        }
    }
}

#[async_trait]
impl ResourceHandler for FunctionResourceHandler {
    async fn handle(&self, request: ReadResourceRequest) -> McpResult<ReadResourceResult> {
        (self.func)(request).await
    }

    fn resource_definition(&self) -> Resource {
        self.definition.clone()
    }
}

/// Prompt handler backed by an async function or closure.
pub struct FunctionPromptHandler {
    definition: Prompt,
    func: PromptFn,
}

impl FunctionPromptHandler {
    /// Wrap an async function as a prompt handler.
    pub fn new<F, Fut>(definition: Prompt, func: F) -> Self
    where
        F: Fn(GetPromptRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<GetPromptResult>> + Send + 'static,
    {
        Self {
            definition,
            func: Arc::new(move |req| func(req).boxed()),
        }
    }
}

#[async_trait]
impl PromptHandler for FunctionPromptHandler {
    async fn handle(&self, request: GetPromptRequest) -> McpResult<GetPromptResult> {
        (self.func)(request).await
    }

    fn prompt_definition(&self) -> Prompt {
        self.definition.clone()
    }
}
