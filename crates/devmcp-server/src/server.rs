//! Server facade: identity, registration, and process lifecycle.

use std::net::SocketAddr;
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info, warn};

use devmcp_protocol::{
    CallToolRequest, CallToolResult, GetPromptRequest, GetPromptResult, Implementation, McpError,
    McpResult, Prompt, ReadResourceRequest, ReadResourceResult, Resource, Tool,
};

use crate::builtin::{self, HostInspector};
use crate::capabilities::HostCapabilities;
use crate::config::{self, ServerConfig};
use crate::handler::{
    FunctionPromptHandler, FunctionResourceHandler, FunctionToolHandler, PromptHandler,
    ResourceHandler, ToolHandler,
};
use crate::registry::HandlerRegistry;
use crate::routing::RequestRouter;
use crate::session::SessionRegistry;
use crate::transport::{self, TransportState};

/// The one object a host application constructs per process.
///
/// Handlers are registered before [`McpServer::start`] is called; the
/// registry is read-mostly once the transport accepts connections.
pub struct McpServer {
    server_info: Implementation,
    config: ServerConfig,
    registry: Arc<HandlerRegistry>,
    sessions: Arc<SessionRegistry>,
    shutdown: CancellationToken,
    serve_task: Option<JoinHandle<()>>,
    local_addr: Option<SocketAddr>,
}

impl std::fmt::Debug for McpServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpServer")
            .field("server_info", &self.server_info)
            .field("local_addr", &self.local_addr)
            .field("open_sessions", &self.sessions.len())
            .finish()
    }
}

impl McpServer {
    /// Create a server with the given identity and configuration.
    pub fn new(server_info: Implementation, config: ServerConfig) -> Self {
        Self {
            server_info,
            config,
            registry: Arc::new(HandlerRegistry::new()),
            sessions: Arc::new(SessionRegistry::new()),
            shutdown: CancellationToken::new(),
            serve_task: None,
            local_addr: None,
        }
    }

    /// The handler registry, for registration helpers that take it directly.
    pub fn registry(&self) -> &Arc<HandlerRegistry> {
        &self.registry
    }

    /// Register a tool backed by an async function.
    ///
    /// # Errors
    ///
    /// Fails when the tool's input schema is not a valid JSON Schema.
    pub fn register_tool<F, Fut>(&self, definition: Tool, func: F) -> McpResult<()>
    where
        F: Fn(CallToolRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<CallToolResult>> + Send + 'static,
    {
        self.registry
            .register_tool(Arc::new(FunctionToolHandler::new(definition, func)))
    }

    /// Register a tool handler object.
    ///
    /// # Errors
    ///
    /// Fails when the tool's input schema is not a valid JSON Schema.
    pub fn register_tool_handler(&self, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        self.registry.register_tool(handler)
    }

    /// Register a resource backed by an async function.
    pub fn register_resource<F, Fut>(&self, definition: Resource, func: F)
    where
        F: Fn(ReadResourceRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<ReadResourceResult>> + Send + 'static,
    {
        self.registry
            .register_resource(Arc::new(FunctionResourceHandler::new(definition, func)));
    }

    /// Register a resource handler object.
    pub fn register_resource_handler(&self, handler: Arc<dyn ResourceHandler>) {
        self.registry.register_resource(handler);
    }

    /// Register a prompt backed by an async function.
    pub fn register_prompt<F, Fut>(&self, definition: Prompt, func: F)
    where
        F: Fn(GetPromptRequest) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = McpResult<GetPromptResult>> + Send + 'static,
    {
        self.registry
            .register_prompt(Arc::new(FunctionPromptHandler::new(definition, func)));
    }

    /// Register a prompt handler object.
    pub fn register_prompt_handler(&self, handler: Arc<dyn PromptHandler>) {
        self.registry.register_prompt(handler);
    }

    /// Register the built-in dev-server introspection handlers, gated by
    /// the host's capability flags.
    ///
    /// # Errors
    ///
    /// Fails when a built-in schema fails to compile, which indicates a
    /// bug in this crate rather than in the host.
    pub fn register_host(
        &self,
        inspector: Arc<dyn HostInspector>,
        capabilities: HostCapabilities,
    ) -> McpResult<()> {
        builtin::register_host_handlers(&self.registry, inspector, capabilities)
    }

    /// The bound socket address, once started.
    pub fn local_addr(&self) -> Option<SocketAddr> {
        self.local_addr
    }

    /// The SSE endpoint URL, once started.
    pub fn endpoint_url(&self) -> Option<String> {
        self.local_addr
            .map(|addr| format!("http://{addr}{}", self.config.sse_path()))
    }

    /// Open-session count, for diagnostics.
    pub fn session_count(&self) -> usize {
        self.sessions.len()
    }

    /// Bind the listener and start accepting connections.
    ///
    /// Guarded against double-start: a second call logs a warning and
    /// returns the already-bound address without side effects.
    ///
    /// # Errors
    ///
    /// Fails with a configuration error when the bind address is invalid
    /// or the port cannot be bound.
    pub async fn start(&mut self) -> McpResult<SocketAddr> {
        if let Some(addr) = self.local_addr {
            warn!("start() called twice; server already listening on {addr}");
            return Ok(addr);
        }

        let listener = tokio::net::TcpListener::bind(self.config.bind_addr())
            .await
            .map_err(|e| {
                McpError::configuration(format!(
                    "failed to bind {}: {e}",
                    self.config.bind_addr()
                ))
            })?;
        let addr = listener
            .local_addr()
            .map_err(|e| McpError::configuration(format!("failed to read bound address: {e}")))?;
        self.local_addr = Some(addr);

        let state = TransportState {
            router: Arc::new(RequestRouter::new(
                Arc::clone(&self.registry),
                self.server_info.clone(),
            )),
            sessions: Arc::clone(&self.sessions),
            messages_path: self.config.messages_path(),
            keep_alive_interval: self.config.keep_alive_interval,
            shutdown: self.shutdown.clone(),
        };
        let app = transport::router(state, &self.config.sse_path(), &self.config.messages_path());

        let url = format!("http://{addr}{}", self.config.sse_path());
        info!(server = %self.server_info.name, %url, "MCP bridge listening");
        if self.config.print_url {
            println!("MCP server running at {url}");
        }
        config::persist_endpoint(&self.config, &self.server_info.name, &url);

        let shutdown = self.shutdown.clone();
        self.serve_task = Some(tokio::spawn(async move {
            let result = axum::serve(listener, app)
                .with_graceful_shutdown(shutdown.cancelled_owned())
                .await;
            if let Err(e) = result {
                error!("HTTP server error: {e}");
            }
        }));

        Ok(addr)
    }

    /// Close all open sessions, stop accepting connections, and release
    /// the listener.
    pub async fn stop(&mut self) {
        info!(open_sessions = self.sessions.len(), "stopping MCP bridge");

        // Notify clients before tearing the connections down.
        self.sessions.close_all();
        self.shutdown.cancel();

        if let Some(task) = self.serve_task.take() {
            if let Err(e) = task.await {
                if !e.is_cancelled() {
                    error!("serve task terminated abnormally: {e}");
                }
            }
        }
        self.local_addr = None;
        // A cancelled token stays cancelled; a fresh one lets start() be
        // called again on the same instance.
        self.shutdown = CancellationToken::new();
    }

    /// Start the server and run until the process receives an interrupt
    /// signal, then stop gracefully so open sessions are notified rather
    /// than dropped.
    ///
    /// # Errors
    ///
    /// Propagates startup failures from [`McpServer::start`].
    pub async fn run_until_shutdown(&mut self) -> McpResult<()> {
        self.start().await?;

        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("failed to listen for interrupt signal: {e}");
        }
        self.stop().await;
        Ok(())
    }
}
