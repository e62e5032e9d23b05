//! Built-in handler groups exposing the host dev server's state.
//!
//! The embedding dev server implements [`HostInspector`]; registration
//! then exposes its live state as tools and a resource. Optional groups
//! are gated on [`HostCapabilities`] flags.

use async_trait::async_trait;
use serde_json::{Value, json};
use std::sync::Arc;

use devmcp_protocol::{
    CallToolResult, McpResult, Resource, ResourceContents, ReadResourceResult, Tool,
};

use crate::capabilities::HostCapabilities;
use crate::handler::{FunctionResourceHandler, FunctionToolHandler};
use crate::registry::HandlerRegistry;

/// Live view into the embedding dev server.
///
/// Each method returns a JSON snapshot of the corresponding subsystem.
/// Methods backing a disabled capability are never called.
#[async_trait]
pub trait HostInspector: Send + Sync {
    /// The dev server's resolved configuration.
    async fn config_json(&self) -> McpResult<Value>;

    /// The registered routes.
    async fn routes(&self) -> McpResult<Value> {
        Ok(json!([]))
    }

    /// The registered components.
    async fn components(&self) -> McpResult<Value> {
        Ok(json!([]))
    }

    /// The auto-import registry.
    async fn auto_imports(&self) -> McpResult<Value> {
        Ok(json!([]))
    }
}

fn no_args_schema() -> Value {
    json!({"type": "object", "properties": {}, "additionalProperties": false})
}

fn json_result(value: &Value) -> CallToolResult {
    match serde_json::to_string_pretty(value) {
        Ok(text) => CallToolResult::text(text),
        Err(e) => CallToolResult::error_text(format!("snapshot not serializable: {e}")),
    }
}

/// Register the host introspection handlers, honoring the capability flags.
///
/// # Errors
///
/// Fails only if a built-in input schema fails to compile, which would be
/// a bug in this crate.
pub fn register_host_handlers(
    registry: &HandlerRegistry,
    inspector: Arc<dyn HostInspector>,
    capabilities: HostCapabilities,
) -> McpResult<()> {
    // Configuration is always available: as a tool for agents that only
    // speak tools, and as a resource for the rest.
    let config_inspector = Arc::clone(&inspector);
    registry.register_tool(Arc::new(FunctionToolHandler::new(
        Tool::new(
            "get-dev-server-config",
            "Get the dev server's resolved configuration as JSON",
            no_args_schema(),
        ),
        move |_req| {
            let inspector = Arc::clone(&config_inspector);
            async move { Ok(json_result(&inspector.config_json().await?)) }
        },
    )))?;

    let resource_inspector = Arc::clone(&inspector);
    registry.register_resource(Arc::new(FunctionResourceHandler::new(
        Resource {
            uri: "devserver://config".to_string(),
            name: "Dev server configuration".to_string(),
            description: Some("Resolved configuration of the running dev server".to_string()),
            mime_type: Some("application/json".to_string()),
        },
        move |req| {
            let inspector = Arc::clone(&resource_inspector);
            async move {
                let config = inspector.config_json().await?;
                Ok(ReadResourceResult {
                    contents: vec![ResourceContents {
                        uri: req.uri,
                        mime_type: Some("application/json".to_string()),
                        text: serde_json::to_string_pretty(&config).unwrap_or_default(),
                    }],
                })
            }
        },
    )));

    if capabilities.routes {
        let inspector = Arc::clone(&inspector);
        registry.register_tool(Arc::new(FunctionToolHandler::new(
            Tool::new(
                "list-routes",
                "List the dev server's registered routes",
                no_args_schema(),
            ),
            move |_req| {
                let inspector = Arc::clone(&inspector);
                async move { Ok(json_result(&inspector.routes().await?)) }
            },
        )))?;
    }

    if capabilities.components {
        let inspector = Arc::clone(&inspector);
        registry.register_tool(Arc::new(FunctionToolHandler::new(
            Tool::new(
                "list-components",
                "List the dev server's registered components",
                no_args_schema(),
            ),
            move |_req| {
                let inspector = Arc::clone(&inspector);
                async move { Ok(json_result(&inspector.components().await?)) }
            },
        )))?;
    }

    if capabilities.auto_imports {
        let inspector = Arc::clone(&inspector);
        registry.register_tool(Arc::new(FunctionToolHandler::new(
            Tool::new(
                "list-auto-imports",
                "List the dev server's auto-import registry",
                no_args_schema(),
            ),
            move |_req| {
                let inspector = Arc::clone(&inspector);
                async move { Ok(json_result(&inspector.auto_imports().await?)) }
            },
        )))?;
    }

    Ok(())
}
