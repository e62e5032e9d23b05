//! Handler registry: named capabilities in three namespaces.
//!
//! Registration compiles each tool's declared JSON Schema eagerly, so a
//! malformed schema fails at startup (a programming error in the host
//! application) instead of at dispatch time. Duplicate names are
//! permissive last-wins: the newer handler replaces the older one and a
//! warning is logged. Registration happens before the transport starts
//! accepting connections; afterwards the registry is read-mostly.

use dashmap::DashMap;
use jsonschema::Validator;
use serde_json::Value;
use std::sync::Arc;
use tracing::warn;

use devmcp_protocol::{McpError, McpResult, Prompt, Resource, Tool};

use crate::handler::{PromptHandler, ResourceHandler, ToolHandler};

/// A registered tool plus its compiled input validator.
pub struct ToolEntry {
    /// The handler implementation
    pub handler: Arc<dyn ToolHandler>,
    validator: Validator,
}

impl ToolEntry {
    /// Validate arguments against the tool's declared schema.
    ///
    /// # Errors
    ///
    /// Returns [`McpError::invalid_params`] with field-level detail in the
    /// error `data` when the instance is rejected.
    pub fn validate(&self, name: &str, arguments: &Value) -> McpResult<()> {
        let violations: Vec<Value> = self
            .validator
            .iter_errors(arguments)
            .map(|e| {
                serde_json::json!({
                    "path": e.instance_path().to_string(),
                    "error": e.to_string(),
                })
            })
            .collect();

        if violations.is_empty() {
            Ok(())
        } else {
            Err(
                McpError::invalid_params(format!("invalid arguments for tool '{name}'"))
                    .with_data(Value::Array(violations)),
            )
        }
    }
}

/// The set of callable capabilities, keyed by name within each namespace.
#[derive(Default)]
pub struct HandlerRegistry {
    tools: DashMap<String, Arc<ToolEntry>>,
    resources: DashMap<String, Arc<dyn ResourceHandler>>,
    prompts: DashMap<String, Arc<dyn PromptHandler>>,
}

impl std::fmt::Debug for HandlerRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HandlerRegistry")
            .field("tools", &self.tools.len())
            .field("resources", &self.resources.len())
            .field("prompts", &self.prompts.len())
            .finish()
    }
}

impl HandlerRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a tool handler under its definition's name.
    ///
    /// The input schema is compiled here; an uncompilable schema is a
    /// fatal configuration error. Re-registering a name replaces the
    /// previous handler (last-wins) and logs a warning.
    ///
    /// # Errors
    ///
    /// Returns a configuration error when the declared input schema is
    /// not a valid JSON Schema document.
    pub fn register_tool(&self, handler: Arc<dyn ToolHandler>) -> McpResult<()> {
        let definition = handler.tool_definition();
        let validator = jsonschema::validator_for(&definition.input_schema).map_err(|e| {
            McpError::configuration(format!(
                "tool '{}' declares a malformed input schema: {e}",
                definition.name
            ))
        })?;

        let name = definition.name.clone();
        let previous = self
            .tools
            .insert(name.clone(), Arc::new(ToolEntry { handler, validator }));
        if previous.is_some() {
            warn!(tool = %name, "replacing previously registered tool handler");
        }
        Ok(())
    }

    /// Register a resource handler under its definition's URI.
    pub fn register_resource(&self, handler: Arc<dyn ResourceHandler>) {
        let uri = handler.resource_definition().uri;
        if self.resources.insert(uri.clone(), handler).is_some() {
            warn!(uri = %uri, "replacing previously registered resource handler");
        }
    }

    /// Register a prompt handler under its definition's name.
    pub fn register_prompt(&self, handler: Arc<dyn PromptHandler>) {
        let name = handler.prompt_definition().name;
        if self.prompts.insert(name.clone(), handler).is_some() {
            warn!(prompt = %name, "replacing previously registered prompt handler");
        }
    }

    /// Look up a tool by name.
    pub fn get_tool(&self, name: &str) -> Option<Arc<ToolEntry>> {
        self.tools.get(name).map(|e| Arc::clone(e.value()))
    }

    /// Look up a resource by URI.
    pub fn get_resource(&self, uri: &str) -> Option<Arc<dyn ResourceHandler>> {
        self.resources.get(uri).map(|e| Arc::clone(e.value()))
    }

    /// Look up a prompt by name.
    pub fn get_prompt(&self, name: &str) -> Option<Arc<dyn PromptHandler>> {
        self.prompts.get(name).map(|e| Arc::clone(e.value()))
    }

    /// All registered tool definitions.
    pub fn list_tools(&self) -> Vec<Tool> {
        self.tools
            .iter()
            .map(|e| e.handler.tool_definition())
            .collect()
    }

    /// All registered resource definitions.
    pub fn list_resources(&self) -> Vec<Resource> {
        self.resources
            .iter()
            .map(|e| e.resource_definition())
            .collect()
    }

    /// All registered prompt definitions.
    pub fn list_prompts(&self) -> Vec<Prompt> {
        self.prompts
            .iter()
            .map(|e| e.prompt_definition())
            .collect()
    }

    /// Number of registered tools.
    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }

    /// Number of registered resources.
    pub fn resource_count(&self) -> usize {
        self.resources.len()
    }

    /// Number of registered prompts.
    pub fn prompt_count(&self) -> usize {
        self.prompts.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::handler::FunctionToolHandler;
    use devmcp_protocol::{CallToolResult, ErrorKind};
    use serde_json::json;

    fn tool(name: &str, reply: &'static str) -> Arc<dyn ToolHandler> {
        Arc::new(FunctionToolHandler::new(
            Tool::new(name, "test tool", json!({"type": "object"})),
            move |_req| async move { Ok(CallToolResult::text(reply)) },
        ))
    }

    #[tokio::test]
    async fn duplicate_registration_is_last_wins() {
        let registry = HandlerRegistry::new();
        registry.register_tool(tool("greet", "first")).unwrap();
        registry.register_tool(tool("greet", "second")).unwrap();

        // Exactly one callable remains, and it is the newer one.
        assert_eq!(registry.tool_count(), 1);
        let entry = registry.get_tool("greet").unwrap();
        let result = entry
            .handler
            .handle(devmcp_protocol::CallToolRequest {
                name: "greet".into(),
                arguments: None,
            })
            .await
            .unwrap();
        assert_eq!(result.content, vec![devmcp_protocol::Content::text("second")]);
    }

    #[test]
    fn malformed_schema_is_fatal_at_registration() {
        let registry = HandlerRegistry::new();
        let handler = Arc::new(FunctionToolHandler::new(
            Tool::new("broken", "bad schema", json!({"type": 42})),
            |_req| async { Ok(CallToolResult::text("unreachable")) },
        ));

        let err = registry.register_tool(handler).unwrap_err();
        assert_eq!(err.kind, ErrorKind::Configuration);
        assert!(err.is_fatal());
        assert_eq!(registry.tool_count(), 0);
    }

    #[test]
    fn validation_reports_field_level_detail() {
        let registry = HandlerRegistry::new();
        let handler = Arc::new(FunctionToolHandler::new(
            Tool::new(
                "add",
                "Add two numbers",
                json!({
                    "type": "object",
                    "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
                    "required": ["a", "b"]
                }),
            ),
            |_req| async { Ok(CallToolResult::text("ok")) },
        ));
        registry.register_tool(handler).unwrap();

        let entry = registry.get_tool("add").unwrap();
        let err = entry
            .validate("add", &json!({"a": "not a number"}))
            .unwrap_err();
        assert_eq!(err.kind, ErrorKind::InvalidParams);
        let violations = err.data.unwrap();
        let violations = violations.as_array().unwrap();
        assert!(!violations.is_empty());
        // Each violation names the offending instance location.
        assert!(
            violations
                .iter()
                .any(|v| v["path"].as_str() == Some("/a"))
        );

        assert!(entry.validate("add", &json!({"a": 1, "b": 2})).is_ok());
    }

    #[test]
    fn lookup_is_per_namespace() {
        let registry = HandlerRegistry::new();
        registry.register_tool(tool("thing", "tool")).unwrap();

        assert!(registry.get_tool("thing").is_some());
        assert!(registry.get_resource("thing").is_none());
        assert!(registry.get_prompt("thing").is_none());
    }
}
