//! Tool System
//!
//! Types shared by both sides of the tool boundary: descriptors published by a
//! tool provider, invocations requested by the model, and the
//! [`ToolProvider`] trait the session talks to.
//!
//! [`ToolRegistry`] is an in-process provider built from [`Tool`] values.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use std::collections::HashMap;
use std::sync::Arc;

use crate::error::{AgentError, Result};

/// A tool as published by a tool provider
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    /// Unique tool name within a session
    pub name: String,

    /// Human-readable description
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// JSON Schema for the tool's arguments
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parameter_schema: Option<Value>,
}

impl ToolDescriptor {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            parameter_schema: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_parameters(mut self, schema: Value) -> Self {
        self.parameter_schema = Some(schema);
        self
    }
}

/// Tool call request from the LLM
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolInvocation {
    /// Correlation id assigned by the completion service
    pub id: String,

    /// Tool identifier
    pub name: String,

    /// Arguments as structured JSON
    #[serde(default)]
    pub arguments: Value,
}

impl ToolInvocation {
    pub fn new(id: impl Into<String>, name: impl Into<String>, arguments: Value) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// Result from tool dispatch. Always text, failures included.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ToolResult {
    pub content: String,
}

impl ToolResult {
    pub fn new(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
        }
    }
}

/// Parameter definition for tool schema
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ParameterSchema {
    /// Parameter name
    pub name: String,

    /// JSON Schema type (string, number, boolean, object, array)
    #[serde(rename = "type")]
    pub param_type: String,

    /// Human-readable description
    pub description: String,

    /// Whether this parameter is required
    #[serde(default)]
    pub required: bool,
}

impl ParameterSchema {
    /// A required parameter with no default
    pub fn required(
        name: impl Into<String>,
        param_type: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            param_type: param_type.into(),
            description: description.into(),
            required: true,
        }
    }
}

/// Declarative schema for an in-process [`Tool`]
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolSchema {
    /// Unique tool identifier
    pub name: String,

    /// Human-readable description (shown to LLM)
    pub description: String,

    /// Parameter definitions
    pub parameters: Vec<ParameterSchema>,
}

impl ToolSchema {
    /// Render as a provider descriptor with a JSON Schema object
    pub fn to_descriptor(&self) -> ToolDescriptor {
        let mut properties = Map::new();
        let mut required = Vec::new();

        for param in &self.parameters {
            let property = json!({
                "type": param.param_type,
                "description": param.description,
            });
            if param.required {
                required.push(Value::String(param.name.clone()));
            }
            properties.insert(param.name.clone(), property);
        }

        ToolDescriptor::new(&self.name)
            .with_description(&self.description)
            .with_parameters(json!({
                "type": "object",
                "properties": properties,
                "required": required,
            }))
    }
}

/// Tool trait - implement to add new in-process capabilities
#[async_trait]
pub trait Tool: Send + Sync {
    /// Get the tool's schema for LLM function calling
    fn schema(&self) -> ToolSchema;

    /// Execute the tool and render its output as text
    async fn execute(&self, arguments: &Value) -> Result<String>;

    /// Validate arguments before execution (optional)
    fn validate(&self, arguments: &Value) -> Result<()> {
        let schema = self.schema();

        for param in &schema.parameters {
            if param.required && arguments.get(&param.name).is_none() {
                return Err(AgentError::ToolExecution(format!(
                    "Missing required parameter: {}",
                    param.name
                )));
            }
        }

        Ok(())
    }
}

/// The tool-provider boundary.
///
/// Anything that can list tools and run them by name: a remote MCP server,
/// or an in-process [`ToolRegistry`].
#[async_trait]
pub trait ToolProvider: Send + Sync {
    /// Short label used in logs
    fn name(&self) -> &str;

    /// Acquire the connection. Called once per session.
    async fn connect(&self) -> Result<()> {
        Ok(())
    }

    /// Tools currently offered by the provider
    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>>;

    /// Run a tool by name and return its textual result
    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<String>;

    /// Release the connection. Must tolerate repeated calls.
    async fn close(&self) -> Result<()> {
        Ok(())
    }
}

/// Registry for in-process tools. Keeps registration order.
pub struct ToolRegistry {
    name: String,
    tools: Vec<Arc<dyn Tool>>,
    index: HashMap<String, usize>,
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::named("local")
    }

    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            tools: Vec::new(),
            index: HashMap::new(),
        }
    }

    /// Register a new tool, replacing any tool with the same name in place
    pub fn register<T: Tool + 'static>(&mut self, tool: T) {
        self.register_shared(Arc::new(tool));
    }

    /// Register a shared tool
    pub fn register_shared(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.schema().name;
        if let Some(&slot) = self.index.get(&name) {
            self.tools[slot] = tool;
        } else {
            self.index.insert(name, self.tools.len());
            self.tools.push(tool);
        }
    }

    /// Get a tool by name
    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.index.get(name).map(|&slot| self.tools[slot].clone())
    }

    /// Validate and execute a tool by name
    pub async fn execute(&self, name: &str, arguments: &Value) -> Result<String> {
        let tool = self
            .get(name)
            .ok_or_else(|| AgentError::ToolNotFound(name.to_string()))?;

        tool.validate(arguments)?;
        tool.execute(arguments).await
    }

    /// Descriptors in registration order
    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools.iter().map(|t| t.schema().to_descriptor()).collect()
    }

    /// Number of registered tools
    pub fn len(&self) -> usize {
        self.tools.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }
}

#[async_trait]
impl ToolProvider for ToolRegistry {
    fn name(&self) -> &str {
        &self.name
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        Ok(self.descriptors())
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<String> {
        self.execute(name, arguments).await
    }
}
