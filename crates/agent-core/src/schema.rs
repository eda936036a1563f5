//! Tool Schema Adapter
//!
//! Bridges tool-provider descriptors to the completion service's
//! function-calling format.

use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::tool::ToolDescriptor;

/// One entry of the completion service's `tools` array
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionSchema {
    /// Always `"function"`
    #[serde(rename = "type")]
    pub kind: String,

    pub function: FunctionDefinition,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct FunctionDefinition {
    pub name: String,
    pub description: String,
    pub parameters: Value,
}

impl FunctionSchema {
    pub fn name(&self) -> &str {
        &self.function.name
    }
}

/// Schema used when a descriptor declares no parameters
pub fn empty_parameters() -> Value {
    json!({
        "type": "object",
        "properties": {},
        "required": []
    })
}

/// Adapt one descriptor. Missing pieces get defaults, never errors.
pub fn to_function_schema(descriptor: &ToolDescriptor) -> FunctionSchema {
    let description = descriptor
        .description
        .as_deref()
        .filter(|d| !d.trim().is_empty())
        .map_or_else(|| format!("Execute {} tool", descriptor.name), str::to_string);

    FunctionSchema {
        kind: "function".into(),
        function: FunctionDefinition {
            name: descriptor.name.clone(),
            description,
            parameters: descriptor
                .parameter_schema
                .clone()
                .unwrap_or_else(empty_parameters),
        },
    }
}

/// Adapt a descriptor set, preserving order
pub fn to_function_schemas(descriptors: &[ToolDescriptor]) -> Vec<FunctionSchema> {
    descriptors.iter().map(to_function_schema).collect()
}
