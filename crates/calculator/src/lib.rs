//! # calculator
//!
//! Arithmetic tools served in-process, and the profile of the calculator
//! agent that uses them.
//!
//! ```text
//! ┌───────────────────────────────────────────────┐
//! │  Calculator Agent                             │
//! ├───────────────────────────────────────────────┤
//! │  add(a, b)       subtract(a, b)               │
//! │  multiply(a, b)  divide(a, b)                 │
//! │  power(a, b)     sqrt(a)                      │
//! └───────────────────────────────────────────────┘
//! ```

pub mod error;
pub mod number;
pub mod svckit;

use std::sync::Arc;

use agent_core::{AgentProfile, ToolRegistry};

pub use error::{CalcError, Result};
pub use number::Number;

/// Re-export tools for easy registration
pub mod tools {
    pub use crate::svckit::{ArithmeticTool, BinaryOperation, SqrtTool};
}

/// System prompt for the calculator agent
pub const CALCULATOR_PROMPT: &str = r"You are a helpful calculator assistant with access to calculator tools for mathematical operations.

When a user asks a mathematical question:
1. Break down complex calculations into simpler steps
2. Use the available calculator tools to perform calculations
3. Explain your reasoning process clearly
4. Provide the final answer

Available tools:
- add(a, b): Add two numbers
- subtract(a, b): Subtract b from a
- multiply(a, b): Multiply two numbers
- divide(a, b): Divide a by b
- power(a, b): Raise a to the power of b
- sqrt(a): Calculate square root of a

Always use tools for calculations rather than doing math manually.
Show your work step by step so users can understand the solution process.";

pub const GREETING: &str = "Welcome to the Calculator Agent!

I can help you with mathematical calculations:
  • Addition, Subtraction, Multiplication, Division
  • Power operations and Square roots

Works with any OpenAI-compatible LLM provider (OpenAI, Qwen, Groq, ...).
Ask me any math question and I'll solve it step by step.
Type 'quit' or 'exit' to end the session.";

/// All calculator tools, in the order they are offered to the model
pub fn calculator_tools() -> ToolRegistry {
    let mut registry = ToolRegistry::named("calculator");
    for operation in tools::BinaryOperation::ALL {
        registry.register(tools::ArithmeticTool::new(operation));
    }
    registry.register(tools::SqrtTool);
    registry
}

/// The calculator agent profile
pub fn profile() -> AgentProfile {
    AgentProfile::new("Calculator Agent", Arc::new(calculator_tools()))
        .system_instruction(CALCULATOR_PROMPT)
        .greeting(GREETING)
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::ToolProvider;
    use serde_json::json;

    #[tokio::test]
    async fn test_registry_offers_six_tools_in_order() {
        let registry = calculator_tools();
        let names: Vec<String> = registry
            .list_tools()
            .await
            .unwrap()
            .into_iter()
            .map(|d| d.name)
            .collect();
        assert_eq!(names, ["add", "subtract", "multiply", "divide", "power", "sqrt"]);
    }

    #[tokio::test]
    async fn test_registry_validates_arguments() {
        let registry = calculator_tools();
        let err = registry.call_tool("add", &json!({"a": 1})).await.unwrap_err();
        assert_eq!(err.to_string(), "Missing required parameter: b");
        assert_eq!(registry.call_tool("multiply", &json!({"a": 6, "b": 7})).await.unwrap(), "42");
    }

    #[test]
    fn test_profile() {
        let profile = profile();
        assert_eq!(profile.name, "Calculator Agent");
        assert!(profile.system_instruction.contains("sqrt(a)"));
        assert_eq!(profile.tool_provider.name(), "calculator");
    }
}
