//! Two-operand Arithmetic Tools
//!
//! `add`, `subtract`, `multiply`, `divide` and `power` share one
//! implementation parameterized by [`BinaryOperation`].

use async_trait::async_trait;
use serde_json::Value;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolSchema};

use crate::error::Result;
use crate::number::Number;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum BinaryOperation {
    Add,
    Subtract,
    Multiply,
    Divide,
    Power,
}

impl BinaryOperation {
    pub const ALL: [Self; 5] = [
        Self::Add,
        Self::Subtract,
        Self::Multiply,
        Self::Divide,
        Self::Power,
    ];

    pub const fn name(self) -> &'static str {
        match self {
            Self::Add => "add",
            Self::Subtract => "subtract",
            Self::Multiply => "multiply",
            Self::Divide => "divide",
            Self::Power => "power",
        }
    }

    const fn description(self) -> &'static str {
        match self {
            Self::Add => "Add two numbers together.",
            Self::Subtract => "Subtract the second number from the first number.",
            Self::Multiply => "Multiply two numbers together.",
            Self::Divide => "Divide the first number by the second number.",
            Self::Power => "Raise the first number to the power of the second number.",
        }
    }

    const fn operand_descriptions(self) -> (&'static str, &'static str) {
        match self {
            Self::Add | Self::Multiply => ("First number", "Second number"),
            Self::Subtract => ("Number to subtract from", "Number to subtract"),
            Self::Divide => ("Dividend (number to be divided)", "Divisor (number to divide by)"),
            Self::Power => ("Base number", "Exponent"),
        }
    }

    const fn symbol(self) -> &'static str {
        match self {
            Self::Add => "+",
            Self::Subtract => "-",
            Self::Multiply => "×",
            Self::Divide => "÷",
            Self::Power => "^",
        }
    }

    pub fn apply(self, a: Number, b: Number) -> Result<Number> {
        match self {
            Self::Add => Ok(a + b),
            Self::Subtract => Ok(a - b),
            Self::Multiply => Ok(a * b),
            Self::Divide => a.divide(b),
            Self::Power => a.pow(b),
        }
    }
}

/// Tool wrapper around a [`BinaryOperation`]
pub struct ArithmeticTool {
    operation: BinaryOperation,
}

impl ArithmeticTool {
    pub const fn new(operation: BinaryOperation) -> Self {
        Self { operation }
    }
}

#[async_trait]
impl Tool for ArithmeticTool {
    fn schema(&self) -> ToolSchema {
        let (a, b) = self.operation.operand_descriptions();
        ToolSchema {
            name: self.operation.name().into(),
            description: self.operation.description().into(),
            parameters: vec![
                ParameterSchema::required("a", "number", a),
                ParameterSchema::required("b", "number", b),
            ],
        }
    }

    async fn execute(&self, arguments: &Value) -> CoreResult<String> {
        let a = Number::from_argument(arguments, "a")?;
        let b = Number::from_argument(arguments, "b")?;

        let result = self.operation.apply(a, b)?;
        tracing::info!("{} {a} {} {b} = {result}", self.operation.name(), self.operation.symbol());

        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::AgentError;
    use serde_json::json;

    #[tokio::test]
    async fn test_add_preserves_integers() {
        let tool = ArithmeticTool::new(BinaryOperation::Add);
        let out = tool.execute(&json!({"a": 9, "b": 1053})).await.unwrap();
        assert_eq!(out, "1062");
    }

    #[tokio::test]
    async fn test_divide_by_zero_is_tool_error() {
        let tool = ArithmeticTool::new(BinaryOperation::Divide);
        let err = tool.execute(&json!({"a": 5, "b": 0})).await.unwrap_err();
        assert!(matches!(err, AgentError::ToolExecution(_)));
        assert_eq!(err.to_string(), "Cannot divide by zero");
    }

    #[tokio::test]
    async fn test_power_and_subtract() {
        let power = ArithmeticTool::new(BinaryOperation::Power);
        assert_eq!(power.execute(&json!({"a": 2, "b": 8})).await.unwrap(), "256");

        let subtract = ArithmeticTool::new(BinaryOperation::Subtract);
        assert_eq!(subtract.execute(&json!({"a": 1.5, "b": 0.5})).await.unwrap(), "1.0");
    }

    #[test]
    fn test_schema_requires_both_operands() {
        let descriptor = ArithmeticTool::new(BinaryOperation::Multiply).schema().to_descriptor();
        assert_eq!(descriptor.name, "multiply");
        assert_eq!(descriptor.parameter_schema.unwrap()["required"], json!(["a", "b"]));
    }
}
