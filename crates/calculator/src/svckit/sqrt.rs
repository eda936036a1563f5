//! Square Root Tool

use async_trait::async_trait;
use serde_json::Value;

use agent_core::{ParameterSchema, Result as CoreResult, Tool, ToolSchema};

use crate::number::Number;

pub struct SqrtTool;

#[async_trait]
impl Tool for SqrtTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: "sqrt".into(),
            description: "Calculate the square root of a number.".into(),
            parameters: vec![ParameterSchema::required(
                "a",
                "number",
                "Number to calculate square root of",
            )],
        }
    }

    async fn execute(&self, arguments: &Value) -> CoreResult<String> {
        let a = Number::from_argument(arguments, "a")?;
        let result = a.sqrt()?;
        tracing::info!("Square root of {a} = {result}");
        Ok(result.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_sqrt() {
        assert_eq!(SqrtTool.execute(&json!({"a": 81})).await.unwrap(), "9.0");
        assert_eq!(SqrtTool.execute(&json!({"a": 2})).await.unwrap(), "1.4142135623730951");

        let err = SqrtTool.execute(&json!({"a": -1})).await.unwrap_err();
        assert_eq!(err.to_string(), "Cannot calculate square root of a negative number");
    }
}
