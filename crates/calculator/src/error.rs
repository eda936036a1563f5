//! Error Types for the Calculator

use agent_core::AgentError;
use thiserror::Error;

pub type Result<T> = std::result::Result<T, CalcError>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CalcError {
    #[error("Cannot divide by zero")]
    DivideByZero,

    #[error("Cannot calculate square root of a negative number")]
    NegativeSqrt,

    #[error("Missing required parameter: {0}")]
    MissingArgument(String),

    #[error("Parameter '{name}' must be a number, got {got}")]
    NotANumber { name: String, got: String },

    #[error("Result is not a real number")]
    NotReal,
}

impl From<CalcError> for AgentError {
    fn from(err: CalcError) -> Self {
        Self::ToolExecution(err.to_string())
    }
}
