//! Error Types

use thiserror::Error;

/// Result type alias for agent operations
pub type Result<T> = std::result::Result<T, AgentError>;

/// Agent error types
#[derive(Error, Debug)]
pub enum AgentError {
    /// LLM provider error
    #[error("Provider error: {0}")]
    Provider(String),

    /// Provider unavailable or not responding
    #[error("Provider unavailable: {0}")]
    ProviderUnavailable(String),

    /// Rate limited
    #[error("Rate limited: {0}")]
    RateLimited(String),

    /// Authentication failed
    #[error("Authentication failed: {0}")]
    Auth(String),

    /// Tool provider connection failed or was lost
    #[error("Tool provider error: {0}")]
    ToolProvider(String),

    /// Tool not found in registry
    #[error("Tool not found: {0}")]
    ToolNotFound(String),

    /// Tool execution failed. Displays only the detail, since the gateway
    /// already prefixes it with the tool name.
    #[error("{0}")]
    ToolExecution(String),

    /// Parse error (e.g., malformed tool call arguments)
    #[error("Parse error: {0}")]
    Parse(String),

    /// Message would break the conversation's tool linkage
    #[error("Conversation error: {0}")]
    Conversation(String),

    /// Session lifecycle error
    #[error("Session error: {0}")]
    Session(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Generic IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Other/unknown error
    #[error("{0}")]
    Other(String),
}

impl AgentError {
    /// Convert to a user-friendly message
    pub fn user_message(&self) -> String {
        match self {
            Self::Provider(msg) => format!("The AI service encountered an error: {msg}"),
            Self::ProviderUnavailable(_) => {
                "The AI service is currently unavailable. Please try again.".into()
            }
            Self::RateLimited(_) => "You've made too many requests. Please wait a moment.".into(),
            Self::Auth(_) => "Authentication failed. Please check your credentials.".into(),
            Self::ToolProvider(msg) => format!("Could not reach the tool server: {msg}"),
            Self::ToolNotFound(name) => format!("The tool '{name}' is not available."),
            Self::ToolExecution(msg) => format!("Tool error: {msg}"),
            Self::Config(msg) => format!("Configuration problem: {msg}"),
            Self::Session(msg) => format!("Session problem: {msg}"),
            _ => "An unexpected error occurred.".into(),
        }
    }
}

impl From<anyhow::Error> for AgentError {
    fn from(err: anyhow::Error) -> Self {
        Self::Other(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tool_execution_displays_detail_only() {
        let err = AgentError::ToolExecution("Cannot divide by zero".into());
        assert_eq!(err.to_string(), "Cannot divide by zero");
    }

    #[test]
    fn test_user_message_for_missing_credentials() {
        let err = AgentError::Config("LLM_API_KEY is not set".into());
        assert!(err.user_message().contains("LLM_API_KEY"));
    }
}
