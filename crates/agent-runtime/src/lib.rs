//! # agent-runtime
//!
//! Concrete providers for the agent boundaries.
//!
//! ## Providers
//!
//! - **OpenAI-compatible**: any `/chat/completions` endpoint with function calling
//! - **MCP**: tools served by a Model Context Protocol server over HTTP
//!
//! ## Usage
//!
//! ```rust,ignore
//! use agent_runtime::{McpConfig, McpHttpToolProvider, OpenAiCompatProvider};
//!
//! let llm = OpenAiCompatProvider::from_env()?;
//! let tools = McpHttpToolProvider::new(McpConfig::new("http://localhost:8000/mcp"))?;
//! let profile = AgentProfile::new("Remote Agent", Arc::new(tools));
//! let mut session = Session::new(profile, Arc::new(llm), SessionConfig::default());
//! session.initialize().await?;
//! ```

pub mod mcp;
pub mod openai;

pub use mcp::{McpConfig, McpHttpToolProvider};
pub use openai::{OpenAiCompatProvider, OpenAiConfig};

// Re-export core types for convenience
pub use agent_core::{
    AgentError, AgentProfile, LlmProvider, Message, Result, Role, Session, SessionConfig,
    ToolProvider,
};
