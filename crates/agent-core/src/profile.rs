//! Agent Profiles
//!
//! A concrete agent is a profile value plus the shared orchestration loop.

use std::sync::Arc;

use crate::tool::ToolProvider;

/// Used when a profile does not bring its own instruction
pub const DEFAULT_SYSTEM_PROMPT: &str = r"You are a helpful AI assistant with access to various tools to help users.

When a user asks a question:
1. Analyze the request to understand what they need
2. Use the available tools when appropriate to provide accurate information
3. Explain your reasoning process clearly
4. Provide comprehensive and helpful responses

Always use tools when they can help provide better, more accurate answers.
Be clear about what tools you're using and why.";

/// Capability set of an agent
#[derive(Clone)]
pub struct AgentProfile {
    /// Display name
    pub name: String,

    /// System instruction placed at the head of every working history
    pub system_instruction: String,

    /// Welcome text shown by the presentation layer
    pub greeting: String,

    /// Where the agent's tools come from
    pub tool_provider: Arc<dyn ToolProvider>,
}

impl AgentProfile {
    pub fn new(name: impl Into<String>, tool_provider: Arc<dyn ToolProvider>) -> Self {
        let name = name.into();
        Self {
            greeting: format!("Welcome to {name}! Type 'quit' or 'exit' to end the session."),
            name,
            system_instruction: DEFAULT_SYSTEM_PROMPT.into(),
            tool_provider,
        }
    }

    pub fn system_instruction(mut self, text: impl Into<String>) -> Self {
        self.system_instruction = text.into();
        self
    }

    pub fn greeting(mut self, text: impl Into<String>) -> Self {
        self.greeting = text.into();
        self
    }
}

impl std::fmt::Debug for AgentProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AgentProfile")
            .field("name", &self.name)
            .field("tool_provider", &self.tool_provider.name())
            .finish_non_exhaustive()
    }
}
