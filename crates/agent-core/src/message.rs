//! Conversation Messages
//!
//! Standard message format used across the agent system, and the
//! append-only [`Conversation`] log that enforces tool-call linkage.

use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{AgentError, Result};
use crate::tool::ToolInvocation;

/// Role of a message sender
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    /// System prompt/instructions
    System,
    /// User input
    User,
    /// Assistant (LLM) response
    Assistant,
    /// Tool result (linked to an assistant tool call)
    Tool,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
            Self::Tool => write!(f, "tool"),
        }
    }
}

/// A single message in a conversation
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Message {
    /// Message role
    pub role: Role,

    /// Text content
    pub content: String,

    /// Id of the tool call this message answers (tool messages only)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,

    /// Tool calls declared by the model (assistant messages only)
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub tool_calls: Vec<ToolInvocation>,

    /// Timestamp
    #[serde(default = "Utc::now")]
    pub timestamp: DateTime<Utc>,
}

impl Message {
    /// Create a new message
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_call_id: None,
            tool_calls: Vec::new(),
            timestamp: Utc::now(),
        }
    }

    /// Create a system message
    pub fn system(content: impl Into<String>) -> Self {
        Self::new(Role::System, content)
    }

    /// Create a user message
    pub fn user(content: impl Into<String>) -> Self {
        Self::new(Role::User, content)
    }

    /// Create an assistant message
    pub fn assistant(content: impl Into<String>) -> Self {
        Self::new(Role::Assistant, content)
    }

    /// Create an assistant message that requests tool calls
    pub fn assistant_with_tool_calls(
        content: impl Into<String>,
        tool_calls: Vec<ToolInvocation>,
    ) -> Self {
        Self {
            tool_calls,
            ..Self::new(Role::Assistant, content)
        }
    }

    /// Create a tool result message
    pub fn tool(content: impl Into<String>, tool_call_id: impl Into<String>) -> Self {
        Self {
            tool_call_id: Some(tool_call_id.into()),
            ..Self::new(Role::Tool, content)
        }
    }

    /// Whether this is an assistant message carrying tool calls
    pub fn has_tool_calls(&self) -> bool {
        self.role == Role::Assistant && !self.tool_calls.is_empty()
    }
}

/// Ordered, append-only conversation history
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Conversation {
    messages: Vec<Message>,
}

impl Conversation {
    pub fn new() -> Self {
        Self::default()
    }

    /// Wrap an existing message sequence without re-validating it
    pub const fn from_messages(messages: Vec<Message>) -> Self {
        Self { messages }
    }

    /// Append a message.
    ///
    /// Tool messages must answer a still-open call of the nearest preceding
    /// assistant message, with only other tool messages in between. Call ids
    /// declared by one assistant message must be distinct.
    pub fn append(&mut self, message: Message) -> Result<()> {
        if message.role == Role::Tool {
            self.check_tool_linkage(&message)?;
        }
        if message.has_tool_calls() {
            check_distinct_ids(&message)?;
        }
        self.messages.push(message);
        Ok(())
    }

    fn check_tool_linkage(&self, message: &Message) -> Result<()> {
        let id = message.tool_call_id.as_deref().ok_or_else(|| {
            AgentError::Conversation("tool message is missing its tool_call_id".into())
        })?;

        let mut answered = Vec::new();
        for prior in self.messages.iter().rev() {
            match prior.role {
                Role::Tool => answered.push(prior.tool_call_id.as_deref()),
                Role::Assistant if prior.has_tool_calls() => {
                    if !prior.tool_calls.iter().any(|call| call.id == id) {
                        return Err(AgentError::Conversation(format!(
                            "tool result '{id}' matches no declared tool call"
                        )));
                    }
                    if answered.contains(&Some(id)) {
                        return Err(AgentError::Conversation(format!(
                            "tool call '{id}' was already answered"
                        )));
                    }
                    return Ok(());
                }
                _ => break,
            }
        }

        Err(AgentError::Conversation(format!(
            "tool result '{id}' does not follow an assistant tool call"
        )))
    }

    /// Append a tool exchange as a unit: the assistant request followed by
    /// one reply per declared call. Nothing is appended unless every call is
    /// answered.
    pub fn append_exchange(&mut self, exchange: Vec<Message>) -> Result<()> {
        let mut staged = self.clone();
        for message in exchange {
            staged.append(message)?;
        }
        if let Some(id) = staged.unanswered_call() {
            return Err(AgentError::Conversation(format!(
                "tool call '{id}' has no result"
            )));
        }
        *self = staged;
        Ok(())
    }

    /// First call of the trailing assistant request that has no tool reply
    fn unanswered_call(&self) -> Option<&str> {
        let mut answered = Vec::new();
        for message in self.messages.iter().rev() {
            match message.role {
                Role::Tool => answered.push(message.tool_call_id.as_deref()),
                Role::Assistant if message.has_tool_calls() => {
                    return message
                        .tool_calls
                        .iter()
                        .map(|call| call.id.as_str())
                        .find(|id| !answered.contains(&Some(*id)));
                }
                _ => return None,
            }
        }
        None
    }

    /// Independent copy for handing to the completion service
    pub fn snapshot(&self) -> Self {
        self.clone()
    }

    /// Insert a system message at the front unless one is already there.
    /// Never overwrites an existing system message.
    pub fn ensure_system_preamble(&mut self, text: &str) {
        if self.messages.first().map(|m| m.role) != Some(Role::System) {
            self.messages.insert(0, Message::system(text));
        }
    }

    /// Get all messages
    pub fn messages(&self) -> &[Message] {
        &self.messages
    }

    pub fn into_messages(self) -> Vec<Message> {
        self.messages
    }

    /// Get the last message
    pub fn last(&self) -> Option<&Message> {
        self.messages.last()
    }

    /// Clear all messages except system prompt
    pub fn clear_history(&mut self) {
        self.messages.retain(|m| m.role == Role::System);
    }

    /// Number of messages
    pub fn len(&self) -> usize {
        self.messages.len()
    }

    /// Check if empty
    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

fn check_distinct_ids(message: &Message) -> Result<()> {
    let mut seen = HashSet::new();
    match message.tool_calls.iter().find(|call| !seen.insert(call.id.as_str())) {
        Some(call) => Err(AgentError::Conversation(format!(
            "tool call id '{}' is declared more than once",
            call.id
        ))),
        None => Ok(()),
    }
}
