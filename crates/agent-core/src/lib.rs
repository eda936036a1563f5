//! # agent-core
//!
//! Tool-calling orchestration with provider-agnostic LLM and tool-provider
//! boundaries.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                          Session                             │
//! │  ┌─────────────┐  ┌─────────────┐  ┌──────────────────────┐  │
//! │  │  Reasoning  │  │    Tool     │  │    LlmProvider       │  │
//! │  │    Loop     │──│   Gateway   │  │    (Strategy)        │  │
//! │  └─────────────┘  └──────┬──────┘  └──────────────────────┘  │
//! │                          │                                   │
//! │                  ┌───────┴───────┐                           │
//! │                  │ ToolProvider  │  local registry or MCP    │
//! │                  └───────────────┘                           │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! A concrete agent is an [`AgentProfile`] (name, instruction, tool source)
//! handed to a [`Session`]; the loop itself is shared.

pub mod dispatch;
pub mod emission;
pub mod error;
pub mod message;
pub mod observer;
pub mod profile;
pub mod provider;
pub mod reasoning;
pub mod schema;
pub mod session;
pub mod tool;

#[cfg(test)]
mod testing;

pub use dispatch::{ObservedExecutor, ProviderExecutor, ToolExecutor, ToolGateway};
pub use error::{AgentError, Result};
pub use message::{Conversation, Message, Role};
pub use observer::{AgentEvent, Observer, ObserverSet, TracingObserver, TurnOutcome};
pub use profile::{AgentProfile, DEFAULT_SYSTEM_PROMPT};
pub use provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage};
pub use reasoning::{Agent, AgentBuilder, AgentConfig, TurnEvent};
pub use schema::{FunctionSchema, to_function_schema, to_function_schemas};
pub use session::{Session, SessionConfig, SessionId};
pub use tool::{
    ParameterSchema, Tool, ToolDescriptor, ToolInvocation, ToolProvider, ToolRegistry, ToolResult,
    ToolSchema,
};
