//! Session Management
//!
//! A session binds an [`AgentProfile`] to a completion provider, owns the
//! canonical conversation history, and drives one orchestration pass per
//! submitted user message.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use chrono::{DateTime, Utc};
use futures::{Stream, StreamExt};
use serde::{Deserialize, Serialize};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use crate::dispatch::{ObservedExecutor, ProviderExecutor, ToolGateway};
use crate::emission::DEFAULT_STREAM_DELAY;
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::observer::{Observer, TracingObserver};
use crate::profile::AgentProfile;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::reasoning::{Agent, AgentBuilder, AgentConfig, DEFAULT_MAX_ITERATIONS, TurnEvent};
use crate::tool::ToolDescriptor;

/// Unique session identifier
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(String);

impl SessionId {
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Settings consumed by a session
#[derive(Clone, Debug)]
pub struct SessionConfig {
    /// Model and sampling settings
    pub generation: GenerationOptions,

    /// Replaces the profile's system instruction when set
    pub system_prompt: Option<String>,

    /// Emit the final answer word by word
    pub streaming: bool,

    /// Completion requests allowed per turn
    pub max_iterations: usize,

    /// Pause between streamed words
    pub stream_delay: Duration,

    /// Display hint for the presentation layer; the core ignores it
    pub show_thinking: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            generation: GenerationOptions::default(),
            system_prompt: None,
            streaming: true,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            stream_delay: DEFAULT_STREAM_DELAY,
            show_thinking: false,
        }
    }
}

/// A live agent session
pub struct Session {
    /// Unique identifier
    pub id: SessionId,

    profile: AgentProfile,
    provider: Arc<dyn LlmProvider>,
    config: SessionConfig,
    observer: Arc<dyn Observer>,

    /// Registered tool descriptors
    descriptors: Vec<ToolDescriptor>,

    /// Canonical conversation history
    conversation: Conversation,

    /// Present once initialized
    agent: Option<Agent>,

    tools_connected: bool,
    closed: bool,

    /// Creation timestamp
    pub created_at: DateTime<Utc>,

    /// Last activity timestamp
    pub updated_at: DateTime<Utc>,
}

impl Session {
    /// Create a new, uninitialized session
    pub fn new(
        profile: AgentProfile,
        provider: Arc<dyn LlmProvider>,
        config: SessionConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: SessionId::new(),
            profile,
            provider,
            config,
            observer: Arc::new(TracingObserver),
            descriptors: Vec::new(),
            conversation: Conversation::new(),
            agent: None,
            tools_connected: false,
            closed: false,
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the lifecycle observer. Takes effect at `initialize`.
    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Connect the tool provider, register its tools and bind the gateway.
    ///
    /// Errors are fatal to the session; call [`Session::shutdown`] afterwards
    /// to release whatever was acquired.
    pub async fn initialize(&mut self) -> Result<()> {
        if self.closed {
            return Err(AgentError::Session("session has been shut down".into()));
        }
        if self.agent.is_some() {
            return Ok(());
        }

        tracing::info!(agent = %self.profile.name, session = %self.id, "Initializing agent");

        let tool_provider = self.profile.tool_provider.clone();
        tracing::debug!(provider = tool_provider.name(), "Connecting to tool provider");
        if let Err(e) = tool_provider.connect().await {
            tracing::error!(error = %e, "Failed to initialize agent");
            return Err(e);
        }
        self.tools_connected = true;

        let descriptors = tool_provider.list_tools().await.inspect_err(|e| {
            tracing::error!(error = %e, "Failed to retrieve tools");
        })?;
        tracing::info!(
            count = descriptors.len(),
            tools = ?descriptors.iter().map(|d| d.name.as_str()).collect::<Vec<_>>(),
            "Retrieved tools from provider"
        );

        // logging middleware is composed once here, not swapped per turn
        let executor =
            ObservedExecutor::new(ProviderExecutor::new(tool_provider), self.observer.clone());

        let config = AgentConfig {
            system_prompt: self
                .config
                .system_prompt
                .clone()
                .unwrap_or_else(|| self.profile.system_instruction.clone()),
            max_iterations: self.config.max_iterations,
            generation: self.config.generation.clone(),
            stream_delay: self.config.stream_delay,
        };

        let agent = AgentBuilder::new()
            .provider(self.provider.clone())
            .tools(&descriptors)
            .gateway(ToolGateway::new(Arc::new(executor)))
            .config(config)
            .observer(self.observer.clone())
            .build()?;

        tracing::info!(
            agent = %self.profile.name,
            llm = self.provider.name(),
            model = %self.config.generation.model,
            tools = descriptors.len(),
            thinking = self.config.show_thinking,
            streaming = self.config.streaming,
            "Agent initialized"
        );

        self.descriptors = descriptors;
        self.agent = Some(agent);
        Ok(())
    }

    /// Run one turn for `user_text`
    pub fn submit<'a>(
        &'a mut self,
        user_text: &str,
    ) -> Result<impl Stream<Item = String> + use<'a>> {
        self.submit_with_cancel(user_text, CancellationToken::new())
    }

    /// Run one turn, stopping at the next iteration boundary once `cancel`
    /// fires.
    ///
    /// The user message is recorded immediately. Each tool exchange is
    /// recorded once all of its calls are answered, and the final assistant
    /// message (all yielded text) once the stream is exhausted. A turn that
    /// stops partway never leaves an unanswered tool call behind.
    pub fn submit_with_cancel<'a>(
        &'a mut self,
        user_text: &str,
        cancel: CancellationToken,
    ) -> Result<impl Stream<Item = String> + use<'a>> {
        let agent = self
            .agent
            .as_ref()
            .ok_or_else(|| AgentError::Session("session is not initialized".into()))?;

        tracing::info!(input = %user_text, "Processing user input");

        let conversation = &mut self.conversation;
        conversation.append(Message::user(user_text))?;
        let history = conversation.snapshot().into_messages();

        let streaming = self.config.streaming;
        let updated_at = &mut self.updated_at;

        Ok(stream! {
            let mut response = String::new();
            let mut exchange: Vec<Message> = Vec::new();
            let mut open_calls = 0;
            let mut events = std::pin::pin!(agent.run_events(history, streaming, cancel));

            while let Some(event) = events.next().await {
                match event {
                    TurnEvent::Message(message) => {
                        // an exchange is committed only once every declared call is answered
                        if message.has_tool_calls() {
                            exchange.clear();
                            open_calls = message.tool_calls.len();
                        } else {
                            open_calls = open_calls.saturating_sub(1);
                        }
                        exchange.push(message);

                        if open_calls == 0 {
                            let complete = std::mem::take(&mut exchange);
                            if let Err(e) = conversation.append_exchange(complete) {
                                tracing::warn!(
                                    error = %e,
                                    "Dropped tool exchange from canonical history"
                                );
                            }
                        }
                    }
                    TurnEvent::Fragment(fragment) => {
                        response.push_str(&fragment);
                        yield fragment;
                    }
                }
            }

            if let Err(e) = conversation.append(Message::assistant(response)) {
                tracing::warn!(error = %e, "Could not record assistant response");
            }
            *updated_at = Utc::now();
        })
    }

    /// Release both connections. Safe to call repeatedly and after a failed
    /// `initialize`.
    pub async fn shutdown(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }
        self.closed = true;
        self.agent = None;

        let mut first_error = None;

        if self.tools_connected {
            self.tools_connected = false;
            if let Err(e) = self.profile.tool_provider.close().await {
                tracing::warn!(error = %e, "Failed to close tool provider");
                first_error.get_or_insert(e);
            }
        }

        if let Err(e) = self.provider.close().await {
            tracing::warn!(error = %e, "Failed to close LLM provider");
            first_error.get_or_insert(e);
        }

        tracing::info!(session = %self.id, "Agent cleanup completed");
        first_error.map_or(Ok(()), Err)
    }

    pub const fn is_initialized(&self) -> bool {
        self.agent.is_some()
    }

    /// Canonical conversation history
    pub const fn history(&self) -> &Conversation {
        &self.conversation
    }

    /// Tools registered at initialization
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    pub const fn profile(&self) -> &AgentProfile {
        &self.profile
    }

    pub const fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Message count
    pub fn message_count(&self) -> usize {
        self.conversation.len()
    }
}
