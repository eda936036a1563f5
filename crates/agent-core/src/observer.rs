//! Lifecycle Events
//!
//! The loop and the tool middleware report what they do through an injected
//! [`Observer`] instead of writing to ambient global state.

use serde_json::Value;

/// How a turn ended
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum TurnOutcome {
    /// The model produced a final answer
    Answered,
    /// The iteration ceiling was crossed
    IterationLimit,
    /// The completion request failed
    ProviderFailed,
    /// The caller interrupted the turn
    Cancelled,
}

/// Something that happened during a turn
#[derive(Clone, Debug)]
pub enum AgentEvent {
    IterationStarted {
        iteration: usize,
    },
    ToolInvoked {
        name: String,
        arguments: Value,
    },
    ToolCompleted {
        name: String,
        output: String,
        failed: bool,
    },
    TurnCompleted {
        iterations: usize,
        tool_calls: usize,
        outcome: TurnOutcome,
        response_len: usize,
    },
}

/// Receiver of [`AgentEvent`]s
pub trait Observer: Send + Sync {
    fn on_event(&self, event: &AgentEvent);
}

impl<F> Observer for F
where
    F: Fn(&AgentEvent) + Send + Sync,
{
    fn on_event(&self, event: &AgentEvent) {
        self(event);
    }
}

/// Default observer: forwards events to `tracing`
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingObserver;

impl Observer for TracingObserver {
    fn on_event(&self, event: &AgentEvent) {
        match event {
            AgentEvent::IterationStarted { iteration } => {
                tracing::debug!(iteration, "Requesting completion");
            }
            AgentEvent::ToolInvoked { name, arguments } => {
                tracing::info!(tool = %name, "LLM requested tool execution");
                tracing::debug!(tool = %name, %arguments, "Tool parameters");
            }
            AgentEvent::ToolCompleted { name, failed, .. } => {
                if *failed {
                    tracing::warn!(tool = %name, "Tool failed, error returned to LLM");
                } else {
                    tracing::info!(tool = %name, "Tool completed, result returned to LLM");
                }
            }
            AgentEvent::TurnCompleted {
                iterations,
                tool_calls,
                outcome,
                response_len,
            } => {
                if *tool_calls > 0 {
                    tracing::info!(
                        iterations,
                        tool_calls,
                        ?outcome,
                        "Interaction completed: LLM used tools to generate response"
                    );
                } else {
                    tracing::info!(
                        ?outcome,
                        "Interaction completed: LLM provided direct response (no tools used)"
                    );
                }
                tracing::debug!(response_len, "Response length in characters");
            }
        }
    }
}

/// Fan an event out to several observers
pub struct ObserverSet(Vec<std::sync::Arc<dyn Observer>>);

impl ObserverSet {
    pub fn new(observers: Vec<std::sync::Arc<dyn Observer>>) -> Self {
        Self(observers)
    }
}

impl Observer for ObserverSet {
    fn on_event(&self, event: &AgentEvent) {
        for observer in &self.0 {
            observer.on_event(event);
        }
    }
}
