//! Reasoning Loop
//!
//! The bounded tool-calling loop: request a completion, dispatch any tool
//! calls the model declares, feed the results back, repeat until the model
//! answers or the iteration ceiling is crossed.
//!
//! Every way a turn can end is reported as text on the output stream. The
//! loop itself never returns an error.

use std::sync::Arc;
use std::time::Duration;

use async_stream::stream;
use futures::{Stream, StreamExt, future};
use tokio_util::sync::CancellationToken;

use crate::dispatch::ToolGateway;
use crate::emission::{DEFAULT_STREAM_DELAY, emit};
use crate::error::{AgentError, Result};
use crate::message::{Conversation, Message};
use crate::observer::{AgentEvent, Observer, TracingObserver, TurnOutcome};
use crate::profile::DEFAULT_SYSTEM_PROMPT;
use crate::provider::{GenerationOptions, LlmProvider};
use crate::schema::{FunctionSchema, to_function_schemas};
use crate::tool::ToolDescriptor;

/// Circuit breaker for model-driven tool calling
pub const DEFAULT_MAX_ITERATIONS: usize = 5;

/// Emitted when the ceiling is crossed
pub const ITERATION_LIMIT_MESSAGE: &str = "Error: Maximum tool calling iterations reached";

/// Emitted when the caller interrupts a turn
pub const INTERRUPTED_MESSAGE: &str = "Error: Interrupted by user";

/// Agent configuration
#[derive(Clone, Debug)]
pub struct AgentConfig {
    /// System instruction prepended when the history has none
    pub system_prompt: String,

    /// Maximum completion requests per turn
    pub max_iterations: usize,

    /// Generation options
    pub generation: GenerationOptions,

    /// Pause between streamed words
    pub stream_delay: Duration,
}

impl Default for AgentConfig {
    fn default() -> Self {
        Self {
            system_prompt: DEFAULT_SYSTEM_PROMPT.into(),
            max_iterations: DEFAULT_MAX_ITERATIONS,
            generation: GenerationOptions::default(),
            stream_delay: DEFAULT_STREAM_DELAY,
        }
    }
}

/// Item of [`Agent::run_events`]
#[derive(Clone, Debug, PartialEq)]
pub enum TurnEvent {
    /// A message appended to the working history (assistant tool calls and
    /// tool results)
    Message(Message),
    /// Output text for the caller
    Fragment(String),
}

/// The main Agent struct
pub struct Agent {
    provider: Arc<dyn LlmProvider>,
    tools: Vec<FunctionSchema>,
    gateway: ToolGateway,
    config: AgentConfig,
    observer: Arc<dyn Observer>,
}

impl Agent {
    /// Create a new agent
    pub fn new(
        provider: Arc<dyn LlmProvider>,
        tools: Vec<FunctionSchema>,
        gateway: ToolGateway,
        config: AgentConfig,
    ) -> Self {
        Self {
            provider,
            tools,
            gateway,
            config,
            observer: Arc::new(TracingObserver),
        }
    }

    pub fn with_observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = observer;
        self
    }

    /// Run one turn over `history`, yielding text fragments
    pub fn run<'a>(
        &'a self,
        history: &[Message],
        streaming: bool,
    ) -> impl Stream<Item = String> + use<'a> {
        self.run_events(history.to_vec(), streaming, CancellationToken::new())
            .filter_map(|event| {
                future::ready(match event {
                    TurnEvent::Fragment(text) => Some(text),
                    TurnEvent::Message(_) => None,
                })
            })
    }

    /// Run one turn, reporting appended messages as well as fragments.
    ///
    /// `cancel` is checked at iteration boundaries only; an in-flight
    /// completion or tool call always finishes first.
    pub fn run_events(
        &self,
        history: Vec<Message>,
        streaming: bool,
        cancel: CancellationToken,
    ) -> impl Stream<Item = TurnEvent> + '_ {
        stream! {
            let mut working = Conversation::from_messages(history);
            working.ensure_system_preamble(&self.config.system_prompt);

            tracing::info!(
                provider = self.provider.name(),
                model = %self.config.generation.model,
                tools = self.tools.len(),
                "Sending request to LLM"
            );

            let mut iteration = 0;
            let mut tool_calls = 0;
            let mut response_len = 0;

            let outcome = 'turn: loop {
                if cancel.is_cancelled() {
                    tracing::info!(iteration, "Turn interrupted");
                    response_len = INTERRUPTED_MESSAGE.len();
                    yield TurnEvent::Fragment(INTERRUPTED_MESSAGE.into());
                    break TurnOutcome::Cancelled;
                }

                iteration += 1;
                if iteration > self.config.max_iterations {
                    tracing::warn!(
                        max = self.config.max_iterations,
                        "Maximum tool calling iterations reached"
                    );
                    response_len = ITERATION_LIMIT_MESSAGE.len();
                    yield TurnEvent::Fragment(ITERATION_LIMIT_MESSAGE.into());
                    break TurnOutcome::IterationLimit;
                }

                self.observer.on_event(&AgentEvent::IterationStarted { iteration });

                let completion = match self
                    .provider
                    .complete(working.messages(), &self.tools, &self.config.generation)
                    .await
                {
                    Ok(completion) => completion,
                    Err(e) => {
                        tracing::error!(error = %e, "Completion request failed");
                        let text = format!("Error: {e}");
                        response_len = text.len();
                        yield TurnEvent::Fragment(text);
                        break TurnOutcome::ProviderFailed;
                    }
                };

                if !completion.has_tool_calls() {
                    let mut fragments = std::pin::pin!(emit(
                        completion.content,
                        streaming,
                        self.config.stream_delay,
                    ));
                    while let Some(fragment) = fragments.next().await {
                        response_len += fragment.len();
                        yield TurnEvent::Fragment(fragment);
                    }
                    break TurnOutcome::Answered;
                }

                let request =
                    Message::assistant_with_tool_calls(completion.content, completion.tool_calls);
                let calls = request.tool_calls.clone();
                if let Err(e) = working.append(request.clone()) {
                    tracing::error!(error = %e, "Rejected tool calls");
                    let text = format!("Error: {e}");
                    response_len = text.len();
                    yield TurnEvent::Fragment(text);
                    break TurnOutcome::ProviderFailed;
                }
                yield TurnEvent::Message(request);

                for call in calls {
                    tool_calls += 1;
                    let result = self.gateway.invoke(&call.name, &call.arguments).await;
                    let reply = Message::tool(result.content, call.id);
                    if let Err(e) = working.append(reply.clone()) {
                        tracing::error!(error = %e, "Rejected tool result");
                        let text = format!("Error: {e}");
                        response_len = text.len();
                        yield TurnEvent::Fragment(text);
                        break 'turn TurnOutcome::ProviderFailed;
                    }
                    yield TurnEvent::Message(reply);
                }
            };

            self.observer.on_event(&AgentEvent::TurnCompleted {
                iterations: iteration,
                tool_calls,
                outcome,
                response_len,
            });
        }
    }

    /// Adapted schemas offered to the model
    pub fn tools(&self) -> &[FunctionSchema] {
        &self.tools
    }

    /// Get configuration
    pub const fn config(&self) -> &AgentConfig {
        &self.config
    }
}

/// Builder for Agent configuration
pub struct AgentBuilder {
    provider: Option<Arc<dyn LlmProvider>>,
    tools: Vec<FunctionSchema>,
    gateway: ToolGateway,
    config: AgentConfig,
    observer: Option<Arc<dyn Observer>>,
}

impl Default for AgentBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl AgentBuilder {
    pub fn new() -> Self {
        Self {
            provider: None,
            tools: Vec::new(),
            gateway: ToolGateway::unbound(),
            config: AgentConfig::default(),
            observer: None,
        }
    }

    pub fn provider(mut self, provider: Arc<dyn LlmProvider>) -> Self {
        self.provider = Some(provider);
        self
    }

    /// Register tool descriptors, adapting them to function schemas
    pub fn tools(mut self, descriptors: &[ToolDescriptor]) -> Self {
        self.tools = to_function_schemas(descriptors);
        self
    }

    pub fn gateway(mut self, gateway: ToolGateway) -> Self {
        self.gateway = gateway;
        self
    }

    pub fn config(mut self, config: AgentConfig) -> Self {
        self.config = config;
        self
    }

    pub fn system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.config.system_prompt = prompt.into();
        self
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.config.generation.model = model.into();
        self
    }

    pub const fn max_iterations(mut self, max: usize) -> Self {
        self.config.max_iterations = max;
        self
    }

    pub const fn stream_delay(mut self, delay: Duration) -> Self {
        self.config.stream_delay = delay;
        self
    }

    pub fn observer(mut self, observer: Arc<dyn Observer>) -> Self {
        self.observer = Some(observer);
        self
    }

    pub fn build(self) -> Result<Agent> {
        let provider = self
            .provider
            .ok_or_else(|| AgentError::Config("Provider is required".into()))?;

        let agent = Agent::new(provider, self.tools, self.gateway, self.config);
        Ok(match self.observer {
            Some(observer) => agent.with_observer(observer),
            None => agent,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::ToolExecutor;
    use crate::message::Role;
    use crate::provider::Completion;
    use crate::testing::ScriptedProvider;
    use crate::tool::ToolInvocation;
    use async_trait::async_trait;
    use serde_json::{Value, json};
    use std::sync::Mutex;

    struct Adder;

    #[async_trait]
    impl ToolExecutor for Adder {
        async fn execute(&self, _name: &str, arguments: &Value) -> Result<String> {
            let a = arguments["a"].as_i64().unwrap_or_default();
            let b = arguments["b"].as_i64().unwrap_or_default();
            Ok((a + b).to_string())
        }
    }

    fn add_call(id: &str) -> ToolInvocation {
        ToolInvocation::new(id, "add", json!({"a": 9, "b": 1053}))
    }

    fn agent(provider: &Arc<ScriptedProvider>) -> Agent {
        AgentBuilder::new()
            .provider(provider.clone())
            .tools(&[ToolDescriptor::new("add")])
            .gateway(ToolGateway::new(Arc::new(Adder)))
            .system_prompt("You add numbers.")
            .build()
            .unwrap()
    }

    #[tokio::test]
    async fn test_direct_answer_uses_one_request() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Completion::text("Hello there"))]));
        let agent = agent(&provider);

        let out: Vec<String> = agent.run(&[Message::user("Hi")], false).collect().await;

        assert_eq!(out, vec!["Hello there"]);
        assert_eq!(provider.calls(), 1);

        let sent = provider.requests();
        assert_eq!(sent[0][0].role, Role::System);
        assert_eq!(sent[0][0].content, "You add numbers.");
        assert_eq!(sent[0][1].content, "Hi");
    }

    #[tokio::test]
    async fn test_existing_system_message_is_kept() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Completion::text("ok"))]));
        let agent = agent(&provider);
        let history = [Message::system("Custom"), Message::user("Hi")];

        let _: Vec<String> = agent.run(&history, false).collect().await;

        let sent = provider.requests();
        assert_eq!(sent[0].len(), 2);
        assert_eq!(sent[0][0].content, "Custom");
    }

    #[tokio::test]
    async fn test_tool_round_trip() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Completion::tool_calls(vec![add_call("call_1")])),
            Ok(Completion::text("The answer is 1062.")),
        ]));
        let agent = agent(&provider);

        let events: Vec<TurnEvent> = agent
            .run_events(vec![Message::user("What is 9 + 1053?")], false, CancellationToken::new())
            .collect()
            .await;

        assert_eq!(events.len(), 3);
        let TurnEvent::Message(request) = &events[0] else { panic!("expected message") };
        assert_eq!(request.tool_calls, vec![add_call("call_1")]);
        let TurnEvent::Message(reply) = &events[1] else { panic!("expected message") };
        assert_eq!(reply.content, "1062");
        assert_eq!(reply.tool_call_id.as_deref(), Some("call_1"));
        assert_eq!(events[2], TurnEvent::Fragment("The answer is 1062.".into()));

        let second = &provider.requests()[1];
        assert_eq!(second.len(), 4);
        assert!(second[2].has_tool_calls());
        assert_eq!(second[3].role, Role::Tool);
    }

    #[tokio::test]
    async fn test_calls_dispatch_in_model_order() {
        let order = Arc::new(Mutex::new(Vec::new()));

        struct Recorder(Arc<Mutex<Vec<String>>>);

        #[async_trait]
        impl ToolExecutor for Recorder {
            async fn execute(&self, name: &str, _arguments: &Value) -> Result<String> {
                self.0.lock().unwrap().push(name.to_string());
                Ok("done".into())
            }
        }

        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Completion::tool_calls(vec![
                ToolInvocation::new("1", "multiply", json!({})),
                ToolInvocation::new("2", "add", json!({})),
                ToolInvocation::new("3", "sqrt", json!({})),
            ])),
            Ok(Completion::text("done")),
        ]));
        let agent = AgentBuilder::new()
            .provider(provider.clone())
            .gateway(ToolGateway::new(Arc::new(Recorder(order.clone()))))
            .build()
            .unwrap();

        let _: Vec<String> = agent.run(&[Message::user("go")], false).collect().await;
        assert_eq!(*order.lock().unwrap(), vec!["multiply", "add", "sqrt"]);
    }

    #[tokio::test]
    async fn test_iteration_limit() {
        let script = (1..=6)
            .map(|i| Ok(Completion::tool_calls(vec![add_call(&format!("call_{i}"))])))
            .collect();
        let provider = Arc::new(ScriptedProvider::new(script));
        let agent = agent(&provider);

        let out: Vec<String> = agent.run(&[Message::user("loop")], false).collect().await;

        assert_eq!(out, vec![ITERATION_LIMIT_MESSAGE]);
        assert_eq!(provider.calls(), DEFAULT_MAX_ITERATIONS);
    }

    #[tokio::test]
    async fn test_provider_failure_ends_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Completion::tool_calls(vec![add_call("call_1")])),
            Err(AgentError::ProviderUnavailable("connection refused".into())),
            Ok(Completion::text("never reached")),
        ]));
        let agent = agent(&provider);

        let out: Vec<String> = agent.run(&[Message::user("hi")], false).collect().await;

        assert_eq!(out, vec!["Error: Provider unavailable: connection refused"]);
        assert_eq!(provider.calls(), 2);
    }

    #[tokio::test]
    async fn test_empty_final_content_yields_nothing() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Completion::text(""))]));
        let agent = agent(&provider);

        let out: Vec<String> = agent.run(&[Message::user("hi")], true).collect().await;
        assert!(out.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_streamed_final_answer() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Completion::text("a b c"))]));
        let agent = agent(&provider);

        let out: Vec<String> = agent.run(&[Message::user("hi")], true).collect().await;
        assert_eq!(out, vec!["a ", "b ", "c"]);
    }

    #[tokio::test]
    async fn test_cancellation_between_iterations() {
        let cancel = CancellationToken::new();
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Completion::tool_calls(vec![add_call("call_1")])),
            Ok(Completion::text("never reached")),
        ]));
        let agent = agent(&provider);

        let events = agent.run_events(vec![Message::user("hi")], false, cancel.clone());
        let mut events = std::pin::pin!(events);

        // assistant request, then the tool result
        assert!(matches!(events.next().await, Some(TurnEvent::Message(_))));
        assert!(matches!(events.next().await, Some(TurnEvent::Message(_))));
        cancel.cancel();

        assert_eq!(
            events.next().await,
            Some(TurnEvent::Fragment(INTERRUPTED_MESSAGE.into()))
        );
        assert_eq!(events.next().await, None);
        assert_eq!(provider.calls(), 1);
    }

    #[tokio::test]
    async fn test_duplicate_call_ids_end_turn() {
        let provider = Arc::new(ScriptedProvider::new(vec![Ok(Completion::tool_calls(vec![
            add_call("dup"),
            add_call("dup"),
        ]))]));
        let agent = agent(&provider);

        let out: Vec<String> = agent.run(&[Message::user("hi")], false).collect().await;
        assert_eq!(out.len(), 1);
        assert!(out[0].starts_with("Error: Conversation error"));
    }

    #[tokio::test]
    async fn test_observer_sees_turn_summary() {
        let summary = Arc::new(Mutex::new(None));
        let observer = {
            let summary = summary.clone();
            move |event: &AgentEvent| {
                if let AgentEvent::TurnCompleted { iterations, tool_calls, outcome, .. } = event {
                    *summary.lock().unwrap() = Some((*iterations, *tool_calls, *outcome));
                }
            }
        };
        let provider = Arc::new(ScriptedProvider::new(vec![
            Ok(Completion::tool_calls(vec![add_call("call_1")])),
            Ok(Completion::text("1062")),
        ]));
        let agent = agent(&provider).with_observer(Arc::new(observer));

        let _: Vec<String> = agent.run(&[Message::user("hi")], false).collect().await;
        assert_eq!(*summary.lock().unwrap(), Some((2, 1, TurnOutcome::Answered)));
    }

    #[test]
    fn test_builder_requires_provider() {
        assert!(matches!(AgentBuilder::new().build(), Err(AgentError::Config(_))));
    }
}
