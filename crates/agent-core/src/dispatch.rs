//! Tool Dispatch Gateway
//!
//! Every tool call from the loop passes through [`ToolGateway::invoke`], which
//! turns both results and failures into text. A failed tool is conversation
//! content the model can react to, never an error for the loop.

use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

use crate::error::Result;
use crate::observer::{AgentEvent, Observer};
use crate::tool::{ToolProvider, ToolResult};

/// A single callable that runs any tool by name
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(&self, name: &str, arguments: &Value) -> Result<String>;
}

/// Routes every call to a [`ToolProvider`] over its shared connection
pub struct ProviderExecutor {
    provider: Arc<dyn ToolProvider>,
}

impl ProviderExecutor {
    pub fn new(provider: Arc<dyn ToolProvider>) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl ToolExecutor for ProviderExecutor {
    async fn execute(&self, name: &str, arguments: &Value) -> Result<String> {
        self.provider.call_tool(name, arguments).await
    }
}

/// Middleware that reports invocations to an [`Observer`].
/// Wrap once when the session is built.
pub struct ObservedExecutor<E> {
    inner: E,
    observer: Arc<dyn Observer>,
}

impl<E: ToolExecutor> ObservedExecutor<E> {
    pub fn new(inner: E, observer: Arc<dyn Observer>) -> Self {
        Self { inner, observer }
    }
}

#[async_trait]
impl<E: ToolExecutor> ToolExecutor for ObservedExecutor<E> {
    async fn execute(&self, name: &str, arguments: &Value) -> Result<String> {
        self.observer.on_event(&AgentEvent::ToolInvoked {
            name: name.to_string(),
            arguments: arguments.clone(),
        });

        let result = self.inner.execute(name, arguments).await;

        let (output, failed) = match &result {
            Ok(text) => (text.clone(), false),
            Err(e) => (e.to_string(), true),
        };
        self.observer.on_event(&AgentEvent::ToolCompleted {
            name: name.to_string(),
            output,
            failed,
        });

        result
    }
}

/// Normalizes tool execution to [`ToolResult`] text
#[derive(Clone, Default)]
pub struct ToolGateway {
    executor: Option<Arc<dyn ToolExecutor>>,
}

impl ToolGateway {
    pub fn new(executor: Arc<dyn ToolExecutor>) -> Self {
        Self {
            executor: Some(executor),
        }
    }

    /// A gateway with nothing bound; every call reports that
    pub fn unbound() -> Self {
        Self::default()
    }

    /// Run a tool. Never fails.
    pub async fn invoke(&self, name: &str, arguments: &Value) -> ToolResult {
        let Some(executor) = &self.executor else {
            tracing::warn!(tool = %name, "No tool executor configured");
            return ToolResult::new(format!("Error: No tool executor available for {name}"));
        };

        tracing::info!(tool = %name, %arguments, "Executing tool");

        match executor.execute(name, arguments).await {
            Ok(output) => {
                tracing::info!(tool = %name, result = %output, "Tool result");
                ToolResult::new(output)
            }
            Err(e) => {
                tracing::error!(tool = %name, error = %e, "Tool execution error");
                ToolResult::new(format!("Error executing {name}: {e}"))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::AgentError;
    use serde_json::json;
    use std::sync::Mutex;

    struct Divider;

    #[async_trait]
    impl ToolExecutor for Divider {
        async fn execute(&self, name: &str, arguments: &Value) -> Result<String> {
            let a = arguments["a"].as_f64().unwrap_or_default();
            let b = arguments["b"].as_f64().unwrap_or_default();
            if b == 0.0 {
                return Err(AgentError::ToolExecution("Cannot divide by zero".into()));
            }
            Ok(format!("{name}={}", a / b))
        }
    }

    struct Disconnected;

    #[async_trait]
    impl ToolExecutor for Disconnected {
        async fn execute(&self, _name: &str, _arguments: &Value) -> Result<String> {
            Err(AgentError::ToolProvider("connection reset".into()))
        }
    }

    #[tokio::test]
    async fn test_success_passes_text_through() {
        let gateway = ToolGateway::new(Arc::new(Divider));
        let result = gateway.invoke("divide", &json!({"a": 6, "b": 3})).await;
        assert_eq!(result.content, "divide=2");
    }

    #[tokio::test]
    async fn test_domain_error_becomes_text() {
        let gateway = ToolGateway::new(Arc::new(Divider));
        let result = gateway.invoke("divide", &json!({"a": 5, "b": 0})).await;
        assert_eq!(result.content, "Error executing divide: Cannot divide by zero");
    }

    #[tokio::test]
    async fn test_connection_failure_becomes_text() {
        let gateway = ToolGateway::new(Arc::new(Disconnected));
        let result = gateway.invoke("add", &json!({})).await;
        assert!(result.content.starts_with("Error executing add:"));
        assert!(result.content.contains("connection reset"));
    }

    #[tokio::test]
    async fn test_unbound_gateway_says_so() {
        let gateway = ToolGateway::unbound();
        let result = gateway.invoke("add", &json!({})).await;
        assert_eq!(result.content, "Error: No tool executor available for add");
    }

    #[tokio::test]
    async fn test_observed_executor_reports_both_sides() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let observer = {
            let events = events.clone();
            move |event: &AgentEvent| {
                let label = match event {
                    AgentEvent::ToolInvoked { name, .. } => format!("invoked:{name}"),
                    AgentEvent::ToolCompleted { name, failed, .. } => {
                        format!("completed:{name}:{failed}")
                    }
                    _ => return,
                };
                events.lock().unwrap().push(label);
            }
        };

        let executor = ObservedExecutor::new(Divider, Arc::new(observer));
        let gateway = ToolGateway::new(Arc::new(executor));
        gateway.invoke("divide", &json!({"a": 1, "b": 0})).await;

        assert_eq!(
            *events.lock().unwrap(),
            vec!["invoked:divide".to_string(), "completed:divide:true".to_string()]
        );
    }
}
