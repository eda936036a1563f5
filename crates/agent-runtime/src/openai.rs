//! OpenAI-compatible LLM Provider
//!
//! Talks to any `/chat/completions` endpoint that follows the OpenAI
//! function-calling format: OpenAI itself, Qwen/DashScope, Groq, vLLM,
//! or a local Ollama behind its `/v1` shim.

use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    message::{Message, Role},
    provider::{Completion, FinishReason, GenerationOptions, LlmProvider, TokenUsage},
    schema::FunctionSchema,
    tool::ToolInvocation,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tracing::{debug, warn};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com/v1";
pub const DEFAULT_MODEL: &str = "gpt-4o-mini";

/// OpenAI-compatible provider configuration
#[derive(Clone)]
pub struct OpenAiConfig {
    /// Bearer credential
    pub api_key: String,

    /// Endpoint root, without the trailing `/chat/completions`
    pub base_url: String,

    /// Default model identifier
    pub model: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl OpenAiConfig {
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: api_key.into(),
            base_url: DEFAULT_BASE_URL.into(),
            model: DEFAULT_MODEL.into(),
            timeout_secs: 60,
        }
    }

    /// Read `LLM_API_KEY`, `LLM_BASE_URL` and `LLM_MODEL`.
    ///
    /// A missing key is a configuration error.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`OpenAiConfig::from_env`] over an arbitrary variable source
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let api_key = lookup("LLM_API_KEY")
            .filter(|key| !key.trim().is_empty())
            .ok_or_else(|| {
                AgentError::Config("LLM_API_KEY environment variable is required".into())
            })?;

        let mut config = Self::new(api_key);
        if let Some(base_url) = lookup("LLM_BASE_URL").filter(|v| !v.is_empty()) {
            config.base_url = base_url;
        }
        if let Some(model) = lookup("LLM_MODEL").filter(|v| !v.is_empty()) {
            config.model = model;
        }
        Ok(config)
    }
}

impl std::fmt::Debug for OpenAiConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAiConfig")
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("timeout_secs", &self.timeout_secs)
            .finish_non_exhaustive()
    }
}

/// OpenAI-compatible chat completions provider
pub struct OpenAiCompatProvider {
    client: reqwest::Client,
    config: OpenAiConfig,
}

impl OpenAiCompatProvider {
    /// Create from configuration
    pub fn from_config(mut config: OpenAiConfig) -> Result<Self> {
        config.base_url = config.base_url.trim_end_matches('/').to_string();

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self { client, config })
    }

    /// Create from environment variables
    pub fn from_env() -> Result<Self> {
        Self::from_config(OpenAiConfig::from_env()?)
    }

    pub const fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Generation options seeded with the configured model
    pub fn default_options(&self) -> GenerationOptions {
        GenerationOptions {
            model: self.config.model.clone(),
            ..GenerationOptions::default()
        }
    }

    /// Convert agent messages to the wire format
    fn to_api_messages(messages: &[Message]) -> Vec<ApiMessage> {
        messages
            .iter()
            .map(|m| {
                let tool_calls: Vec<ApiToolCall> = m
                    .tool_calls
                    .iter()
                    .map(|call| ApiToolCall {
                        id: call.id.clone(),
                        kind: "function".into(),
                        function: ApiFunction {
                            name: call.name.clone(),
                            arguments: call.arguments.to_string(),
                        },
                    })
                    .collect();

                let calls_only =
                    m.role == Role::Assistant && !tool_calls.is_empty() && m.content.is_empty();

                ApiMessage {
                    role: m.role.to_string(),
                    content: (!calls_only).then(|| m.content.clone()),
                    tool_calls: (!tool_calls.is_empty()).then_some(tool_calls),
                    tool_call_id: m.tool_call_id.clone(),
                }
            })
            .collect()
    }

    fn build_body(
        messages: &[Message],
        tools: &[FunctionSchema],
        options: &GenerationOptions,
    ) -> Value {
        let mut body = json!({
            "model": options.model,
            "messages": Self::to_api_messages(messages),
            "temperature": options.temperature,
            "max_tokens": options.max_tokens,
        });

        if !tools.is_empty() {
            body["tools"] = json!(tools);
            body["tool_choice"] = json!("auto");
        }

        body
    }

    /// Convert the first choice of a response to a completion
    fn convert_response(response: ApiResponse) -> Result<Completion> {
        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| AgentError::Provider("No choices in response".into()))?;

        let tool_calls = choice
            .message
            .tool_calls
            .unwrap_or_default()
            .into_iter()
            .map(|call| {
                let arguments = if call.function.arguments.trim().is_empty() {
                    json!({})
                } else {
                    serde_json::from_str(&call.function.arguments).map_err(|e| {
                        AgentError::Parse(format!(
                            "invalid arguments for tool call {}: {e}",
                            call.function.name
                        ))
                    })?
                };
                Ok(ToolInvocation::new(call.id, call.function.name, arguments))
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Completion {
            content: choice.message.content.unwrap_or_default(),
            tool_calls,
            model: response.model,
            usage: response.usage.map(|u| TokenUsage {
                prompt_tokens: u.prompt_tokens,
                completion_tokens: u.completion_tokens,
                total_tokens: u.total_tokens,
            }),
            finish_reason: choice.finish_reason.as_deref().map(FinishReason::parse),
        })
    }

    fn map_status(status: reqwest::StatusCode, body: String) -> AgentError {
        match status.as_u16() {
            429 => AgentError::RateLimited(body),
            401 | 403 => AgentError::Auth("Invalid API key or insufficient permissions".into()),
            code => AgentError::Provider(format!("HTTP {code}: {body}")),
        }
    }
}

#[async_trait]
impl LlmProvider for OpenAiCompatProvider {
    fn name(&self) -> &str {
        "openai-compatible"
    }

    async fn complete(
        &self,
        messages: &[Message],
        tools: &[FunctionSchema],
        options: &GenerationOptions,
    ) -> Result<Completion> {
        let url = format!("{}/chat/completions", self.config.base_url);
        let body = Self::build_body(messages, tools, options);

        debug!(
            model = %options.model,
            messages = messages.len(),
            tools = tools.len(),
            "Sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() || e.is_timeout() {
                    AgentError::ProviderUnavailable(e.to_string())
                } else {
                    AgentError::Provider(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            warn!(status = status.as_u16(), body = %error_body, "Provider returned error");
            return Err(Self::map_status(status, error_body));
        }

        let api_response: ApiResponse = response
            .json()
            .await
            .map_err(|e| AgentError::Parse(format!("Failed to parse response: {e}")))?;

        Self::convert_response(api_response)
    }

    async fn list_models(&self) -> Result<Vec<String>> {
        let url = format!("{}/models", self.config.base_url);
        let response = self
            .client
            .get(&url)
            .bearer_auth(&self.config.api_key)
            .send()
            .await
            .map_err(|e| AgentError::ProviderUnavailable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let error_body = response.text().await.unwrap_or_default();
            return Err(Self::map_status(status, error_body));
        }

        let body: Value = response.json().await.map_err(|e| AgentError::Parse(e.to_string()))?;

        Ok(body["data"]
            .as_array()
            .map(|models| {
                models
                    .iter()
                    .filter_map(|m| m["id"].as_str().map(String::from))
                    .collect()
            })
            .unwrap_or_default())
    }
}

// ── Wire types ──────────────────────────────────────────────────────────────

#[derive(Debug, Serialize)]
struct ApiMessage {
    role: String,
    content: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_calls: Option<Vec<ApiToolCall>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tool_call_id: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiToolCall {
    id: String,
    #[serde(rename = "type", default = "function_kind")]
    kind: String,
    function: ApiFunction,
}

fn function_kind() -> String {
    "function".into()
}

#[derive(Debug, Serialize, Deserialize)]
struct ApiFunction {
    name: String,
    #[serde(default)]
    arguments: String,
}

#[derive(Debug, Deserialize)]
struct ApiResponse {
    #[serde(default)]
    model: String,
    choices: Vec<ApiChoice>,
    usage: Option<ApiUsage>,
}

#[derive(Debug, Deserialize)]
struct ApiChoice {
    message: ApiResponseMessage,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiResponseMessage {
    content: Option<String>,
    tool_calls: Option<Vec<ApiToolCall>>,
}

#[derive(Debug, Deserialize)]
struct ApiUsage {
    prompt_tokens: u32,
    completion_tokens: u32,
    total_tokens: u32,
}

#[cfg(test)]
mod tests {
    use super::*;
    use agent_core::schema::to_function_schema;
    use agent_core::tool::ToolDescriptor;
    use std::collections::HashMap;
    use wiremock::matchers::{body_partial_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn provider(server: &MockServer) -> OpenAiCompatProvider {
        let mut config = OpenAiConfig::new("test-key");
        config.base_url = format!("{}/v1/", server.uri());
        OpenAiCompatProvider::from_config(config).unwrap()
    }

    fn add_schema() -> FunctionSchema {
        to_function_schema(&ToolDescriptor::new("add").with_parameters(json!({
            "type": "object",
            "properties": {"a": {"type": "number"}, "b": {"type": "number"}},
            "required": ["a", "b"]
        })))
    }

    #[test]
    fn test_config_from_lookup() {
        let vars: HashMap<&str, &str> =
            HashMap::from([("LLM_API_KEY", "sk-1"), ("LLM_MODEL", "qwen-turbo")]);
        let config = OpenAiConfig::from_lookup(|k| vars.get(k).map(ToString::to_string)).unwrap();
        assert_eq!(config.api_key, "sk-1");
        assert_eq!(config.model, "qwen-turbo");
        assert_eq!(config.base_url, DEFAULT_BASE_URL);
        assert_eq!(config.timeout_secs, 60);
    }

    #[test]
    fn test_config_requires_key() {
        let err = OpenAiConfig::from_lookup(|_| None).unwrap_err();
        assert!(matches!(err, AgentError::Config(_)));
        assert!(err.to_string().contains("LLM_API_KEY"));
    }

    #[test]
    fn test_tool_call_messages_serialize_arguments_as_string() {
        let messages = vec![
            Message::user("What is 9 + 1053?"),
            Message::assistant_with_tool_calls(
                "",
                vec![ToolInvocation::new("c1", "add", json!({"a": 9, "b": 1053}))],
            ),
            Message::tool("1062", "c1"),
        ];
        let api = serde_json::to_value(OpenAiCompatProvider::to_api_messages(&messages)).unwrap();

        assert_eq!(api[1]["content"], Value::Null);
        assert_eq!(api[1]["tool_calls"][0]["type"], "function");
        let arguments = api[1]["tool_calls"][0]["function"]["arguments"].as_str().unwrap();
        let args: Value = serde_json::from_str(arguments).unwrap();
        assert_eq!(args, json!({"a": 9, "b": 1053}));
        assert_eq!(api[2]["role"], "tool");
        assert_eq!(api[2]["tool_call_id"], "c1");
    }

    #[test]
    fn test_body_omits_tools_when_none() {
        let body = OpenAiCompatProvider::build_body(
            &[Message::user("hi")],
            &[],
            &GenerationOptions::default(),
        );
        assert!(body.get("tools").is_none());
        assert!(body.get("tool_choice").is_none());
        assert_eq!(body["max_tokens"], 2000);
    }

    #[tokio::test]
    async fn test_complete_parses_tool_calls() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .and(header("authorization", "Bearer test-key"))
            .and(body_partial_json(json!({"tool_choice": "auto", "model": "gpt-4o-mini"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "gpt-4o-mini",
                "choices": [{
                    "message": {
                        "role": "assistant",
                        "content": null,
                        "tool_calls": [{
                            "id": "call_1",
                            "type": "function",
                            "function": {"name": "add", "arguments": "{\"a\": 9, \"b\": 1053}"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let completion = provider(&server)
            .complete(
                &[Message::user("What is 9 + 1053?")],
                &[add_schema()],
                &GenerationOptions::default(),
            )
            .await
            .unwrap();

        assert_eq!(completion.content, "");
        assert_eq!(
            completion.tool_calls,
            vec![ToolInvocation::new("call_1", "add", json!({"a": 9, "b": 1053}))]
        );
        assert_eq!(completion.finish_reason, Some(FinishReason::ToolUse));
        assert_eq!(completion.usage.unwrap().total_tokens, 15);
    }

    #[tokio::test]
    async fn test_complete_rejects_malformed_arguments() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "model": "m",
                "choices": [{
                    "message": {
                        "content": null,
                        "tool_calls": [{
                            "id": "c",
                            "type": "function",
                            "function": {"name": "add", "arguments": "{not json"}
                        }]
                    },
                    "finish_reason": "tool_calls"
                }]
            })))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(&[Message::user("x")], &[add_schema()], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Parse(_)));
    }

    #[tokio::test]
    async fn test_complete_maps_http_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(401).set_body_string("bad key"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(&[Message::user("x")], &[], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::Auth(_)));
    }

    #[tokio::test]
    async fn test_complete_maps_rate_limit() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(429).set_body_string("slow down"))
            .mount(&server)
            .await;

        let err = provider(&server)
            .complete(&[Message::user("x")], &[], &GenerationOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, AgentError::RateLimited(_)));
    }

    #[tokio::test]
    async fn test_list_models() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/v1/models"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": [{"id": "gpt-4o-mini"}, {"id": "gpt-4o"}]
            })))
            .mount(&server)
            .await;

        let models = provider(&server).list_models().await.unwrap();
        assert_eq!(models, vec!["gpt-4o-mini", "gpt-4o"]);
    }
}
