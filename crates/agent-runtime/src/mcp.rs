//! MCP Tool Provider
//!
//! Model Context Protocol client over streamable HTTP: JSON-RPC 2.0 requests
//! are POSTed to a single endpoint, and the server may answer with plain JSON
//! or a one-shot `text/event-stream` body.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    tool::{ToolDescriptor, ToolProvider},
};
use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// MCP protocol version
pub const PROTOCOL_VERSION: &str = "2024-11-05";

const SESSION_HEADER: &str = "Mcp-Session-Id";

/// MCP server endpoint configuration
#[derive(Clone, Debug)]
pub struct McpConfig {
    /// Full endpoint URL, e.g. `http://localhost:8000/mcp`
    pub url: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl McpConfig {
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            timeout_secs: 30,
        }
    }

    /// Read `MCP_SERVER_URL`; `None` when unset
    pub fn from_env() -> Option<Self> {
        std::env::var("MCP_SERVER_URL")
            .ok()
            .filter(|url| !url.trim().is_empty())
            .map(Self::new)
    }
}

/// JSON-RPC 2.0 request
#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    id: Option<u64>,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

/// JSON-RPC 2.0 response
#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<JsonRpcError>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcError {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
struct ListToolsResult {
    #[serde(default)]
    tools: Vec<McpTool>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct McpTool {
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    input_schema: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CallToolResult {
    #[serde(default)]
    content: Vec<ContentBlock>,
    #[serde(default)]
    is_error: bool,
}

#[derive(Debug, Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    text: Option<String>,
}

/// Connection state shared by every call in a session
#[derive(Debug, Default)]
struct McpState {
    connected: bool,
    session_id: Option<String>,
}

/// Tool provider backed by a remote MCP server
pub struct McpHttpToolProvider {
    client: reqwest::Client,
    config: McpConfig,
    state: RwLock<McpState>,
    next_id: AtomicU64,
}

impl McpHttpToolProvider {
    pub fn new(config: McpConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("failed to create HTTP client: {e}")))?;

        Ok(Self {
            client,
            config,
            state: RwLock::new(McpState::default()),
            next_id: AtomicU64::new(1),
        })
    }

    pub fn url(&self) -> &str {
        &self.config.url
    }

    async fn post(
        &self,
        method: &str,
        id: Option<u64>,
        params: Option<Value>,
    ) -> Result<reqwest::Response> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id,
            method,
            params,
        };

        let mut builder = self
            .client
            .post(&self.config.url)
            .header("Accept", "application/json, text/event-stream")
            .json(&request);
        if let Some(session_id) = &self.state.read().await.session_id {
            builder = builder.header(SESSION_HEADER, session_id);
        }

        let response = builder
            .send()
            .await
            .map_err(|e| AgentError::ToolProvider(format!("{method}: {e}")))?;

        if !response.status().is_success() {
            let status = response.status().as_u16();
            let body = response.text().await.unwrap_or_default();
            return Err(AgentError::ToolProvider(format!("{method}: HTTP {status}: {body}")));
        }

        Ok(response)
    }

    /// Send a request and return its `result`
    async fn request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        debug!(method, id, "MCP request");

        let response = self.post(method, Some(id), Some(params)).await?;

        let session_id = response
            .headers()
            .get(SESSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .map(String::from);
        if let Some(session_id) = session_id {
            self.state.write().await.session_id = Some(session_id);
        }

        let is_sse = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with("text/event-stream"));
        let body = response
            .text()
            .await
            .map_err(|e| AgentError::ToolProvider(format!("{method}: {e}")))?;

        let rpc: JsonRpcResponse = if is_sse {
            parse_event_stream(&body)?
        } else {
            serde_json::from_str(&body).map_err(|e| AgentError::Parse(format!("{method}: {e}")))?
        };

        if let Some(error) = rpc.error {
            return Err(AgentError::ToolProvider(format!(
                "{method} failed ({}): {}",
                error.code, error.message
            )));
        }
        Ok(rpc.result.unwrap_or(Value::Null))
    }

    async fn notify(&self, method: &str) -> Result<()> {
        self.post(method, None, None).await.map(|_| ())
    }

    async fn ensure_connected(&self) -> Result<()> {
        if self.state.read().await.connected {
            Ok(())
        } else {
            Err(AgentError::ToolProvider("not connected to MCP server".into()))
        }
    }
}

/// Pull the JSON-RPC response out of an event-stream body
fn parse_event_stream(body: &str) -> Result<JsonRpcResponse> {
    body.lines()
        .filter_map(|line| line.strip_prefix("data:"))
        .map(str::trim)
        .filter(|data| !data.is_empty())
        .find_map(|data| serde_json::from_str::<JsonRpcResponse>(data).ok())
        .ok_or_else(|| AgentError::Parse("no JSON-RPC message in event stream".into()))
}

#[async_trait]
impl ToolProvider for McpHttpToolProvider {
    fn name(&self) -> &str {
        "mcp"
    }

    async fn connect(&self) -> Result<()> {
        if self.state.read().await.connected {
            return Ok(());
        }

        info!(url = %self.config.url, "Connecting to MCP server");
        let result = self
            .request(
                "initialize",
                json!({
                    "protocolVersion": PROTOCOL_VERSION,
                    "capabilities": {},
                    "clientInfo": {
                        "name": env!("CARGO_PKG_NAME"),
                        "version": env!("CARGO_PKG_VERSION"),
                    }
                }),
            )
            .await?;

        if let Some(server) = result.get("serverInfo") {
            info!(server = %server, "MCP server initialized");
        }

        self.notify("notifications/initialized").await?;
        self.state.write().await.connected = true;
        Ok(())
    }

    async fn list_tools(&self) -> Result<Vec<ToolDescriptor>> {
        self.ensure_connected().await?;

        let result = self.request("tools/list", json!({})).await?;
        let listed: ListToolsResult = serde_json::from_value(result)
            .map_err(|e| AgentError::Parse(format!("tools/list: {e}")))?;

        Ok(listed
            .tools
            .into_iter()
            .map(|tool| ToolDescriptor {
                name: tool.name,
                description: tool.description,
                parameter_schema: tool.input_schema,
            })
            .collect())
    }

    async fn call_tool(&self, name: &str, arguments: &Value) -> Result<String> {
        self.ensure_connected().await?;

        let result = self
            .request("tools/call", json!({"name": name, "arguments": arguments}))
            .await?;
        let called: CallToolResult = serde_json::from_value(result)
            .map_err(|e| AgentError::Parse(format!("tools/call: {e}")))?;

        let text = called
            .content
            .into_iter()
            .find(|block| block.kind == "text")
            .and_then(|block| block.text);

        if called.is_error {
            return Err(AgentError::ToolExecution(
                text.unwrap_or_else(|| format!("{name} reported an error")),
            ));
        }
        Ok(text.unwrap_or_else(|| "No result returned".into()))
    }

    async fn close(&self) -> Result<()> {
        let mut state = self.state.write().await;
        if !state.connected {
            return Ok(());
        }
        state.connected = false;

        // a server that issued a session id expects it to be released
        if let Some(session_id) = state.session_id.take() {
            let released = self
                .client
                .delete(&self.config.url)
                .header(SESSION_HEADER, &session_id)
                .send()
                .await;
            if let Err(e) = released {
                debug!(error = %e, "MCP session release failed");
            }
        }

        info!("Disconnected from MCP server");
        Ok(())
    }
}
