//! MCP Tool Server Client
//!
//! JSON-RPC 2.0 client for a remote Model Context Protocol tool server
//! over streamable HTTP. Remote tool descriptors are wrapped as local
//! `Tool` implementations so the registry treats them uniformly.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use agent_core::{
    error::{AgentError, Result},
    tool::{ParameterSchema, Tool, ToolCall, ToolResult, ToolSchema},
};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

const JSONRPC_VERSION: &str = "2.0";
const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// MCP client configuration
#[derive(Clone, Debug)]
pub struct McpConfig {
    /// Tool server endpoint
    pub url: String,

    /// Shared secret sent as the `x-api-key` header
    pub api_key: String,

    /// Request timeout in seconds
    pub timeout_secs: u64,
}

impl McpConfig {
    /// Load from environment.
    ///
    /// The server URL defaults to the local development address; the
    /// API key is required.
    pub fn from_env() -> Result<Self> {
        let url = std::env::var("MCP_SERVER_URL")
            .unwrap_or_else(|_| "http://localhost:3000/mcp".to_string());

        let api_key = match std::env::var("X_API_KEY") {
            Ok(key) if !key.trim().is_empty() => key,
            _ => {
                return Err(AgentError::Config(
                    "missing required environment variable X_API_KEY".into(),
                ))
            }
        };

        Ok(Self {
            url,
            api_key,
            timeout_secs: 30,
        })
    }
}

/// Tool descriptor advertised by the remote server
#[derive(Clone, Debug, Deserialize)]
pub struct RemoteToolDescriptor {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    #[serde(default, alias = "inputSchema")]
    pub input_schema: Option<Value>,
}

#[derive(Deserialize)]
struct ToolListResult {
    #[serde(default)]
    tools: Vec<RemoteToolDescriptor>,
}

#[derive(Deserialize)]
struct ToolCallResult {
    #[serde(default)]
    content: Vec<ContentBlock>,

    #[serde(default, alias = "isError")]
    is_error: bool,
}

#[derive(Deserialize)]
struct ContentBlock {
    #[serde(rename = "type")]
    kind: String,

    #[serde(default)]
    text: Option<String>,
}

/// Client for one MCP tool server
pub struct McpClient {
    http: reqwest::Client,
    config: McpConfig,
    request_id: AtomicU64,
    initialized: tokio::sync::Mutex<bool>,
}

impl McpClient {
    pub fn from_config(config: McpConfig) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| AgentError::Config(format!("building HTTP client: {}", e)))?;

        Ok(Self {
            http,
            config,
            request_id: AtomicU64::new(1),
            initialized: tokio::sync::Mutex::new(false),
        })
    }

    pub fn from_env() -> Result<Self> {
        Self::from_config(McpConfig::from_env()?)
    }

    /// Endpoint this client talks to
    pub fn url(&self) -> &str {
        &self.config.url
    }

    fn next_id(&self) -> u64 {
        self.request_id.fetch_add(1, Ordering::SeqCst)
    }

    /// Run the MCP initialize handshake once per client
    async fn ensure_initialized(&self) -> Result<()> {
        let mut initialized = self.initialized.lock().await;
        if *initialized {
            return Ok(());
        }

        self.send_request(
            "initialize",
            json!({
                "protocolVersion": MCP_PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": {
                    "name": "react-mcp-agent",
                    "version": env!("CARGO_PKG_VERSION"),
                }
            }),
        )
        .await?;

        *initialized = true;
        Ok(())
    }

    /// Send one JSON-RPC request and return its `result` payload.
    ///
    /// The server may answer with plain JSON or with an SSE body
    /// carrying the response as a `data:` event; both are handled.
    async fn send_request(&self, method: &str, params: Value) -> Result<Value> {
        let id = self.next_id();
        let body = json!({
            "jsonrpc": JSONRPC_VERSION,
            "id": id,
            "method": method,
            "params": params,
        });

        let response = self
            .http
            .post(&self.config.url)
            .header("Accept", "application/json, text/event-stream")
            .header("x-api-key", &self.config.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| AgentError::ToolServer(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::ToolServer(format!("HTTP {}", status)));
        }

        let content_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let text = response
            .text()
            .await
            .map_err(|e| AgentError::ToolServer(e.to_string()))?;

        let envelope = if content_type.starts_with("text/event-stream") {
            parse_sse_response(&text, id)?
        } else {
            serde_json::from_str(&text)
                .map_err(|e| AgentError::ToolServer(format!("invalid JSON-RPC response: {}", e)))?
        };

        extract_result(envelope)
    }

    /// List the tools advertised by the server
    pub async fn list_tools(&self) -> Result<Vec<RemoteToolDescriptor>> {
        self.ensure_initialized().await?;

        let result = self.send_request("tools/list", json!({})).await?;
        let parsed: ToolListResult = serde_json::from_value(result)
            .map_err(|e| AgentError::ToolServer(format!("invalid tools/list result: {}", e)))?;

        Ok(parsed.tools)
    }

    /// Invoke a remote tool by name
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: &HashMap<String, Value>,
    ) -> Result<ToolResult> {
        self.ensure_initialized().await?;

        let result = self
            .send_request(
                "tools/call",
                json!({
                    "name": name,
                    "arguments": arguments,
                }),
            )
            .await?;

        let parsed: ToolCallResult = serde_json::from_value(result)
            .map_err(|e| AgentError::ToolServer(format!("invalid tools/call result: {}", e)))?;

        let text = parsed
            .content
            .iter()
            .filter(|block| block.kind == "text")
            .filter_map(|block| block.text.as_deref())
            .collect::<Vec<_>>()
            .join("\n");

        if parsed.is_error {
            Ok(ToolResult::failure(name, text))
        } else {
            Ok(ToolResult::success(name, text))
        }
    }
}

/// Find the JSON-RPC response for `id` among the SSE `data:` events
fn parse_sse_response(body: &str, id: u64) -> Result<Value> {
    for line in body.lines() {
        let Some(payload) = line.trim().strip_prefix("data:") else {
            continue;
        };

        let Ok(value) = serde_json::from_str::<Value>(payload.trim()) else {
            continue;
        };

        if value.get("id").and_then(Value::as_u64) == Some(id) {
            return Ok(value);
        }
    }

    Err(AgentError::ToolServer(format!(
        "no response for request {} in event stream",
        id
    )))
}

/// Unwrap a JSON-RPC envelope into its result payload
fn extract_result(envelope: Value) -> Result<Value> {
    if let Some(error) = envelope.get("error") {
        let message = error
            .get("message")
            .and_then(Value::as_str)
            .unwrap_or("unknown error");
        return Err(AgentError::ToolServer(message.to_string()));
    }

    envelope
        .get("result")
        .cloned()
        .ok_or_else(|| AgentError::ToolServer("response had no result".into()))
}

/// Map a remote tool's JSON Schema input description to parameter
/// schemas the prompt generator understands
fn parameters_from_input_schema(schema: Option<&Value>) -> Vec<ParameterSchema> {
    let Some(schema) = schema else {
        return Vec::new();
    };

    let required: Vec<&str> = schema
        .get("required")
        .and_then(Value::as_array)
        .map(|names| names.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    let Some(properties) = schema.get("properties").and_then(Value::as_object) else {
        return Vec::new();
    };

    properties
        .iter()
        .map(|(name, prop)| ParameterSchema {
            name: name.clone(),
            param_type: prop
                .get("type")
                .and_then(Value::as_str)
                .unwrap_or("string")
                .to_string(),
            description: prop
                .get("description")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string(),
            required: required.contains(&name.as_str()),
            default: prop.get("default").cloned(),
            enum_values: prop
                .get("enum")
                .and_then(Value::as_array)
                .map(|values| values.to_vec()),
        })
        .collect()
}

/// A remote MCP tool exposed through the local `Tool` trait
pub struct McpRemoteTool {
    client: Arc<McpClient>,
    descriptor: RemoteToolDescriptor,
}

impl McpRemoteTool {
    pub fn new(client: Arc<McpClient>, descriptor: RemoteToolDescriptor) -> Self {
        Self { client, descriptor }
    }
}

#[async_trait]
impl Tool for McpRemoteTool {
    fn schema(&self) -> ToolSchema {
        ToolSchema {
            name: self.descriptor.name.clone(),
            description: self
                .descriptor
                .description
                .clone()
                .unwrap_or_else(|| format!("Remote tool '{}'", self.descriptor.name)),
            parameters: parameters_from_input_schema(self.descriptor.input_schema.as_ref()),
            category: Some("mcp".into()),
            has_side_effects: true,
        }
    }

    async fn execute(&self, call: &ToolCall) -> Result<ToolResult> {
        self.client
            .call_tool(&self.descriptor.name, &call.arguments)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_result_unwraps_payload() {
        let envelope = json!({"jsonrpc": "2.0", "id": 1, "result": {"ok": true}});
        let result = extract_result(envelope).unwrap();
        assert_eq!(result, json!({"ok": true}));
    }

    #[test]
    fn test_extract_result_surfaces_error() {
        let envelope = json!({
            "jsonrpc": "2.0",
            "id": 1,
            "error": {"code": -32601, "message": "method not found"}
        });
        let err = extract_result(envelope).unwrap_err();
        assert!(matches!(err, AgentError::ToolServer(msg) if msg == "method not found"));
    }

    #[test]
    fn test_parse_sse_response_matches_id() {
        let body = concat!(
            ": keep-alive\n",
            "data: {\"jsonrpc\":\"2.0\",\"id\":7,\"result\":{\"tools\":[]}}\n",
            "\n",
        );
        let envelope = parse_sse_response(body, 7).unwrap();
        assert_eq!(envelope.get("id").and_then(Value::as_u64), Some(7));

        assert!(parse_sse_response(body, 8).is_err());
    }

    #[test]
    fn test_descriptor_accepts_camel_case_schema() {
        let descriptor: RemoteToolDescriptor = serde_json::from_value(json!({
            "name": "search_site",
            "description": "Search the configured site.",
            "inputSchema": {
                "type": "object",
                "properties": {
                    "query": {"type": "string", "description": "Search query"}
                },
                "required": ["query"]
            }
        }))
        .unwrap();

        let params = parameters_from_input_schema(descriptor.input_schema.as_ref());
        assert_eq!(params.len(), 1);
        assert_eq!(params[0].name, "query");
        assert!(params[0].required);
        assert_eq!(params[0].param_type, "string");
    }

    #[test]
    fn test_missing_input_schema_yields_no_parameters() {
        assert!(parameters_from_input_schema(None).is_empty());
        assert!(parameters_from_input_schema(Some(&json!({"type": "object"}))).is_empty());
    }

    #[test]
    fn test_tool_call_result_parses_text_blocks() {
        let parsed: ToolCallResult = serde_json::from_value(json!({
            "content": [
                {"type": "text", "text": "first"},
                {"type": "image", "data": "..."},
                {"type": "text", "text": "second"}
            ],
            "isError": false
        }))
        .unwrap();

        assert!(!parsed.is_error);
        let text: Vec<_> = parsed
            .content
            .iter()
            .filter(|b| b.kind == "text")
            .filter_map(|b| b.text.as_deref())
            .collect();
        assert_eq!(text, vec!["first", "second"]);
    }
}
