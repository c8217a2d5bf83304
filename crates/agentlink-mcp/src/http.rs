//! JSON-RPC 2.0 over HTTP transport.

use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use tracing::debug;

use crate::{CallToolResult, ClientInfo, McpTransport, ToolInfo};

const PROTOCOL_VERSION: &str = "2024-11-05";

#[derive(Debug, Serialize)]
struct JsonRpcRequest<'a> {
    jsonrpc: &'static str,
    id: u64,
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct JsonRpcResponse {
    result: Option<Value>,
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
    tools: Vec<ToolInfo>,
}

/// MCP over plain HTTP POST. Stateless between requests, so start and
/// restart reduce to a fresh `initialize`.
pub struct HttpTransport {
    url: String,
    client: reqwest::Client,
    bearer_token: Option<String>,
    next_id: AtomicU64,
}

impl HttpTransport {
    pub fn new(url: &str) -> Self {
        Self {
            url: url.to_string(),
            client: reqwest::Client::new(),
            bearer_token: None,
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_bearer_token(mut self, token: &str) -> Self {
        self.bearer_token = Some(token.to_string());
        self
    }

    pub fn with_client(mut self, client: reqwest::Client) -> Self {
        self.client = client;
        self
    }

    async fn rpc(&self, method: &str, params: Option<Value>) -> anyhow::Result<Value> {
        let request = JsonRpcRequest {
            jsonrpc: "2.0",
            id: self.next_id.fetch_add(1, Ordering::Relaxed),
            method,
            params,
        };
        debug!(method, url = %self.url, "mcp rpc call");

        let mut builder = self.client.post(&self.url).json(&request);
        if let Some(token) = &self.bearer_token {
            builder = builder.bearer_auth(token);
        }
        let response = builder.send().await?;
        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!("mcp server returned {status}: {body}");
        }

        let body: JsonRpcResponse = response.json().await?;
        if let Some(err) = body.error {
            anyhow::bail!("mcp server error {}: {}", err.code, err.message);
        }
        Ok(body.result.unwrap_or(Value::Null))
    }
}

#[async_trait]
impl McpTransport for HttpTransport {
    async fn start(&self) -> anyhow::Result<()> {
        self.initialize(ClientInfo::default()).await
    }

    async fn restart(&self) -> anyhow::Result<()> {
        self.start().await
    }

    async fn initialize(&self, client_info: ClientInfo) -> anyhow::Result<()> {
        self.rpc(
            "initialize",
            Some(json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {},
                "clientInfo": client_info,
            })),
        )
        .await?;
        Ok(())
    }

    async fn ping(&self) -> anyhow::Result<()> {
        self.rpc("ping", None).await?;
        Ok(())
    }

    async fn list_tools(&self) -> anyhow::Result<Vec<ToolInfo>> {
        let result = self.rpc("tools/list", None).await?;
        let listed: ListToolsResult = serde_json::from_value(result)?;
        Ok(listed.tools)
    }

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> anyhow::Result<CallToolResult> {
        let result = self
            .rpc(
                "tools/call",
                Some(json!({"name": name, "arguments": arguments})),
            )
            .await?;
        Ok(serde_json::from_value(result)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rpc_request_shape() {
        let req = JsonRpcRequest {
            jsonrpc: "2.0",
            id: 7,
            method: "tools/list",
            params: None,
        };
        let value = serde_json::to_value(&req).unwrap();
        assert_eq!(value["jsonrpc"], "2.0");
        assert_eq!(value["method"], "tools/list");
        assert!(value.get("params").is_none());
    }

    #[test]
    fn test_list_tools_result_decode() {
        let raw = r#"{"tools":[{"name":"lookup","description":"find things","inputSchema":{"type":"object"}}]}"#;
        let listed: ListToolsResult = serde_json::from_str(raw).unwrap();
        assert_eq!(listed.tools.len(), 1);
        assert_eq!(listed.tools[0].name, "lookup");
        assert_eq!(listed.tools[0].input_schema["type"], "object");
    }

    #[test]
    fn test_call_result_decode() {
        let raw = r#"{"content":[{"type":"text","text":"hello"},{"type":"image","data":"zzz","mimeType":"image/png"}],"isError":false}"#;
        let result: CallToolResult = serde_json::from_str(raw).unwrap();
        assert_eq!(result.content.len(), 2);
        assert_eq!(result.content[0].text.as_deref(), Some("hello"));
        assert_eq!(result.content[1].kind, "image");
        assert_eq!(result.content[1].extra["mimeType"], "image/png");
    }
}
