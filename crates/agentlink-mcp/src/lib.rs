//! Remote tools over the Model Context Protocol.
//!
//! The SDK consumes MCP through the small [`McpTransport`] capability set:
//! initialize, ping, list-tools, call-tool, and transport start/restart.
//! Two transports ship here — a child-process [`stdio`] transport and a
//! plain JSON-RPC-over-HTTP transport in [`http`] — and applications can
//! hand in their own (e.g. SSE). Discovered tools are cached by
//! [`cache::McpToolCache`] and exposed to agents through [`tool::McpTool`].

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

pub mod cache;
pub mod http;
pub mod stdio;
pub mod tool;

pub use cache::McpToolCache;
pub use http::HttpTransport;
pub use stdio::StdioTransport;
pub use tool::McpTool;

/// Identity the client reports during `initialize`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientInfo {
    pub name: String,
    pub version: String,
}

impl Default for ClientInfo {
    fn default() -> Self {
        Self {
            name: "agentlink".into(),
            version: env!("CARGO_PKG_VERSION").into(),
        }
    }
}

/// One tool as advertised by an MCP server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(rename = "inputSchema", default)]
    pub input_schema: Value,
}

/// Result of a tool call: an ordered list of typed content parts.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CallToolResult {
    #[serde(default)]
    pub content: Vec<ContentPart>,
    #[serde(rename = "isError", default, skip_serializing_if = "Option::is_none")]
    pub is_error: Option<bool>,
}

/// One content part. Only `text` parts are interpreted; everything else is
/// carried opaquely and JSON-encoded when stringified.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ContentPart {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl ContentPart {
    pub fn text(text: &str) -> Self {
        Self {
            kind: "text".into(),
            text: Some(text.to_string()),
            extra: Map::new(),
        }
    }
}

/// The consumed MCP surface. Implementations must be safe to share across
/// concurrent tool executions.
#[async_trait]
pub trait McpTransport: Send + Sync {
    /// Bring the transport up (spawn the child process, open the stream).
    async fn start(&self) -> anyhow::Result<()>;

    /// Tear down and bring the transport back up after a failed ping.
    async fn restart(&self) -> anyhow::Result<()>;

    async fn initialize(&self, client_info: ClientInfo) -> anyhow::Result<()>;

    async fn ping(&self) -> anyhow::Result<()>;

    async fn list_tools(&self) -> anyhow::Result<Vec<ToolInfo>>;

    async fn call_tool(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> anyhow::Result<CallToolResult>;
}
