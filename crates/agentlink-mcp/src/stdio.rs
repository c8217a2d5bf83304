//! Child-process transport: line-delimited JSON-RPC over stdin/stdout.

use std::collections::HashMap;
use std::process::Stdio;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use serde_json::{json, Map, Value};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, trace};

use crate::{CallToolResult, ClientInfo, McpTransport, ToolInfo};

const PROTOCOL_VERSION: &str = "2024-11-05";

struct ChildIo {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
}

/// MCP server spawned as a local child process. One request is in flight at
/// a time; the process lock also pairs each request with its response.
pub struct StdioTransport {
    command: String,
    args: Vec<String>,
    envs: HashMap<String, String>,
    io: Mutex<Option<ChildIo>>,
    next_id: AtomicU64,
}

impl StdioTransport {
    pub fn new(command: &str, args: &[&str]) -> Self {
        Self {
            command: command.to_string(),
            args: args.iter().map(|a| a.to_string()).collect(),
            envs: HashMap::new(),
            io: Mutex::new(None),
            next_id: AtomicU64::new(1),
        }
    }

    pub fn with_env(mut self, key: &str, value: &str) -> Self {
        self.envs.insert(key.to_string(), value.to_string());
        self
    }

    async fn spawn(&self) -> anyhow::Result<ChildIo> {
        debug!(command = %self.command, "spawning mcp server process");
        let mut child = Command::new(&self.command)
            .args(&self.args)
            .envs(&self.envs)
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()?;

        let stdin = child
            .stdin
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to capture child stdin"))?;
        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| anyhow::anyhow!("failed to capture child stdout"))?;
        if let Some(stderr) = child.stderr.take() {
            tokio::spawn(async move {
                let mut lines = BufReader::new(stderr).lines();
                while let Ok(Some(line)) = lines.next_line().await {
                    debug!(target: "mcp_server", "{line}");
                }
            });
        }

        Ok(ChildIo {
            child,
            stdin,
            stdout: BufReader::new(stdout),
        })
    }

    async fn rpc(&self, method: &str, params: Option<Value>) -> anyhow::Result<Value> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let request = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params.unwrap_or_else(|| json!({})),
        });

        let mut guard = self.io.lock().await;
        let io = guard
            .as_mut()
            .ok_or_else(|| anyhow::anyhow!("stdio transport not started"))?;

        let mut line = serde_json::to_string(&request)?;
        line.push('\n');
        io.stdin.write_all(line.as_bytes()).await?;
        io.stdin.flush().await?;

        // Read until the response with our id; anything without one is a
        // notification and is skipped.
        loop {
            let mut buf = String::new();
            let n = io.stdout.read_line(&mut buf).await?;
            if n == 0 {
                anyhow::bail!("mcp server closed its stdout");
            }
            let message: Value = match serde_json::from_str(buf.trim()) {
                Ok(message) => message,
                Err(e) => {
                    trace!(%e, "skipping unparsable line from mcp server");
                    continue;
                }
            };
            if message.get("id").and_then(Value::as_u64) != Some(id) {
                trace!("skipping notification from mcp server");
                continue;
            }
            if let Some(error) = message.get("error") {
                anyhow::bail!("mcp server error: {error}");
            }
            return Ok(message.get("result").cloned().unwrap_or(Value::Null));
        }
    }
}

#[async_trait]
impl McpTransport for StdioTransport {
    async fn start(&self) -> anyhow::Result<()> {
        let io = self.spawn().await?;
        *self.io.lock().await = Some(io);
        self.initialize(ClientInfo::default()).await
    }

    async fn restart(&self) -> anyhow::Result<()> {
        if let Some(mut io) = self.io.lock().await.take() {
            let _ = io.child.start_kill();
            let _ = io.child.wait().await;
        }
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
        let tools = result.get("tools").cloned().unwrap_or(Value::Null);
        Ok(serde_json::from_value(tools).unwrap_or_default())
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
