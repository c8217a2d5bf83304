//! Shared cache of an MCP server's discovered tools.
//!
//! Availability beats freshness: reads are served from a snapshot, refreshes
//! happen opportunistically behind a freshness window, and a failed refresh
//! keeps the stale entries rather than dropping them.

use std::collections::HashMap;
use std::sync::{Arc, RwLock};
use std::time::{Duration, Instant};

use tokio::time::timeout;
use tracing::{debug, warn};

use agentlink_core::{Error, Result};

use crate::{McpTransport, ToolInfo};

/// A refresh is attempted at most once per window.
const FRESHNESS_WINDOW: Duration = Duration::from_secs(2);
/// Deadline for the liveness ping issued before each tool call.
const PING_TIMEOUT: Duration = Duration::from_secs(2);
/// Deadline for the initial discovery round.
const DISCOVERY_TIMEOUT: Duration = Duration::from_secs(5);

struct CacheState {
    entries: HashMap<String, ToolInfo>,
    ordered: Vec<String>,
    fetched_at: Instant,
}

/// Tool snapshot for one transport, shared by every [`crate::McpTool`]
/// imported from it.
pub struct McpToolCache {
    transport: Arc<dyn McpTransport>,
    state: RwLock<CacheState>,
    // Serializes refreshes and restarts so concurrent executes never issue
    // overlapping initialize calls.
    gate: tokio::sync::Mutex<()>,
}

impl std::fmt::Debug for McpToolCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("McpToolCache").finish_non_exhaustive()
    }
}

impl McpToolCache {
    /// Ping the server and run the initial tool discovery.
    pub async fn connect(transport: Arc<dyn McpTransport>) -> Result<Arc<Self>> {
        let discovery = async {
            transport.ping().await?;
            transport.list_tools().await
        };
        let tools = timeout(DISCOVERY_TIMEOUT, discovery)
            .await
            .map_err(|_| Error::Transport("mcp tool discovery timed out".into()))?
            .map_err(|e| Error::Transport(format!("failed to list tools: {e}")))?;

        let mut entries = HashMap::with_capacity(tools.len());
        let mut ordered = Vec::with_capacity(tools.len());
        for tool in tools {
            if !entries.contains_key(&tool.name) {
                ordered.push(tool.name.clone());
            }
            entries.insert(tool.name.clone(), tool);
        }
        Ok(Arc::new(Self {
            transport,
            state: RwLock::new(CacheState {
                entries,
                ordered,
                fetched_at: Instant::now(),
            }),
            gate: tokio::sync::Mutex::new(()),
        }))
    }

    pub fn transport(&self) -> &Arc<dyn McpTransport> {
        &self.transport
    }

    /// Snapshot of one tool's entry.
    pub fn get(&self, name: &str) -> Option<ToolInfo> {
        self.state
            .read()
            .ok()
            .and_then(|s| s.entries.get(name).cloned())
    }

    /// Tool names in discovery order.
    pub fn ordered_names(&self) -> Vec<String> {
        self.state
            .read()
            .map(|s| s.ordered.clone())
            .unwrap_or_default()
    }

    pub fn is_stale(&self) -> bool {
        self.state
            .read()
            .map(|s| s.fetched_at.elapsed() >= FRESHNESS_WINDOW)
            .unwrap_or(false)
    }

    /// Kick a refresh on the current runtime without blocking the caller.
    /// Used by synchronous schema/description reads.
    pub fn spawn_refresh(self: &Arc<Self>) {
        if !self.is_stale() {
            return;
        }
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            let cache = Arc::clone(self);
            handle.spawn(async move { cache.refresh_if_stale().await });
        }
    }

    /// Re-fetch the tool list if the snapshot is past the freshness window.
    /// A failed fetch keeps the stale entries.
    pub async fn refresh_if_stale(&self) {
        if !self.is_stale() {
            return;
        }
        let _guard = self.gate.lock().await;
        if !self.is_stale() {
            return;
        }
        match self.transport.list_tools().await {
            Ok(tools) => {
                let mut ordered = Vec::with_capacity(tools.len());
                let mut entries = HashMap::with_capacity(tools.len());
                for tool in tools {
                    if !entries.contains_key(&tool.name) {
                        ordered.push(tool.name.clone());
                    }
                    entries.insert(tool.name.clone(), tool);
                }
                if let Ok(mut state) = self.state.write() {
                    state.entries = entries;
                    state.ordered = ordered;
                    state.fetched_at = Instant::now();
                }
                debug!("mcp tool cache refreshed");
            }
            Err(e) => {
                warn!(%e, "mcp tool refresh failed, keeping stale entries");
            }
        }
    }

    /// Verify the transport is alive before a tool call: a short ping, and
    /// on failure a single serialized restart.
    pub async fn ensure_connected(&self) -> anyhow::Result<()> {
        if timeout(PING_TIMEOUT, self.transport.ping()).await.is_ok_and(|r| r.is_ok()) {
            return Ok(());
        }
        let _guard = self.gate.lock().await;
        // Another caller may have already restarted while we waited.
        if timeout(PING_TIMEOUT, self.transport.ping()).await.is_ok_and(|r| r.is_ok()) {
            return Ok(());
        }
        warn!("mcp ping failed, restarting transport");
        self.transport.restart().await
    }
}
