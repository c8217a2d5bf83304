//! The client facade: configuration surface plus `run`.
//!
//! Configuration is accumulated through setters before calls; concurrent
//! calls read it but must not race with mutation. Each call snapshots the
//! configuration into a [`Runner`], so an in-flight call is unaffected by
//! later setter activity.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

use agentlink_core::event::ReplyEvent;
use agentlink_core::wire::RequestOptions;
use agentlink_core::{Agent, EventSink, Handoff, NoopSink, Result, RunLogger};
use agentlink_mcp::{McpTool, McpToolCache};
use agentlink_tools::{FunctionTool, Tool, ToolRegistry};

use crate::agent_tool::{AgentAsTool, SubAgentConfig};
use crate::runner::Runner;

/// Default dialog endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://wss.agentlink.cloud/v1/chat/sse";

const DEFAULT_MAX_TOOL_TURNS: u32 = 10;

/// Client for the agent dialog service.
pub struct AgentClient {
    bot_app_key: String,
    visitor_biz_id: String,
    endpoint: String,
    http: reqwest::Client,
    sink: Arc<dyn EventSink>,
    registry: ToolRegistry,
    agents: Vec<Agent>,
    handoffs: Vec<Handoff>,
    enable_system_opt: bool,
    start_agent: String,
    max_tool_turns: u32,
    tool_run_timeout: Duration,
    logger: Option<Arc<dyn RunLogger>>,
    mock: bool,
    closed: Arc<AtomicBool>,
}

impl AgentClient {
    /// Create a client. `sink` may be omitted for a no-op sink.
    pub fn new(
        bot_app_key: &str,
        visitor_biz_id: &str,
        sink: Option<Arc<dyn EventSink>>,
    ) -> Self {
        Self {
            bot_app_key: bot_app_key.to_string(),
            visitor_biz_id: visitor_biz_id.to_string(),
            endpoint: DEFAULT_ENDPOINT.to_string(),
            http: reqwest::Client::new(),
            sink: sink.unwrap_or_else(|| Arc::new(NoopSink)),
            registry: ToolRegistry::new(),
            agents: Vec::new(),
            handoffs: Vec::new(),
            enable_system_opt: false,
            start_agent: String::new(),
            max_tool_turns: DEFAULT_MAX_TOOL_TURNS,
            tool_run_timeout: Duration::ZERO,
            logger: None,
            mock: false,
            closed: Arc::new(AtomicBool::new(false)),
        }
    }

    // --- configuration ---

    pub fn bot_app_key(&self) -> &str {
        &self.bot_app_key
    }

    pub fn set_bot_app_key(&mut self, bot_app_key: &str) {
        self.bot_app_key = bot_app_key.to_string();
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    pub fn set_endpoint(&mut self, endpoint: &str) {
        self.endpoint = endpoint.to_string();
    }

    pub fn set_http_client(&mut self, client: reqwest::Client) {
        self.http = client;
    }

    pub fn set_event_sink(&mut self, sink: Arc<dyn EventSink>) {
        self.sink = sink;
    }

    /// Skip the network and fabricate a tool call for every registered tool
    /// of the first agent. For smoke-testing tool wiring.
    pub fn set_mock(&mut self, mock: bool) {
        self.mock = mock;
    }

    /// Server-side optimization toggle for return-to-parent behavior.
    pub fn set_enable_system_opt(&mut self, enable: bool) {
        self.enable_system_opt = enable;
    }

    /// Name of the entry agent; empty means the server default.
    pub fn set_start_agent(&mut self, agent_name: &str) {
        self.start_agent = agent_name.to_string();
    }

    /// Cap on interrupt/resume cycles per call. Defaults to 10.
    pub fn set_max_tool_turns(&mut self, max_tool_turns: u32) {
        self.max_tool_turns = max_tool_turns;
    }

    /// Default per-tool deadline; zero means unbounded. A tool's own
    /// timeout takes precedence.
    pub fn set_tool_run_timeout(&mut self, timeout: Duration) {
        self.tool_run_timeout = timeout;
    }

    pub fn set_run_logger(&mut self, logger: Arc<dyn RunLogger>) {
        self.logger = Some(logger);
    }

    // --- registration ---

    /// Register function tools for an agent. A duplicate name replaces the
    /// prior tool in place.
    pub fn add_function_tools(&mut self, agent_name: &str, tools: Vec<FunctionTool>) {
        for tool in tools {
            self.registry.add(agent_name, Arc::new(tool));
        }
    }

    /// Import tools discovered on an MCP server. With an empty selection
    /// every discovered tool is imported; otherwise only the named subset,
    /// in discovery order. Returns the tools actually added.
    pub fn add_mcp_tools(
        &mut self,
        agent_name: &str,
        cache: &Arc<McpToolCache>,
        selected_names: &[&str],
    ) -> Vec<Arc<McpTool>> {
        let mut added = Vec::new();
        for name in cache.ordered_names() {
            if !selected_names.is_empty() && !selected_names.contains(&name.as_str()) {
                continue;
            }
            let tool = Arc::new(McpTool::new(&name, cache.clone()));
            self.registry.add(agent_name, tool.clone());
            added.push(tool);
        }
        added
    }

    /// Expose a sub-agent as a callable tool of `host_agent`. The nested
    /// dialog inherits this client's endpoint, key, sink, and limits as of
    /// registration time.
    pub fn add_agent_as_tool(
        &mut self,
        host_agent: &str,
        name: &str,
        description: &str,
        sub_agent: Agent,
        tools: Vec<Arc<dyn Tool>>,
    ) -> Arc<AgentAsTool> {
        let config = SubAgentConfig {
            endpoint: self.endpoint.clone(),
            bot_app_key: self.bot_app_key.clone(),
            http: self.http.clone(),
            sink: self.sink.clone(),
            logger: self.logger.clone(),
            max_tool_turns: self.max_tool_turns,
            tool_run_timeout: self.tool_run_timeout,
            enable_system_opt: self.enable_system_opt,
        };
        let tool = Arc::new(AgentAsTool::new(name, description, sub_agent, tools, config));
        self.registry.add(host_agent, tool.clone());
        tool
    }

    /// Declare a batch of agents for every subsequent call.
    pub fn add_agents(&mut self, agents: Vec<Agent>) {
        self.agents.extend(agents);
    }

    /// Permit `source_agent` to hand the dialog to each of `targets`.
    pub fn add_handoffs(&mut self, source_agent: &str, targets: &[&str]) {
        for target in targets {
            self.handoffs.push(Handoff {
                source_agent_name: source_agent.to_string(),
                target_agent_name: target.to_string(),
            });
        }
    }

    pub fn registry(&self) -> &ToolRegistry {
        &self.registry
    }

    // --- lifecycle ---

    /// Fail in-flight and future calls until [`AgentClient::open`].
    pub fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
    }

    pub fn open(&self) {
        self.closed.store(false, Ordering::SeqCst);
    }

    // --- running ---

    /// Drive one user query to its final reply. `visitor_biz_id` falls back
    /// to the client's default when empty.
    pub async fn run(
        &self,
        query: &str,
        session_id: &str,
        visitor_biz_id: &str,
        options: Option<RequestOptions>,
    ) -> Result<ReplyEvent> {
        self.run_with_cancel(
            CancellationToken::new(),
            query,
            session_id,
            visitor_biz_id,
            options,
        )
        .await
    }

    /// Like [`AgentClient::run`], aborting the turn and any running tools
    /// when `cancel` fires.
    pub async fn run_with_cancel(
        &self,
        cancel: CancellationToken,
        query: &str,
        session_id: &str,
        visitor_biz_id: &str,
        options: Option<RequestOptions>,
    ) -> Result<ReplyEvent> {
        let visitor = if visitor_biz_id.is_empty() {
            self.visitor_biz_id.as_str()
        } else {
            visitor_biz_id
        };
        self.runner()
            .run_with_cancel(cancel, query, session_id, visitor, options)
            .await
    }

    fn runner(&self) -> Runner {
        Runner {
            endpoint: self.endpoint.clone(),
            bot_app_key: self.bot_app_key.clone(),
            http: self.http.clone(),
            registry: self.registry.clone(),
            agents: self.agents.clone(),
            handoffs: self.handoffs.clone(),
            enable_system_opt: self.enable_system_opt,
            start_agent: self.start_agent.clone(),
            max_tool_turns: self.max_tool_turns,
            tool_run_timeout: self.tool_run_timeout,
            sink: self.sink.clone(),
            logger: self.logger.clone(),
            closed: self.closed.clone(),
            mock: self.mock,
        }
    }
}
