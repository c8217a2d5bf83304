//! Tool abstraction for the AgentLink SDK.
//!
//! Tools are local capabilities the server-side model can invoke through an
//! interrupt reply. Each variant (function, MCP, agent-as-tool) implements
//! the [`Tool`] trait; the [`ToolRegistry`] maps agent names to their
//! ordered tool lists.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio_util::sync::CancellationToken;

use agentlink_core::wire::{AgentToolSet, FunctionSpec, ToolSpec};

pub mod coerce;
pub mod function;
pub mod sampler;

pub use function::FunctionTool;

/// Context provided to tools during execution.
#[derive(Debug, Clone, Default)]
pub struct ToolContext {
    /// Cancelled when the caller aborts the run or the tool's deadline
    /// fires. Tools that block should poll this; an uncooperative tool may
    /// keep running until it returns even after the call reported timeout.
    pub cancel: CancellationToken,
    pub session_id: String,
    pub visitor_biz_id: String,
    pub request_id: String,
    pub env_set: String,
}

/// The core tool trait. Execution is synchronous from the dispatcher's
/// perspective: it awaits the future and ships the stringified result back
/// to the server.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Stable identifier, unique within one agent's toolset.
    fn name(&self) -> &str;

    /// Human-readable description for the LLM.
    fn description(&self) -> String;

    /// JSON Schema describing the tool's parameters.
    fn parameters_schema(&self) -> Value;

    /// Execute the tool with the given arguments.
    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> anyhow::Result<Value>;

    /// Canonical serialization of an execution result for wire transport.
    /// Strings pass through verbatim; everything else is JSON-encoded.
    fn result_to_string(&self, value: &Value) -> String {
        match value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }

    /// Per-tool execution deadline; zero means "inherit the client default".
    fn timeout(&self) -> Duration {
        Duration::ZERO
    }

    /// Configure the per-tool deadline. Call before registration.
    fn set_timeout(&mut self, timeout: Duration);
}

/// Build the wire declaration for a tool.
pub fn tool_spec(tool: &dyn Tool) -> ToolSpec {
    ToolSpec {
        kind: "function".into(),
        function: FunctionSpec {
            name: tool.name().to_string(),
            description: tool.description(),
            parameters: tool.parameters_schema(),
        },
    }
}

/// Per-agent tool tables.
///
/// Agents and tools keep their registration order, which makes mock runs and
/// wire declarations deterministic. Registering a tool whose name already
/// exists on the agent replaces the prior entry in place. Lookup is a linear
/// scan; lists are short.
#[derive(Clone, Default)]
pub struct ToolRegistry {
    agents: Vec<AgentEntry>,
}

#[derive(Clone)]
struct AgentEntry {
    name: String,
    tools: Vec<Arc<dyn Tool>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register one tool under an agent.
    pub fn add(&mut self, agent_name: &str, tool: Arc<dyn Tool>) {
        let entry = match self.agents.iter_mut().find(|a| a.name == agent_name) {
            Some(entry) => entry,
            None => {
                self.agents.push(AgentEntry {
                    name: agent_name.to_string(),
                    tools: Vec::new(),
                });
                self.agents.last_mut().expect("entry just pushed")
            }
        };
        match entry.tools.iter_mut().find(|t| t.name() == tool.name()) {
            Some(slot) => *slot = tool,
            None => entry.tools.push(tool),
        }
    }

    /// Register a batch of tools under an agent, in order.
    pub fn add_all(&mut self, agent_name: &str, tools: impl IntoIterator<Item = Arc<dyn Tool>>) {
        for tool in tools {
            self.add(agent_name, tool);
        }
    }

    /// The ordered toolset of one agent.
    pub fn tools_for(&self, agent_name: &str) -> Option<&[Arc<dyn Tool>]> {
        self.agents
            .iter()
            .find(|a| a.name == agent_name)
            .map(|a| a.tools.as_slice())
    }

    /// Find a tool by agent and tool name.
    pub fn get(&self, agent_name: &str, tool_name: &str) -> Option<Arc<dyn Tool>> {
        self.tools_for(agent_name)?
            .iter()
            .find(|t| t.name() == tool_name)
            .cloned()
    }

    /// Iterate `(agent_name, toolset)` pairs in registration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Arc<dyn Tool>])> {
        self.agents
            .iter()
            .map(|a| (a.name.as_str(), a.tools.as_slice()))
    }

    pub fn is_empty(&self) -> bool {
        self.agents.iter().all(|a| a.tools.is_empty())
    }

    /// Build the per-agent wire declarations for a request.
    pub fn to_agent_tool_sets(&self) -> Vec<AgentToolSet> {
        self.agents
            .iter()
            .filter(|a| !a.tools.is_empty())
            .map(|a| AgentToolSet {
                agent_name: a.name.clone(),
                tools: a.tools.iter().map(|t| tool_spec(t.as_ref())).collect(),
            })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn echo_tool(name: &str, marker: &str) -> Arc<dyn Tool> {
        let marker = marker.to_string();
        Arc::new(FunctionTool::dynamic(
            name,
            "echo",
            json!({"type": "object", "properties": {"text": {"type": "string"}}}),
            move |_args| {
                let marker = marker.clone();
                async move { Ok(Value::String(marker)) }
            },
        )
        .unwrap())
    }

    #[test]
    fn test_registry_preserves_order() {
        let mut registry = ToolRegistry::new();
        registry.add("math", echo_tool("add", "1"));
        registry.add("math", echo_tool("sub", "2"));
        registry.add("writer", echo_tool("draft", "3"));

        let names: Vec<&str> = registry
            .tools_for("math")
            .unwrap()
            .iter()
            .map(|t| t.name())
            .collect();
        assert_eq!(names, vec!["add", "sub"]);

        let agents: Vec<&str> = registry.iter().map(|(name, _)| name).collect();
        assert_eq!(agents, vec!["math", "writer"]);
    }

    #[tokio::test]
    async fn test_duplicate_registration_replaces_in_place() {
        let mut registry = ToolRegistry::new();
        registry.add("math", echo_tool("add", "old"));
        registry.add("math", echo_tool("sub", "keep"));
        registry.add("math", echo_tool("add", "new"));

        let tools = registry.tools_for("math").unwrap();
        assert_eq!(tools.len(), 2);
        assert_eq!(tools[0].name(), "add");

        let out = tools[0]
            .execute(Map::new(), &ToolContext::default())
            .await
            .unwrap();
        assert_eq!(out, Value::String("new".into()));
    }

    #[test]
    fn test_lookup_misses() {
        let mut registry = ToolRegistry::new();
        registry.add("math", echo_tool("add", "1"));
        assert!(registry.get("math", "mul").is_none());
        assert!(registry.get("nobody", "add").is_none());
        assert!(registry.tools_for("nobody").is_none());
    }

    #[test]
    fn test_agent_tool_sets_skip_empty_agents() {
        let mut registry = ToolRegistry::new();
        registry.add("math", echo_tool("add", "1"));
        registry.add_all("writer", Vec::<Arc<dyn Tool>>::new());

        let sets = registry.to_agent_tool_sets();
        assert_eq!(sets.len(), 1);
        assert_eq!(sets[0].agent_name, "math");
        assert_eq!(sets[0].tools[0].function.name, "add");
        assert_eq!(sets[0].tools[0].kind, "function");
    }
}
