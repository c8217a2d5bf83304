//! An agent exposed as a callable tool.
//!
//! Executing the tool drives a complete nested dialog for the sub-agent,
//! with its own tool registry and its own turn cap. Child sessions are
//! derived deterministically from the calling session:
//! `"{parent_session}_{index}"` with a per-tool monotonic counter, so
//! repeated invocations get distinct but reproducible sessions.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tracing::debug;

use agentlink_core::wire::RequestOptions;
use agentlink_core::{Agent, EventSink, RunLogger};
use agentlink_tools::{coerce, Tool, ToolContext, ToolRegistry};

use crate::runner::Runner;

/// Streaming throttle forwarded on nested agent calls.
const SUB_AGENT_STREAMING_THROTTLE: i32 = 20;

/// Shared dialog configuration a sub-agent runner inherits from the client
/// that registered it.
#[derive(Clone)]
pub struct SubAgentConfig {
    pub endpoint: String,
    pub bot_app_key: String,
    pub http: reqwest::Client,
    pub sink: Arc<dyn EventSink>,
    pub logger: Option<Arc<dyn RunLogger>>,
    pub max_tool_turns: u32,
    pub tool_run_timeout: Duration,
    pub enable_system_opt: bool,
}

/// A tool whose execution runs a nested dialog driver for one sub-agent.
pub struct AgentAsTool {
    name: String,
    description: String,
    agent: Agent,
    registry: ToolRegistry,
    config: SubAgentConfig,
    timeout: Duration,
    index: AtomicU64,
}

impl AgentAsTool {
    pub fn new(
        name: &str,
        description: &str,
        agent: Agent,
        tools: Vec<Arc<dyn Tool>>,
        config: SubAgentConfig,
    ) -> Self {
        let mut registry = ToolRegistry::new();
        registry.add_all(&agent.name, tools);
        Self {
            name: name.to_string(),
            description: description.to_string(),
            agent,
            registry,
            config,
            timeout: Duration::ZERO,
            index: AtomicU64::new(0),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    fn runner(&self) -> Runner {
        Runner {
            endpoint: self.config.endpoint.clone(),
            bot_app_key: self.config.bot_app_key.clone(),
            http: self.config.http.clone(),
            registry: self.registry.clone(),
            agents: vec![self.agent.clone()],
            handoffs: Vec::new(),
            enable_system_opt: self.config.enable_system_opt,
            start_agent: self.agent.name.clone(),
            max_tool_turns: self.config.max_tool_turns,
            tool_run_timeout: self.config.tool_run_timeout,
            sink: self.config.sink.clone(),
            logger: self.config.logger.clone(),
            // Sub-agent runs are not tied to the parent client's lifecycle.
            closed: Arc::new(AtomicBool::new(false)),
            mock: false,
        }
    }

    /// Render the query string handed to the sub-agent: validated JSON when
    /// an input schema is declared, the conventional `query` parameter
    /// otherwise.
    fn render_input(&self, params: &Map<String, Value>) -> anyhow::Result<String> {
        if let Some(schema) = &self.agent.input_schema {
            coerce::coerce_args(schema, params.clone())
                .map_err(|e| anyhow::anyhow!("failed to validate parameters: {e}"))?;
            Ok(serde_json::to_string(params)?)
        } else {
            params
                .get("query")
                .and_then(Value::as_str)
                .map(str::to_string)
                .ok_or_else(|| anyhow::anyhow!("invalid query parameter"))
        }
    }

    fn json_output_instructions(&self) -> String {
        let Some(schema) = &self.agent.output_schema else {
            return String::new();
        };
        let rendered =
            serde_json::to_string_pretty(schema).unwrap_or_else(|_| schema.to_string());
        format!(
            "IMPORTANT: You must respond with valid JSON in the following format:\n{rendered}\n\n\
             Your response must be valid JSON that matches this schema exactly. \
             Do not include ```json or ``` in the beginning or end of the response."
        )
    }
}

#[async_trait]
impl Tool for AgentAsTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> String {
        self.description.clone()
    }

    fn parameters_schema(&self) -> Value {
        match &self.agent.input_schema {
            Some(schema) => schema.clone(),
            None => serde_json::json!({
                "type": "object",
                "properties": {
                    "query": {
                        "type": "string",
                        "description": "The request to send to the agent"
                    }
                },
                "required": ["query"]
            }),
        }
    }

    async fn execute(&self, args: Map<String, Value>, ctx: &ToolContext) -> anyhow::Result<Value> {
        let input = self.render_input(&args)?;

        let child_session = format!(
            "{}_{}",
            ctx.session_id,
            self.index.fetch_add(1, Ordering::SeqCst)
        );
        debug!(agent = %self.agent.name, session = %child_session, "running sub-agent");

        let mut custom_variables = HashMap::new();
        custom_variables.insert("_user_guid".to_string(), ctx.visitor_biz_id.clone());
        custom_variables.insert("_user_task_id".to_string(), ctx.session_id.clone());
        let options = RequestOptions {
            streaming_throttle: Some(SUB_AGENT_STREAMING_THROTTLE),
            custom_variables,
            env_set: ctx.env_set.clone(),
            ..Default::default()
        };

        let instructions = self.json_output_instructions();
        let query = if instructions.is_empty() {
            input
        } else {
            format!("{input}\n\n{instructions}")
        };

        let reply = self
            .runner()
            .run_with_cancel(
                ctx.cancel.child_token(),
                &query,
                &child_session,
                &ctx.visitor_biz_id,
                Some(options),
            )
            .await?;
        Ok(Value::String(reply.content))
    }

    fn timeout(&self) -> Duration {
        self.timeout
    }

    fn set_timeout(&mut self, timeout: Duration) {
        self.timeout = timeout;
    }
}
