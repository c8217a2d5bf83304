//! Parallel execution of the tool calls embedded in an interrupt reply.
//!
//! Outputs are positional: the i-th string answers the i-th tool call,
//! regardless of completion order. Tool-local failures — unknown tool, bad
//! arguments, timeout, panic, explicit error — never surface to the caller;
//! each becomes an advisory string the server feeds back to the model so it
//! can pick another tool.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::{Map, Value};
use tracing::{debug, warn};

use agentlink_core::event::InterruptInfo;
use agentlink_core::{EventSink, ToolCallContext};
use agentlink_tools::{Tool, ToolContext, ToolRegistry};

pub(crate) async fn run_tools(
    registry: &ToolRegistry,
    interrupt: &InterruptInfo,
    custom_variables: &HashMap<String, String>,
    sink: &Arc<dyn EventSink>,
    default_timeout: Duration,
    ctx: &ToolContext,
) -> Vec<String> {
    let tasks = interrupt.tool_calls.iter().map(|call| {
        run_one(
            registry,
            &interrupt.current_agent,
            &call.function.name,
            &call.id,
            &call.function.arguments,
            custom_variables,
            sink,
            default_timeout,
            ctx,
        )
    });
    futures::future::join_all(tasks).await
}

#[allow(clippy::too_many_arguments)]
async fn run_one(
    registry: &ToolRegistry,
    agent_name: &str,
    tool_name: &str,
    call_id: &str,
    arguments: &str,
    custom_variables: &HashMap<String, String>,
    sink: &Arc<dyn EventSink>,
    default_timeout: Duration,
    ctx: &ToolContext,
) -> String {
    if registry.tools_for(agent_name).is_none() {
        return format!(
            "The current agent {agent_name} toolset does not exist, try another tool"
        );
    }
    let Some(tool) = registry.get(agent_name, tool_name) else {
        return format!(
            "Tool {tool_name} not found in agent {agent_name}'s toolset, try another tool"
        );
    };

    let mut input: Map<String, Value> = match serde_json::from_str(arguments) {
        Ok(input) => input,
        Err(e) => {
            return format!(
                "The parameters of the thinking process output are wrong, error: {e}"
            );
        }
    };
    // Caller-supplied variables are additive; they never shadow what the
    // model produced.
    for (key, value) in custom_variables {
        input
            .entry(key.clone())
            .or_insert_with(|| Value::String(value.clone()));
    }

    let mut call = ToolCallContext {
        tool_name: tool_name.to_string(),
        call_id: call_id.to_string(),
        input: Value::Object(input.clone()),
        output: None,
        error: None,
    };
    sink.before_tool_call(&call);

    let result = run_with_timeout(tool.clone(), input, ctx, default_timeout).await;

    match result {
        Ok(output) => {
            call.output = Some(output.clone());
            sink.after_tool_call(&call);
            tool.result_to_string(&output)
        }
        Err(e) => {
            warn!(tool = tool_name, error = %e, "tool execution failed");
            call.error = Some(e.to_string());
            sink.after_tool_call(&call);
            format!("Tool {tool_name} run failed, try another tool, error: {e}")
        }
    }
}

/// Run one tool on its own task, bounded by the effective deadline.
///
/// The tool's own timeout wins over the client default; both zero means
/// unbounded. On deadline or caller cancellation the tool's token is
/// cancelled and any later result is discarded — an uncooperative tool may
/// keep running until it notices. A panic inside the tool is isolated by the
/// task boundary and converted into an error.
pub(crate) async fn run_with_timeout(
    tool: Arc<dyn Tool>,
    args: Map<String, Value>,
    ctx: &ToolContext,
    default_timeout: Duration,
) -> anyhow::Result<Value> {
    let timeout = if tool.timeout().is_zero() {
        default_timeout
    } else {
        tool.timeout()
    };
    let tool_name = tool.name().to_string();
    let run_ctx = ToolContext {
        cancel: ctx.cancel.child_token(),
        ..ctx.clone()
    };

    let task_ctx = run_ctx.clone();
    let mut handle = tokio::spawn(async move { tool.execute(args, &task_ctx).await });

    let started = Instant::now();
    let joined = if timeout.is_zero() {
        tokio::select! {
            joined = &mut handle => joined,
            _ = ctx.cancel.cancelled() => {
                run_ctx.cancel.cancel();
                anyhow::bail!("tool {tool_name} cancelled by caller");
            }
        }
    } else {
        tokio::select! {
            joined = &mut handle => joined,
            _ = tokio::time::sleep(timeout) => {
                run_ctx.cancel.cancel();
                anyhow::bail!("run tool {tool_name} timeout after {timeout:?}");
            }
            _ = ctx.cancel.cancelled() => {
                run_ctx.cancel.cancel();
                anyhow::bail!("tool {tool_name} cancelled by caller");
            }
        }
    };
    debug!(tool = %tool_name, elapsed = ?started.elapsed(), "tool execution finished");

    match joined {
        Ok(result) => result,
        Err(join_error) if join_error.is_panic() => {
            let payload = join_error.into_panic();
            let message = payload
                .downcast_ref::<&str>()
                .map(|s| s.to_string())
                .or_else(|| payload.downcast_ref::<String>().cloned())
                .unwrap_or_else(|| "non-string panic payload".into());
            Err(anyhow::anyhow!("panic in tool {tool_name}: {message}"))
        }
        Err(join_error) => Err(anyhow::anyhow!(
            "tool {tool_name} task failed: {join_error}"
        )),
    }
}
