//! Mock mode: smoke-test registered tools without touching the network.
//!
//! Synthesizes an interrupt reply carrying one tool call per registered tool
//! of the first registered agent, with arguments sampled from each tool's
//! parameter schema, runs the real executor on it, and returns a terminal
//! mock reply.

use rand::rngs::StdRng;
use rand::SeedableRng;
use tracing::info;

use agentlink_core::event::{FunctionCall, InterruptInfo, ReplyEvent, ReplyMethod, ToolCall};
use agentlink_core::Result;
use agentlink_tools::{sampler, ToolContext, ToolRegistry};

use crate::executor;
use crate::runner::Runner;

pub(crate) async fn mock_run(
    runner: &Runner,
    session_id: &str,
    visitor_biz_id: &str,
) -> Result<ReplyEvent> {
    let mut reply = ReplyEvent {
        is_final: true,
        content: "mock text".into(),
        ..Default::default()
    };
    mock_tool_call(&runner.registry, &mut reply);

    if let Some(interrupt) = &reply.interrupt_info {
        let ctx = ToolContext {
            session_id: session_id.to_string(),
            visitor_biz_id: visitor_biz_id.to_string(),
            ..Default::default()
        };
        let outputs = executor::run_tools(
            &runner.registry,
            interrupt,
            &Default::default(),
            &runner.sink,
            runner.tool_run_timeout,
            &ctx,
        )
        .await;
        for (call, output) in interrupt.tool_calls.iter().zip(&outputs) {
            info!(
                tool = %call.function.name,
                input = %call.function.arguments,
                output = %output,
                "mock tool run"
            );
        }
    }

    Ok(ReplyEvent {
        is_final: true,
        content: "mock text".into(),
        ..Default::default()
    })
}

/// Fabricate one tool call per tool of the first registered agent.
pub(crate) fn mock_tool_call(registry: &ToolRegistry, reply: &mut ReplyEvent) {
    let mut rng = StdRng::from_entropy();
    let Some((agent_name, tools)) = registry.iter().next() else {
        return;
    };
    let mut info = InterruptInfo {
        current_agent: agent_name.to_string(),
        tool_calls: Vec::new(),
    };
    for tool in tools {
        reply.reply_method = ReplyMethod::INTERRUPT;
        let sampled = sampler::sample_schema(&tool.parameters_schema(), &mut rng);
        info.tool_calls.push(ToolCall {
            id: "mock-id".into(),
            kind: "function".into(),
            function: FunctionCall {
                name: tool.name().to_string(),
                arguments: sampled.to_string(),
            },
        });
    }
    reply.interrupt_info = Some(info);
}
