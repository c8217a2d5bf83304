//! Client-side dialog driver for the AgentLink agent service.
//!
//! A [`AgentClient`] opens an SSE stream per turn, decodes the typed event
//! stream into an [`agentlink_core::EventSink`], and — when the server
//! interrupts asking for local tool execution — dispatches the requested
//! tools in parallel, threads their outputs into the next turn, and repeats
//! until a final reply lands or the turn cap is hit.

pub mod agent_tool;
pub mod client;
pub mod runner;

mod dispatch;
mod executor;
mod mock;
mod sse;

pub use agent_tool::AgentAsTool;
pub use client::{AgentClient, DEFAULT_ENDPOINT};
pub use runner::Runner;

pub use agentlink_core::{
    Agent, AgentConfig, Error, EventSink, Handoff, ModelSpec, NoopSink, ReplyEvent, ReplyMethod,
    RequestOptions, Result, RunLogger, ToolCallContext,
};
pub use agentlink_mcp::{McpTool, McpToolCache, McpTransport};
pub use agentlink_tools::{FunctionTool, Tool, ToolContext, ToolRegistry};
