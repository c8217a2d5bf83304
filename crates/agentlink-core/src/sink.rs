//! Application-facing callbacks for stream events and tool-call hooks.

use serde_json::Value;

use crate::event::{ErrorEvent, ReferenceEvent, ReplyEvent, ThoughtEvent, TokenStatEvent};

/// Context handed to the tool-call hooks.
///
/// `output` and `error` are only populated for [`EventSink::after_tool_call`];
/// a panicking or timed-out tool reports through `error` like any other
/// failure. Hooks observe outcomes but cannot alter them.
#[derive(Debug, Clone, Default)]
pub struct ToolCallContext {
    pub tool_name: String,
    pub call_id: String,
    pub input: Value,
    pub output: Option<Value>,
    pub error: Option<String>,
}

/// Receives every decoded stream event plus the before/after tool hooks.
///
/// All methods default to no-ops so implementations only override what they
/// care about. Events arrive in wire order within a turn; interrupt replies
/// are control signals and are never forwarded to [`EventSink::on_reply`].
pub trait EventSink: Send + Sync {
    fn on_error(&self, _event: &ErrorEvent) {}

    fn on_reply(&self, _event: &ReplyEvent) {}

    fn on_thought(&self, _event: &ThoughtEvent) {}

    fn on_reference(&self, _event: &ReferenceEvent) {}

    fn on_token_stat(&self, _event: &TokenStatEvent) {}

    fn before_tool_call(&self, _call: &ToolCallContext) {}

    fn after_tool_call(&self, _call: &ToolCallContext) {}
}

/// Sink that ignores everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopSink;

impl EventSink for NoopSink {}

/// Raw request/response body logging for callers that want an audit trail
/// beyond the crate's `tracing` output.
pub trait RunLogger: Send + Sync {
    fn info(&self, message: &str);

    fn error(&self, message: &str);
}
