//! Core types shared across the AgentLink SDK.
//!
//! This crate defines the typed event model received over the server's SSE
//! stream, the JSON wire protocol sent back to it, the SDK error type, and
//! the [`EventSink`] callback surface through which applications observe a
//! running dialog.

pub mod error;
pub mod event;
pub mod sink;
pub mod wire;

pub use error::{Error, Result};
pub use event::{
    ErrorEvent, EventEnvelope, InterruptInfo, Procedure, ProcedureStatus, ReferenceEvent,
    ReplyEvent, ReplyMethod, ThoughtEvent, TokenStatEvent, ToolCall,
};
pub use sink::{EventSink, NoopSink, RunLogger, ToolCallContext};
pub use wire::{
    Agent, AgentConfig, AgentToolSet, ChatRequest, FileInfo, FunctionSpec, Handoff, ModelSpec,
    RequestOptions, ToolOutput, ToolSpec,
};
