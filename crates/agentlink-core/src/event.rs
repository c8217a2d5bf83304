//! Typed events carried on the server's SSE stream.
//!
//! Every frame is a JSON [`EventEnvelope`] whose `type` field selects one of
//! the event payloads below. The one irregularity of the wire format is the
//! `error` event, which some server versions emit at the envelope root
//! instead of under `payload` — decoders accept both shapes.

use serde::{Deserialize, Serialize};
use serde_json::Value;

pub const EVENT_ERROR: &str = "error";
pub const EVENT_REFERENCE: &str = "reference";
pub const EVENT_THOUGHT: &str = "thought";
pub const EVENT_REPLY: &str = "reply";
pub const EVENT_TOKEN_STAT: &str = "token_stat";

/// Envelope around every SSE frame.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub payload: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message_id: Option<String>,
}

// --- error ---

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorEvent {
    #[serde(default)]
    pub error: ErrorDetail,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub trace_id: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ErrorDetail {
    #[serde(default)]
    pub code: i64,
    #[serde(default)]
    pub message: String,
}

// --- reference ---

/// A knowledge source cited by the reply.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Reference {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: u32,
    #[serde(default)]
    pub url: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub doc_id: String,
    #[serde(default)]
    pub doc_name: String,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReferenceEvent {
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub references: Vec<Reference>,
}

// --- reply ---

/// Numeric reply-method code. The wire carries small integers; unknown codes
/// must survive a decode/encode round trip, so this is a transparent newtype
/// rather than a closed enum.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ReplyMethod(pub u8);

impl ReplyMethod {
    pub const MODEL: ReplyMethod = ReplyMethod(1);
    pub const CONSERVATIVE: ReplyMethod = ReplyMethod(2);
    pub const REJECTED: ReplyMethod = ReplyMethod(3);
    pub const SENSITIVE: ReplyMethod = ReplyMethod(4);
    pub const PRIORITY_QA: ReplyMethod = ReplyMethod(5);
    pub const GREETING: ReplyMethod = ReplyMethod(6);
    pub const BUSY: ReplyMethod = ReplyMethod(7);
    pub const GLOBAL_KNOWLEDGE: ReplyMethod = ReplyMethod(8);
    pub const TASK_FLOW: ReplyMethod = ReplyMethod(9);
    pub const TASK_ANSWER: ReplyMethod = ReplyMethod(10);
    pub const SEARCH_ENGINE: ReplyMethod = ReplyMethod(11);
    pub const KNOWLEDGE_POLISH: ReplyMethod = ReplyMethod(12);
    pub const IMAGE: ReplyMethod = ReplyMethod(13);
    pub const FILE: ReplyMethod = ReplyMethod(14);
    pub const CLARIFY_CONFIRM: ReplyMethod = ReplyMethod(15);
    pub const WORKFLOW: ReplyMethod = ReplyMethod(16);
    pub const WORKFLOW_ANSWER: ReplyMethod = ReplyMethod(17);
    pub const AGENT: ReplyMethod = ReplyMethod(18);
    pub const MULTI_INTENT: ReplyMethod = ReplyMethod(19);
    /// The client must execute the embedded tool calls and resume the dialog.
    pub const INTERRUPT: ReplyMethod = ReplyMethod(20);

    pub fn is_interrupt(&self) -> bool {
        *self == Self::INTERRUPT
    }
}

/// A reply or confirmation from the server.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ReplyEvent {
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub related_record_id: String,
    #[serde(default)]
    pub timestamp: i64,
    #[serde(default)]
    pub is_final: bool,
    #[serde(default)]
    pub is_from_self: bool,
    #[serde(default)]
    pub reply_method: ReplyMethod,
    /// Present when `reply_method` is [`ReplyMethod::INTERRUPT`]: the dialog
    /// cannot continue until the listed tools have run locally.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub interrupt_info: Option<InterruptInfo>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct InterruptInfo {
    /// Name of the agent that requested the tool calls.
    #[serde(default)]
    pub current_agent: String,
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolCall {
    #[serde(default)]
    pub id: String,
    #[serde(rename = "type", default)]
    pub kind: String,
    #[serde(default)]
    pub function: FunctionCall,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct FunctionCall {
    #[serde(default)]
    pub name: String,
    /// JSON-encoded argument object, passed through as a string on the wire.
    #[serde(default)]
    pub arguments: String,
}

// --- thought ---

/// Reasoning-progress event emitted while an agent works on a turn.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThoughtEvent {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub trace_id: String,
    #[serde(default)]
    pub record_id: String,
    /// Elapsed time of the request so far, in milliseconds.
    #[serde(default)]
    pub elapsed: u32,
    #[serde(default)]
    pub is_workflow: bool,
    #[serde(default)]
    pub workflow_name: String,
    #[serde(default)]
    pub procedures: Vec<ThoughtProcedure>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ThoughtProcedure {
    #[serde(default)]
    pub index: u32,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: ProcedureStatus,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub workflow_name: String,
    #[serde(default)]
    pub node_name: String,
    #[serde(default)]
    pub reply_index: u32,
    #[serde(default)]
    pub elapsed: u32,
    /// Opaque debug payload; shape varies per procedure kind.
    #[serde(default)]
    pub debugging: Value,
}

// --- token_stat ---

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcedureStatus {
    #[default]
    Processing,
    Success,
    Failed,
    Stop,
}

/// Billing-resource availability codes inside a [`Procedure`].
pub const RESOURCE_AVAILABLE: u32 = 1;
pub const RESOURCE_UNAVAILABLE: u32 = 2;

/// Token accounting event, emitted alongside thoughts and replies.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenStatEvent {
    #[serde(default)]
    pub session_id: String,
    #[serde(default)]
    pub request_id: String,
    #[serde(default)]
    pub record_id: String,
    #[serde(default)]
    pub used_count: u32,
    #[serde(default)]
    pub free_count: u32,
    #[serde(default)]
    pub order_count: u32,
    #[serde(default)]
    pub status_summary: ProcedureStatus,
    #[serde(default)]
    pub status_summary_title: String,
    #[serde(default)]
    pub elapsed: u32,
    #[serde(default)]
    pub token_count: u32,
    #[serde(default)]
    pub procedures: Vec<Procedure>,
}

/// One execution step (knowledge lookup, tool call, model generation).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Procedure {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub status: ProcedureStatus,
    #[serde(default)]
    pub input_count: u32,
    #[serde(default)]
    pub output_count: u32,
    #[serde(default)]
    pub count: u32,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub token_usage_details: Vec<TokenUsage>,
    /// Opaque debug payload.
    #[serde(default)]
    pub debugging: Value,
    /// Billing resource state: [`RESOURCE_AVAILABLE`] or [`RESOURCE_UNAVAILABLE`].
    #[serde(default)]
    pub resource_status: u32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TokenUsage {
    #[serde(default)]
    pub model_name: String,
    #[serde(default)]
    pub input_tokens: u32,
    #[serde(default)]
    pub output_tokens: u32,
    #[serde(default)]
    pub total_tokens: u32,
}

/// Aggregate a procedure list into a single summary status.
///
/// A failed procedure fails the whole summary unless its billing resource
/// was unavailable, in which case it is demoted to success in the summary
/// (the procedure itself stays in the list untouched). Otherwise the
/// summary follows the last non-failed procedure.
pub fn status_summary(procedures: &[Procedure]) -> ProcedureStatus {
    let mut summary = ProcedureStatus::Processing;
    for p in procedures {
        if p.status == ProcedureStatus::Failed {
            if p.resource_status != RESOURCE_UNAVAILABLE {
                return ProcedureStatus::Failed;
            }
            summary = ProcedureStatus::Success;
        } else {
            summary = p.status;
        }
    }
    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_envelope_decode() {
        let data = r#"{"type":"reply","payload":{"content":"hi","is_final":true},"message_id":"m1"}"#;
        let env: EventEnvelope = serde_json::from_str(data).unwrap();
        assert_eq!(env.kind, EVENT_REPLY);
        assert_eq!(env.message_id.as_deref(), Some("m1"));
        let reply: ReplyEvent = serde_json::from_value(env.payload).unwrap();
        assert_eq!(reply.content, "hi");
        assert!(reply.is_final);
    }

    #[test]
    fn test_error_event_decodes_from_root_and_payload() {
        // Root shape (older servers).
        let root = r#"{"type":"error","error":{"code":4001,"message":"boom"},"request_id":"r1","trace_id":"t1"}"#;
        let ev: ErrorEvent = serde_json::from_str(root).unwrap();
        assert_eq!(ev.error.code, 4001);
        assert_eq!(ev.request_id, "r1");

        // Payload shape.
        let env: EventEnvelope = serde_json::from_str(
            r#"{"type":"error","payload":{"error":{"code":4002,"message":"bad"},"request_id":"r2","trace_id":"t2"}}"#,
        )
        .unwrap();
        let ev: ErrorEvent = serde_json::from_value(env.payload).unwrap();
        assert_eq!(ev.error.code, 4002);
        assert_eq!(ev.trace_id, "t2");
    }

    #[test]
    fn test_interrupt_reply_decode() {
        let payload = json!({
            "content": "",
            "is_final": true,
            "reply_method": 20,
            "interrupt_info": {
                "current_agent": "math",
                "tool_calls": [
                    {"id": "t1", "type": "function", "function": {"name": "add", "arguments": "{\"a\":2,\"b\":3}"}}
                ]
            }
        });
        let reply: ReplyEvent = serde_json::from_value(payload).unwrap();
        assert!(reply.reply_method.is_interrupt());
        let info = reply.interrupt_info.unwrap();
        assert_eq!(info.current_agent, "math");
        assert_eq!(info.tool_calls[0].function.name, "add");
        // Arguments stay a string; callers decode them separately.
        let args: Value = serde_json::from_str(&info.tool_calls[0].function.arguments).unwrap();
        assert_eq!(args["a"], 2);
    }

    #[test]
    fn test_unknown_reply_method_round_trips() {
        let reply: ReplyEvent = serde_json::from_value(json!({"reply_method": 77})).unwrap();
        assert_eq!(reply.reply_method, ReplyMethod(77));
        let back = serde_json::to_value(&reply).unwrap();
        assert_eq!(back["reply_method"], 77);
    }

    fn proc(status: ProcedureStatus, resource_status: u32) -> Procedure {
        Procedure {
            status,
            resource_status,
            ..Default::default()
        }
    }

    #[test]
    fn test_status_summary_failure_wins() {
        let ps = vec![
            proc(ProcedureStatus::Success, RESOURCE_AVAILABLE),
            proc(ProcedureStatus::Failed, RESOURCE_AVAILABLE),
            proc(ProcedureStatus::Success, RESOURCE_AVAILABLE),
        ];
        assert_eq!(status_summary(&ps), ProcedureStatus::Failed);
    }

    #[test]
    fn test_status_summary_unavailable_failure_demoted() {
        let ps = vec![
            proc(ProcedureStatus::Success, RESOURCE_AVAILABLE),
            proc(ProcedureStatus::Failed, RESOURCE_UNAVAILABLE),
        ];
        assert_eq!(status_summary(&ps), ProcedureStatus::Success);
    }

    #[test]
    fn test_status_summary_follows_last_non_failed() {
        let ps = vec![
            proc(ProcedureStatus::Success, RESOURCE_AVAILABLE),
            proc(ProcedureStatus::Failed, RESOURCE_UNAVAILABLE),
            proc(ProcedureStatus::Processing, RESOURCE_AVAILABLE),
        ];
        assert_eq!(status_summary(&ps), ProcedureStatus::Processing);
        assert_eq!(status_summary(&[]), ProcedureStatus::Processing);
    }
}
