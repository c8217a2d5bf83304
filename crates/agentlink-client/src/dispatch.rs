//! Routes decoded SSE frames to the event sink and tracks the turn's final
//! reply.
//!
//! A frame that fails to decode is skipped — one garbled event must not kill
//! the stream. A server `error` event is terminal for the turn.

use serde_json::Value;
use tracing::debug;

use agentlink_core::event::{
    ErrorEvent, EventEnvelope, ReferenceEvent, ReplyEvent, ThoughtEvent, TokenStatEvent,
    EVENT_ERROR, EVENT_REFERENCE, EVENT_REPLY, EVENT_THOUGHT, EVENT_TOKEN_STAT,
};
use agentlink_core::{Error, EventSink, Result};

pub(crate) fn handle_frame(
    data: &str,
    sink: &dyn EventSink,
    final_reply: &mut Option<ReplyEvent>,
) -> Result<()> {
    let envelope: EventEnvelope = match serde_json::from_str(data) {
        Ok(envelope) => envelope,
        Err(e) => {
            debug!(%e, "skipping undecodable sse frame");
            return Ok(());
        }
    };
    match envelope.kind.as_str() {
        EVENT_ERROR => {
            let event = decode_error_event(data, &envelope.payload);
            sink.on_error(&event);
            Err(Error::Server {
                code: event.error.code,
                message: event.error.message,
                request_id: event.request_id,
                trace_id: event.trace_id,
            })
        }
        EVENT_REFERENCE => {
            if let Ok(event) = serde_json::from_value::<ReferenceEvent>(envelope.payload) {
                sink.on_reference(&event);
            }
            Ok(())
        }
        EVENT_THOUGHT => {
            if let Ok(event) = serde_json::from_value::<ThoughtEvent>(envelope.payload) {
                sink.on_thought(&event);
            }
            Ok(())
        }
        EVENT_REPLY => {
            if let Ok(reply) = serde_json::from_value::<ReplyEvent>(envelope.payload) {
                if reply.is_final {
                    *final_reply = Some(reply.clone());
                }
                // Interrupt replies are control signals for the driver, not
                // user-visible output.
                if !reply.reply_method.is_interrupt() {
                    sink.on_reply(&reply);
                }
            }
            Ok(())
        }
        EVENT_TOKEN_STAT => {
            if let Ok(event) = serde_json::from_value::<TokenStatEvent>(envelope.payload) {
                sink.on_token_stat(&event);
            }
            Ok(())
        }
        other => {
            debug!(kind = other, "ignoring unknown event kind");
            Ok(())
        }
    }
}

/// Error events arrive either under `payload` or at the envelope root,
/// depending on the server version.
fn decode_error_event(raw: &str, payload: &Value) -> ErrorEvent {
    if payload.is_object() {
        if let Ok(event) = serde_json::from_value::<ErrorEvent>(payload.clone()) {
            if event.error.code != 0 || !event.error.message.is_empty() {
                return event;
            }
        }
    }
    serde_json::from_str(raw).unwrap_or_default()
}

#[cfg(test)]
pub(crate) mod tests {
    use std::sync::Mutex;

    use super::*;
    use agentlink_core::ToolCallContext;
    use serde_json::json;

    #[derive(Default)]
    pub(crate) struct RecordingSink {
        pub calls: Mutex<Vec<String>>,
        pub replies: Mutex<Vec<ReplyEvent>>,
        pub hooks: Mutex<Vec<ToolCallContext>>,
    }

    impl RecordingSink {
        pub fn calls(&self) -> Vec<String> {
            self.calls.lock().unwrap().clone()
        }
    }

    impl EventSink for RecordingSink {
        fn on_error(&self, _event: &ErrorEvent) {
            self.calls.lock().unwrap().push("error".into());
        }

        fn on_reply(&self, event: &ReplyEvent) {
            self.calls.lock().unwrap().push("reply".into());
            self.replies.lock().unwrap().push(event.clone());
        }

        fn on_thought(&self, _event: &ThoughtEvent) {
            self.calls.lock().unwrap().push("thought".into());
        }

        fn on_reference(&self, _event: &ReferenceEvent) {
            self.calls.lock().unwrap().push("reference".into());
        }

        fn on_token_stat(&self, _event: &TokenStatEvent) {
            self.calls.lock().unwrap().push("token_stat".into());
        }

        fn before_tool_call(&self, call: &ToolCallContext) {
            self.calls.lock().unwrap().push("before_tool_call".into());
            self.hooks.lock().unwrap().push(call.clone());
        }

        fn after_tool_call(&self, call: &ToolCallContext) {
            self.calls.lock().unwrap().push("after_tool_call".into());
            self.hooks.lock().unwrap().push(call.clone());
        }
    }

    fn frame(v: Value) -> String {
        v.to_string()
    }

    #[test]
    fn test_routes_in_wire_order() {
        let sink = RecordingSink::default();
        let mut final_reply = None;

        handle_frame(
            &frame(json!({"type": "thought", "payload": {"procedures": []}})),
            &sink,
            &mut final_reply,
        )
        .unwrap();
        handle_frame(
            &frame(json!({"type": "reference", "payload": {"references": []}})),
            &sink,
            &mut final_reply,
        )
        .unwrap();
        handle_frame(
            &frame(json!({"type": "token_stat", "payload": {"token_count": 3}})),
            &sink,
            &mut final_reply,
        )
        .unwrap();
        handle_frame(
            &frame(json!({"type": "reply", "payload": {"content": "hi", "is_final": true, "reply_method": 1}})),
            &sink,
            &mut final_reply,
        )
        .unwrap();

        assert_eq!(sink.calls(), vec!["thought", "reference", "token_stat", "reply"]);
        assert_eq!(final_reply.unwrap().content, "hi");
    }

    #[test]
    fn test_interrupt_reply_is_captured_but_not_forwarded() {
        let sink = RecordingSink::default();
        let mut final_reply = None;
        handle_frame(
            &frame(json!({
                "type": "reply",
                "payload": {
                    "is_final": true,
                    "reply_method": 20,
                    "interrupt_info": {"current_agent": "a", "tool_calls": []}
                }
            })),
            &sink,
            &mut final_reply,
        )
        .unwrap();

        assert!(sink.calls().is_empty());
        assert!(final_reply.unwrap().reply_method.is_interrupt());
    }

    #[test]
    fn test_non_final_reply_does_not_become_final() {
        let sink = RecordingSink::default();
        let mut final_reply = None;
        handle_frame(
            &frame(json!({"type": "reply", "payload": {"content": "partial", "is_final": false}})),
            &sink,
            &mut final_reply,
        )
        .unwrap();
        assert!(final_reply.is_none());
        assert_eq!(sink.calls(), vec!["reply"]);
    }

    #[test]
    fn test_error_event_terminates_turn() {
        let sink = RecordingSink::default();
        let mut final_reply = None;
        let err = handle_frame(
            &frame(json!({
                "type": "error",
                "payload": {"error": {"code": 429, "message": "busy"}, "request_id": "r", "trace_id": "t"}
            })),
            &sink,
            &mut final_reply,
        )
        .unwrap_err();

        assert_eq!(sink.calls(), vec!["error"]);
        match err {
            Error::Server { code, message, .. } => {
                assert_eq!(code, 429);
                assert_eq!(message, "busy");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn test_error_event_at_envelope_root() {
        let sink = RecordingSink::default();
        let mut final_reply = None;
        let err = handle_frame(
            &frame(json!({
                "type": "error",
                "error": {"code": 500, "message": "down"},
                "request_id": "r2",
                "trace_id": "t2"
            })),
            &sink,
            &mut final_reply,
        )
        .unwrap_err();
        match err {
            Error::Server { code, request_id, .. } => {
                assert_eq!(code, 500);
                assert_eq!(request_id, "r2");
            }
            other => panic!("expected server error, got {other:?}"),
        }
    }

    #[test]
    fn test_garbled_frame_is_skipped() {
        let sink = RecordingSink::default();
        let mut final_reply = None;
        handle_frame("not json at all", &sink, &mut final_reply).unwrap();
        handle_frame(
            &frame(json!({"type": "mystery", "payload": {}})),
            &sink,
            &mut final_reply,
        )
        .unwrap();
        assert!(sink.calls().is_empty());
        assert!(final_reply.is_none());
    }
}
