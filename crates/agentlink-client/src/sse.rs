//! SSE (Server-Sent Events) line parser.
//!
//! Converts a `reqwest::Response` body into a stream of parsed frames.
//! Frames up to 10 MiB are accepted; the server packs large debug payloads
//! into single events. An oversized frame is a structural stream error.

use futures::Stream;
use tokio_stream::StreamExt;

use agentlink_core::Error;

const MAX_EVENT_SIZE: usize = 10 * 1024 * 1024;

/// A parsed SSE frame.
#[derive(Debug, Clone)]
pub struct SseFrame {
    pub event: Option<String>,
    pub data: String,
    pub id: Option<String>,
}

struct SseState {
    byte_stream:
        std::pin::Pin<Box<dyn Stream<Item = Result<bytes::Bytes, reqwest::Error>> + Send>>,
    buffer: String,
    current_event: Option<String>,
    current_data: Vec<String>,
    current_id: Option<String>,
    // Cumulative size of the frame being accumulated; the cap bounds the
    // whole frame, not any single line.
    event_size: usize,
    failed: bool,
}

impl SseState {
    fn take_frame(&mut self) -> SseFrame {
        let frame = SseFrame {
            event: self.current_event.take(),
            data: self.current_data.join("\n"),
            id: self.current_id.take(),
        };
        self.current_data.clear();
        self.event_size = 0;
        frame
    }
}

/// Parse a response body as an SSE stream.
pub fn parse_sse_stream(
    response: reqwest::Response,
) -> impl Stream<Item = Result<SseFrame, Error>> {
    let byte_stream = response.bytes_stream();

    // Accumulate partial lines across chunks.
    futures::stream::unfold(
        SseState {
            byte_stream: Box::pin(byte_stream),
            buffer: String::new(),
            current_event: None,
            current_data: Vec::new(),
            current_id: None,
            event_size: 0,
            failed: false,
        },
        |mut state| async move {
            if state.failed {
                return None;
            }
            loop {
                // Try to extract a line from the buffer.
                if let Some(newline_pos) = state.buffer.find('\n') {
                    let line = state.buffer[..newline_pos]
                        .trim_end_matches('\r')
                        .to_string();
                    state.buffer = state.buffer[newline_pos + 1..].to_string();

                    if line.is_empty() {
                        // Empty line = dispatch the frame.
                        if !state.current_data.is_empty() {
                            let frame = state.take_frame();
                            return Some((Ok(frame), state));
                        }
                        continue;
                    }

                    if line.starts_with(':') {
                        // Comment, skip.
                        continue;
                    }

                    if let Some(value) = line.strip_prefix("event:") {
                        let value = value.trim_start();
                        state.event_size += value.len();
                        state.current_event = Some(value.to_string());
                    } else if let Some(value) = line.strip_prefix("data:") {
                        let value = value.trim_start();
                        state.event_size += value.len() + 1;
                        state.current_data.push(value.to_string());
                    } else if let Some(value) = line.strip_prefix("id:") {
                        let value = value.trim_start();
                        state.event_size += value.len();
                        state.current_id = Some(value.to_string());
                    }
                    // Unknown fields are ignored; everything kept counts
                    // toward the frame cap.
                    if state.event_size > MAX_EVENT_SIZE {
                        state.failed = true;
                        return Some((
                            Err(Error::Transport(format!(
                                "sse frame exceeds {MAX_EVENT_SIZE} bytes"
                            ))),
                            state,
                        ));
                    }
                    continue;
                }

                // A single line with no newline yet is bounded by the same cap.
                if state.buffer.len() > MAX_EVENT_SIZE {
                    state.failed = true;
                    return Some((
                        Err(Error::Transport(format!(
                            "sse frame exceeds {MAX_EVENT_SIZE} bytes"
                        ))),
                        state,
                    ));
                }

                // Need more data from the stream.
                match state.byte_stream.next().await {
                    Some(Ok(chunk)) => {
                        state.buffer.push_str(&String::from_utf8_lossy(&chunk));
                    }
                    Some(Err(e)) => {
                        state.failed = true;
                        return Some((Err(Error::Transport(format!("sse read error: {e}"))), state));
                    }
                    None => {
                        // Stream ended. Dispatch any remaining data.
                        if !state.current_data.is_empty() {
                            let frame = state.take_frame();
                            return Some((Ok(frame), state));
                        }
                        return None;
                    }
                }
            }
        },
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    // The line-level protocol is exercised end to end in the integration
    // tests; here we only pin down the frame accessors.
    #[test]
    fn test_frame_fields() {
        let frame = SseFrame {
            event: Some("message".into()),
            data: r#"{"type":"reply"}"#.into(),
            id: None,
        };
        assert_eq!(frame.event.as_deref(), Some("message"));
        assert!(frame.data.contains("reply"));
    }
}
