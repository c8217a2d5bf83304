use thiserror::Error;

/// Failures surfaced to the caller of a dialog run.
///
/// Tool-local failures (missing tool, bad arguments, timeout, panic) are
/// deliberately absent: they are converted into advisory strings inside the
/// tool outputs so the server-side model can react to them.
#[derive(Debug, Error)]
pub enum Error {
    /// Invalid registration or client configuration. Raised at registration
    /// time, never during a call.
    #[error("configuration error: {0}")]
    Config(String),

    /// Request construction, HTTP, or SSE stream failure.
    #[error("transport error: {0}")]
    Transport(String),

    /// The server emitted an `error` event on the stream.
    #[error("server error event: code {code}, message {message}, request_id {request_id}, trace_id {trace_id}")]
    Server {
        code: i64,
        message: String,
        request_id: String,
        trace_id: String,
    },

    /// The stream ended without any final reply.
    #[error("no final reply from server")]
    NoFinalReply,

    /// The interrupt/resume loop exceeded the configured turn cap.
    #[error("reached maximum tool call turns")]
    MaxToolTurns,

    /// The client was closed while a call was in flight.
    #[error("client has been closed")]
    Closed,

    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

pub type Result<T> = std::result::Result<T, Error>;
