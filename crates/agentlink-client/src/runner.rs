//! The dialog driver: trades POST/SSE turns with the server and threads
//! tool outputs back until a final reply lands.
//!
//! ```text
//! INIT -> SEND -> READ_STREAM -> (FINAL | INTERRUPT)
//! INTERRUPT -> RUN_TOOLS -> UPDATE_REQUEST -> SEND   (loop, capped)
//! FINAL -> return reply
//! ```
//!
//! The driver never retries: HTTP failures, stream errors, and server error
//! events all abort the call as-is.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio_stream::StreamExt;
use tracing::{debug, error};
use uuid::Uuid;

use agentlink_core::event::ReplyEvent;
use agentlink_core::wire::{ChatRequest, RequestOptions, ToolOutput};
use agentlink_core::{Agent, Error, EventSink, Handoff, Result, RunLogger};
use agentlink_tools::{ToolContext, ToolRegistry};
use tokio_util::sync::CancellationToken;

use crate::{dispatch, executor, mock, sse};

/// One dialog driver. Cheap to build per call: the registry entries, sink,
/// and HTTP client are all shared behind `Arc`s.
pub struct Runner {
    pub(crate) endpoint: String,
    pub(crate) bot_app_key: String,
    pub(crate) http: reqwest::Client,
    pub(crate) registry: ToolRegistry,
    pub(crate) agents: Vec<Agent>,
    pub(crate) handoffs: Vec<Handoff>,
    pub(crate) enable_system_opt: bool,
    pub(crate) start_agent: String,
    pub(crate) max_tool_turns: u32,
    pub(crate) tool_run_timeout: Duration,
    pub(crate) sink: Arc<dyn EventSink>,
    pub(crate) logger: Option<Arc<dyn RunLogger>>,
    pub(crate) closed: Arc<AtomicBool>,
    pub(crate) mock: bool,
}

impl Runner {
    /// Drive one user query to its final reply.
    pub async fn run_with_cancel(
        &self,
        cancel: CancellationToken,
        query: &str,
        session_id: &str,
        visitor_biz_id: &str,
        options: Option<RequestOptions>,
    ) -> Result<ReplyEvent> {
        if self.mock {
            return mock::mock_run(self, session_id, visitor_biz_id).await;
        }

        let mut req = self.build_request(query, session_id, visitor_biz_id, options);
        for turn in 0..=self.max_tool_turns {
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::Closed);
            }
            // One request id per server turn.
            req.options.request_id = Uuid::new_v4().to_string();

            let reply = self
                .query_once(&cancel, &req)
                .await?
                .ok_or(Error::NoFinalReply)?;
            if !reply.reply_method.is_interrupt() {
                return Ok(reply);
            }
            debug!(turn, "interrupt reply, running local tools");

            let ctx = ToolContext {
                cancel: cancel.clone(),
                session_id: session_id.to_string(),
                visitor_biz_id: visitor_biz_id.to_string(),
                request_id: req.options.request_id.clone(),
                env_set: req.options.env_set.clone(),
            };
            let mut tool_outputs = Vec::new();
            if let Some(interrupt) = &reply.interrupt_info {
                let outputs = executor::run_tools(
                    &self.registry,
                    interrupt,
                    &req.options.custom_variables,
                    &self.sink,
                    self.tool_run_timeout,
                    &ctx,
                )
                .await;
                tool_outputs = interrupt
                    .tool_calls
                    .iter()
                    .zip(outputs)
                    .map(|(call, output)| ToolOutput {
                        tool_name: call.function.name.clone(),
                        output,
                    })
                    .collect();
            }
            req.options.tool_outputs = tool_outputs;
            // The resumed turn carries no new user utterance.
            req.content.clear();
        }
        Err(Error::MaxToolTurns)
    }

    pub(crate) fn build_request(
        &self,
        query: &str,
        session_id: &str,
        visitor_biz_id: &str,
        options: Option<RequestOptions>,
    ) -> ChatRequest {
        let mut req = ChatRequest {
            content: query.to_string(),
            session_id: session_id.to_string(),
            bot_app_key: self.bot_app_key.clone(),
            visitor_biz_id: visitor_biz_id.to_string(),
            options: options.unwrap_or_default(),
        };
        req.options.agent_config.agents = self.agents.clone();
        req.options.agent_config.handoffs = self.handoffs.clone();
        req.options.agent_config.disable_system_opt = !self.enable_system_opt;
        req.options.agent_config.start_agent_name = self.start_agent.clone();
        req.options.agent_config.agent_tools = self.registry.to_agent_tool_sets();
        req
    }

    /// One POST/SSE exchange. Returns the turn's final reply, or `None`
    /// when the stream ended without one.
    async fn query_once(
        &self,
        cancel: &CancellationToken,
        req: &ChatRequest,
    ) -> Result<Option<ReplyEvent>> {
        let body = serde_json::to_string(req)?;
        if let Some(logger) = &self.logger {
            logger.info(&format!("[agentlink] api call, request: {body}"));
        }
        debug!(endpoint = %self.endpoint, "sending dialog turn");

        let send = self
            .http
            .post(&self.endpoint)
            .header(reqwest::header::CONTENT_TYPE, "application/json")
            .body(body)
            .send();
        let response = tokio::select! {
            response = send => {
                response.map_err(|e| Error::Transport(format!("http request error: {e}")))?
            }
            _ = cancel.cancelled() => {
                return Err(Error::Transport("request cancelled by caller".into()));
            }
        };
        if !response.status().is_success() {
            let status = response.status();
            let text = response.text().await.unwrap_or_default();
            return Err(Error::Transport(format!(
                "server returned {status}: {text}"
            )));
        }

        let mut final_reply = None;
        let outcome = self
            .read_stream(cancel, response, &mut final_reply)
            .await;
        match &outcome {
            Ok(()) => {
                if let Some(logger) = &self.logger {
                    let rendered = final_reply
                        .as_ref()
                        .and_then(|r| serde_json::to_string(r).ok())
                        .unwrap_or_else(|| "null".into());
                    logger.info(&format!("[agentlink] api final reply: {rendered}"));
                }
            }
            Err(e) => {
                error!(error = %e, "dialog turn failed");
                if let Some(logger) = &self.logger {
                    logger.error(&format!("[agentlink] api final error: {e}"));
                }
            }
        }
        outcome?;
        Ok(final_reply)
    }

    async fn read_stream(
        &self,
        cancel: &CancellationToken,
        response: reqwest::Response,
        final_reply: &mut Option<ReplyEvent>,
    ) -> Result<()> {
        let stream = sse::parse_sse_stream(response);
        tokio::pin!(stream);
        loop {
            // The closed flag is observed between frames.
            if self.closed.load(Ordering::SeqCst) {
                return Err(Error::Closed);
            }
            let frame = tokio::select! {
                frame = stream.next() => frame,
                _ = cancel.cancelled() => {
                    return Err(Error::Transport("stream cancelled by caller".into()));
                }
            };
            match frame {
                Some(Ok(frame)) => {
                    dispatch::handle_frame(&frame.data, self.sink.as_ref(), final_reply)?;
                }
                Some(Err(e)) => return Err(e),
                None => return Ok(()),
            }
        }
    }
}
