//! In-process upstream stand-in for tests.
//!
//! [`StubConnector`] hands out transports that answer the MCP handshake and a
//! single scripted `tools/call` reply, while counting how many transports were
//! opened and closed and recording every call they carried.

use crate::protocol::*;
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use docrelay_core::{RelayError, RelayResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// What the stub answers to `tools/call`.
#[derive(Debug, Clone)]
pub enum StubReply {
    /// A normal tool result.
    Result(McpToolResult),
    /// A JSON-RPC error object.
    RpcError { code: i64, message: String },
    /// The transport fails mid-call.
    Dropped(String),
}

/// One `tools/call` observed by the stub.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub name: String,
    pub arguments: serde_json::Value,
}

#[derive(Default)]
struct Counters {
    opened: AtomicUsize,
    closed: AtomicUsize,
    calls: Mutex<Vec<RecordedCall>>,
}

/// A [`Connector`] whose transports never leave the process.
#[derive(Clone)]
pub struct StubConnector {
    counters: Arc<Counters>,
    reply: StubReply,
    refuse_connect: Option<String>,
    refuse_initialize: Option<String>,
    fail_close: Option<String>,
    call_delay: Option<Duration>,
}

impl StubConnector {
    /// Answer every `tools/call` with `reply`.
    pub fn new(reply: StubReply) -> Self {
        Self {
            counters: Arc::new(Counters::default()),
            reply,
            refuse_connect: None,
            refuse_initialize: None,
            fail_close: None,
            call_delay: None,
        }
    }

    /// Answer every `tools/call` with one text block.
    pub fn text(text: impl Into<String>) -> Self {
        Self::new(StubReply::Result(McpToolResult::text(text)))
    }

    /// Fail before any transport is opened.
    pub fn refuse_connect(mut self, cause: impl Into<String>) -> Self {
        self.refuse_connect = Some(cause.into());
        self
    }

    /// Open the transport but fail the `initialize` handshake.
    pub fn refuse_initialize(mut self, cause: impl Into<String>) -> Self {
        self.refuse_initialize = Some(cause.into());
        self
    }

    /// Count the close, then report it as failed.
    pub fn fail_close(mut self, cause: impl Into<String>) -> Self {
        self.fail_close = Some(cause.into());
        self
    }

    /// Hold every `tools/call` for `delay` before answering.
    pub fn delay_calls(mut self, delay: Duration) -> Self {
        self.call_delay = Some(delay);
        self
    }

    /// Transports opened so far.
    pub fn opened(&self) -> usize {
        self.counters.opened.load(Ordering::SeqCst)
    }

    /// Transports closed so far.
    pub fn closed(&self) -> usize {
        self.counters.closed.load(Ordering::SeqCst)
    }

    /// Every `tools/call` seen so far, in order.
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.counters
            .calls
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

#[async_trait]
impl Connector for StubConnector {
    async fn connect(&self) -> RelayResult<Box<dyn Transport>> {
        if let Some(cause) = &self.refuse_connect {
            return Err(RelayError::Http(cause.clone()));
        }
        self.counters.opened.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(StubTransport {
            stub: self.clone(),
        }))
    }

    fn endpoint(&self) -> &str {
        "stub://upstream"
    }
}

struct StubTransport {
    stub: StubConnector,
}

#[async_trait]
impl Transport for StubTransport {
    async fn request(&self, request: JsonRpcRequest) -> RelayResult<JsonRpcResponse> {
        let params = request.params.unwrap_or_default();
        match request.method.as_str() {
            "initialize" => {
                if let Some(cause) = &self.stub.refuse_initialize {
                    return Err(RelayError::Http(cause.clone()));
                }
                Ok(JsonRpcResponse::success(
                    request.id,
                    serde_json::json!({
                        "protocolVersion": PROTOCOL_VERSION,
                        "capabilities": {"tools": {}},
                        "serverInfo": {"name": "stub-upstream", "version": "0.0.0"}
                    }),
                ))
            }
            "tools/call" => {
                self.stub
                    .counters
                    .calls
                    .lock()
                    .unwrap_or_else(|e| e.into_inner())
                    .push(RecordedCall {
                        name: params["name"].as_str().unwrap_or_default().to_string(),
                        arguments: params["arguments"].clone(),
                    });

                if let Some(delay) = self.stub.call_delay {
                    tokio::time::sleep(delay).await;
                }

                match &self.stub.reply {
                    StubReply::Result(result) => Ok(JsonRpcResponse::success(
                        request.id,
                        serde_json::to_value(result)?,
                    )),
                    StubReply::RpcError { code, message } => {
                        Ok(JsonRpcResponse::failure(request.id, *code, message.clone()))
                    }
                    StubReply::Dropped(cause) => Err(RelayError::Http(cause.clone())),
                }
            }
            other => Ok(JsonRpcResponse::failure(
                request.id,
                docrelay_core::METHOD_NOT_FOUND,
                format!("Method not found: {other}"),
            )),
        }
    }

    async fn notify(&self, _method: &str, _params: Option<serde_json::Value>) -> RelayResult<()> {
        Ok(())
    }

    async fn close(&self) -> RelayResult<()> {
        self.stub.counters.closed.fetch_add(1, Ordering::SeqCst);
        match &self.stub.fail_close {
            Some(cause) => Err(RelayError::Http(cause.clone())),
            None => Ok(()),
        }
    }
}
