//! Streamable HTTP transport for talking to a remote MCP server.
//!
//! Every JSON-RPC frame is POSTed to the endpoint. The server answers a
//! request either with a plain JSON body or with an SSE stream whose `data:`
//! events carry JSON-RPC messages; the event whose id matches the request is
//! the answer. The session id handed out on `initialize` is echoed on every
//! later request and released with a `DELETE` on close.

use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use crate::transport::{Connector, Transport};
use async_trait::async_trait;
use docrelay_core::{RelayError, RelayResult};
use futures_util::StreamExt;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use std::time::Duration;
use tokio::sync::Mutex;
use tracing::debug;

/// Header carrying the server-assigned session id.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";
/// Header carrying the negotiated protocol revision.
pub const PROTOCOL_VERSION_HEADER: &str = "mcp-protocol-version";

const ACCEPT_JSON_OR_STREAM: &str = "application/json, text/event-stream";

/// Opens one [`HttpTransport`] per call, each with its own HTTP client.
#[derive(Debug, Clone)]
pub struct HttpConnector {
    endpoint: String,
    timeout: Duration,
}

impl HttpConnector {
    pub fn new(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self {
            endpoint: endpoint.into(),
            timeout,
        }
    }
}

#[async_trait]
impl Connector for HttpConnector {
    async fn connect(&self) -> RelayResult<Box<dyn Transport>> {
        let http = reqwest::Client::builder()
            .timeout(self.timeout)
            .build()
            .map_err(|e| RelayError::Http(format!("Failed to build HTTP client: {e}")))?;

        debug!(endpoint = %self.endpoint, "Opened streamable HTTP transport");
        Ok(Box::new(HttpTransport::new(self.endpoint.clone(), http)))
    }

    fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

/// A single streamable HTTP channel to the upstream server.
pub struct HttpTransport {
    endpoint: String,
    http: reqwest::Client,
    session_id: Mutex<Option<String>>,
    protocol_version: Mutex<Option<String>>,
}

impl HttpTransport {
    pub fn new(endpoint: impl Into<String>, http: reqwest::Client) -> Self {
        Self {
            endpoint: endpoint.into(),
            http,
            session_id: Mutex::new(None),
            protocol_version: Mutex::new(None),
        }
    }

    async fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_JSON_OR_STREAM));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        if let Some(id) = self.session_id.lock().await.as_deref() {
            if let Ok(value) = HeaderValue::from_str(id) {
                headers.insert(SESSION_ID_HEADER, value);
            }
        }
        if let Some(version) = self.protocol_version.lock().await.as_deref() {
            if let Ok(value) = HeaderValue::from_str(version) {
                headers.insert(PROTOCOL_VERSION_HEADER, value);
            }
        }

        headers
    }

    async fn post(&self, body: &serde_json::Value) -> RelayResult<reqwest::Response> {
        let resp = self
            .http
            .post(&self.endpoint)
            .headers(self.headers().await)
            .json(body)
            .send()
            .await
            .map_err(|e| RelayError::Http(e.to_string()))?;

        if let Some(id) = resp
            .headers()
            .get(SESSION_ID_HEADER)
            .and_then(|v| v.to_str().ok())
        {
            *self.session_id.lock().await = Some(id.to_string());
        }

        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(RelayError::Http(format!(
                "upstream returned {status}: {body}"
            )));
        }

        Ok(resp)
    }
}

#[async_trait]
impl Transport for HttpTransport {
    async fn request(&self, request: JsonRpcRequest) -> RelayResult<JsonRpcResponse> {
        let id = request.id;
        let body = serde_json::to_value(&request)?;
        let resp = self.post(&body).await?;

        let is_stream = resp
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|ct| ct.starts_with("text/event-stream"));

        if is_stream {
            return read_event_stream(resp, id).await;
        }

        let bytes = resp
            .bytes()
            .await
            .map_err(|e| RelayError::Http(e.to_string()))?;
        serde_json::from_slice(&bytes)
            .map_err(|e| RelayError::Call(format!("Malformed JSON-RPC response: {e}")))
    }

    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> RelayResult<()> {
        let msg = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params.unwrap_or(serde_json::json!({})),
        });
        self.post(&msg).await?;
        Ok(())
    }

    async fn set_protocol_version(&self, version: &str) {
        *self.protocol_version.lock().await = Some(version.to_string());
    }

    async fn close(&self) -> RelayResult<()> {
        let Some(id) = self.session_id.lock().await.take() else {
            return Ok(());
        };

        let resp = self
            .http
            .delete(&self.endpoint)
            .header(SESSION_ID_HEADER, id)
            .send()
            .await
            .map_err(|e| RelayError::Http(e.to_string()))?;

        if !resp.status().is_success() {
            debug!(status = %resp.status(), "Upstream declined session termination");
        }
        Ok(())
    }
}

/// Read SSE events until the response for `id` shows up.
async fn read_event_stream(resp: reqwest::Response, id: u64) -> RelayResult<JsonRpcResponse> {
    let mut stream = resp.bytes_stream();
    let mut decoder = SseDecoder::default();

    while let Some(chunk) = stream.next().await {
        let chunk = chunk.map_err(|e| RelayError::Http(format!("Stream read error: {e}")))?;
        for data in decoder.push(&chunk) {
            if let Some(resp) = match_response(&data, id) {
                return Ok(resp);
            }
        }
    }

    if let Some(resp) = decoder.finish().and_then(|data| match_response(&data, id)) {
        return Ok(resp);
    }

    Err(RelayError::Call(format!(
        "Upstream closed the event stream before answering request {id}"
    )))
}

/// Parse one event payload, keeping it only if it answers request `id`.
fn match_response(data: &str, id: u64) -> Option<JsonRpcResponse> {
    let value: serde_json::Value = match serde_json::from_str(data) {
        Ok(v) => v,
        Err(e) => {
            debug!(error = %e, "Ignoring non-JSON SSE event");
            return None;
        }
    };

    // Server-initiated requests and notifications carry a method.
    if value.get("method").is_some() {
        return None;
    }

    serde_json::from_value::<JsonRpcResponse>(value)
        .ok()
        .filter(|resp| resp.id == Some(id))
}

/// Incremental `text/event-stream` decoder yielding each event's data.
#[derive(Default)]
struct SseDecoder {
    buffer: Vec<u8>,
    data: Vec<String>,
}

impl SseDecoder {
    fn push(&mut self, chunk: &[u8]) -> Vec<String> {
        self.buffer.extend_from_slice(chunk);

        let mut events = Vec::new();
        while let Some(pos) = self.buffer.iter().position(|b| *b == b'\n') {
            let raw: Vec<u8> = self.buffer.drain(..=pos).collect();
            let line = String::from_utf8_lossy(&raw);
            if let Some(event) = self.line(line.trim_end_matches(['\n', '\r'])) {
                events.push(event);
            }
        }
        events
    }

    /// Flush whatever is left once the stream ends.
    fn finish(&mut self) -> Option<String> {
        if !self.buffer.is_empty() {
            let raw = std::mem::take(&mut self.buffer);
            let line = String::from_utf8_lossy(&raw).into_owned();
            if let Some(event) = self.line(line.trim_end_matches('\r')) {
                return Some(event);
            }
        }
        self.dispatch()
    }

    fn line(&mut self, line: &str) -> Option<String> {
        if line.is_empty() {
            return self.dispatch();
        }
        if line.starts_with(':') {
            return None;
        }

        let (field, value) = match line.split_once(':') {
            Some((field, value)) => (field, value.strip_prefix(' ').unwrap_or(value)),
            None => (line, ""),
        };
        if field == "data" {
            self.data.push(value.to_string());
        }
        None
    }

    fn dispatch(&mut self) -> Option<String> {
        if self.data.is_empty() {
            return None;
        }
        let data = self.data.join("\n");
        self.data.clear();
        Some(data)
    }
}
