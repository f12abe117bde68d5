//! Upstream MCP sessions and the scope that owns them.
//!
//! A [`ScopedSession`] lives for exactly one tool invocation. It is created by
//! [`ConnectionScope::acquire`], which opens a transport and performs the
//! `initialize` handshake, and it is torn down by
//! [`ScopedSession::release`]. If the owning future is dropped before
//! `release` runs, `Drop` hands the transport close to the runtime so the
//! connection never leaks.

use crate::protocol::*;
use crate::transport::{Connector, Transport};
use docrelay_core::{RelayError, RelayResult};
use futures_util::future::BoxFuture;
use std::ops::Deref;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// An initialized MCP session on top of one transport.
pub struct UpstreamSession {
    transport: Arc<dyn Transport>,
    next_id: AtomicU64,
    server: Option<InitializeResult>,
}

impl UpstreamSession {
    fn new(transport: Box<dyn Transport>) -> Self {
        Self {
            transport: Arc::from(transport),
            next_id: AtomicU64::new(1),
            server: None,
        }
    }

    /// Send a JSON-RPC request and return its `result`.
    async fn request(
        &self,
        method: &str,
        params: Option<serde_json::Value>,
    ) -> RelayResult<serde_json::Value> {
        let id = self.next_id.fetch_add(1, Ordering::SeqCst);
        let resp = self
            .transport
            .request(JsonRpcRequest::new(id, method, params))
            .await?;

        if let Some(err) = resp.error {
            return Err(RelayError::Upstream {
                code: err.code,
                message: err.message,
            });
        }

        resp.result
            .ok_or_else(|| RelayError::Call(format!("Empty {method} result")))
    }

    /// Perform the MCP initialize handshake.
    async fn initialize(&mut self) -> RelayResult<()> {
        let params = serde_json::json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {},
            "clientInfo": {
                "name": "docrelay",
                "version": env!("CARGO_PKG_VERSION")
            }
        });

        let result = self.request("initialize", Some(params)).await?;
        let result: InitializeResult = serde_json::from_value(result)
            .map_err(|e| RelayError::Call(format!("Failed to parse initialize result: {e}")))?;

        self.transport
            .set_protocol_version(&result.protocol_version)
            .await;
        self.transport
            .notify("notifications/initialized", None)
            .await?;

        self.server = Some(result);
        Ok(())
    }

    /// Call a tool on the upstream server.
    pub async fn call_tool(
        &self,
        name: &str,
        arguments: serde_json::Map<String, serde_json::Value>,
    ) -> RelayResult<McpToolResult> {
        let params = serde_json::json!({
            "name": name,
            "arguments": arguments,
        });

        let result = self.request("tools/call", Some(params)).await?;
        serde_json::from_value(result)
            .map_err(|e| RelayError::Call(format!("Failed to parse tool result: {e}")))
    }

    /// What the upstream reported about itself during `initialize`.
    pub fn server(&self) -> Option<&InitializeResult> {
        self.server.as_ref()
    }

    async fn close(&self) {
        if let Err(e) = self.transport.close().await {
            warn!(error = %e, "Failed to close upstream transport");
        }
    }
}

/// Acquires one upstream session per tool invocation.
pub struct ConnectionScope;

impl ConnectionScope {
    /// Open a transport and initialize a session on it.
    ///
    /// Any failure closes what was already opened and surfaces as a single
    /// [`RelayError::Connection`] carrying the original cause.
    pub async fn acquire(connector: &dyn Connector) -> RelayResult<ScopedSession> {
        let transport = connector.connect().await.map_err(|e| {
            error!(endpoint = %connector.endpoint(), error = %e, "Failed to open upstream transport");
            connection_error(e)
        })?;

        // Guarded from here on, so a cancelled handshake still closes the transport.
        let mut scoped = ScopedSession {
            session: UpstreamSession::new(transport),
            released: false,
        };
        if let Err(e) = scoped.session.initialize().await {
            scoped.release().await;
            error!(endpoint = %connector.endpoint(), error = %e, "Failed to connect to upstream MCP");
            return Err(connection_error(e));
        }

        if let Some(info) = scoped.server().and_then(|s| s.server_info.as_ref()) {
            debug!(server = %info.name, version = %info.version, "Upstream session ready");
        }

        Ok(scoped)
    }

    /// Acquire a session, run `body` against it, and release it.
    ///
    /// The session is released whatever `body` returns.
    pub async fn run<T, F>(connector: &dyn Connector, body: F) -> RelayResult<T>
    where
        F: for<'s> FnOnce(&'s UpstreamSession) -> BoxFuture<'s, RelayResult<T>>,
    {
        let scoped = Self::acquire(connector).await?;
        let outcome = body(&*scoped).await;
        scoped.release().await;
        outcome
    }
}

fn connection_error(e: RelayError) -> RelayError {
    match e {
        RelayError::Connection(cause) => RelayError::Connection(cause),
        other => RelayError::Connection(other.to_string()),
    }
}

/// A session owned by one invocation. Released exactly once.
pub struct ScopedSession {
    session: UpstreamSession,
    released: bool,
}

impl ScopedSession {
    /// Close the underlying transport.
    pub async fn release(mut self) {
        self.released = true;
        self.session.close().await;
    }
}

impl Deref for ScopedSession {
    type Target = UpstreamSession;

    fn deref(&self) -> &UpstreamSession {
        &self.session
    }
}

impl Drop for ScopedSession {
    fn drop(&mut self) {
        if self.released {
            return;
        }

        let transport = self.session.transport.clone();
        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                info!("Upstream session dropped before release, closing in background");
                handle.spawn(async move {
                    if let Err(e) = transport.close().await {
                        warn!(error = %e, "Failed to close abandoned upstream transport");
                    }
                });
            }
            Err(_) => {
                warn!("Upstream session dropped outside a runtime, transport not closed");
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::testing::{StubConnector, StubReply};
    use std::time::Duration;

    fn args(value: serde_json::Value) -> serde_json::Map<String, serde_json::Value> {
        value.as_object().cloned().unwrap()
    }

    #[tokio::test]
    async fn test_acquire_call_release() {
        let stub = StubConnector::text("hello");
        let scoped = ConnectionScope::acquire(&stub).await.unwrap();
        assert_eq!(
            scoped.server().unwrap().server_info.as_ref().unwrap().name,
            "stub-upstream"
        );

        let result = scoped
            .call_tool("aws___recommend", args(serde_json::json!({"url": "https://x"})))
            .await
            .unwrap();
        assert_eq!(
            result.content,
            vec![ContentBlock::Text {
                text: "hello".to_string()
            }]
        );

        assert_eq!(stub.closed(), 0);
        scoped.release().await;
        assert_eq!(stub.opened(), 1);
        assert_eq!(stub.closed(), 1);
    }

    #[tokio::test]
    async fn test_connect_failure_is_connection_error() {
        let stub = StubConnector::text("unused").refuse_connect("dns lookup failed");
        let err = ConnectionScope::acquire(&stub).await.err().unwrap();
        assert!(matches!(err, RelayError::Connection(_)));
        assert_eq!(err.to_string(), "Connection Error: HTTP error: dns lookup failed");
        assert_eq!(err.code(), docrelay_core::INTERNAL_ERROR);
        assert_eq!(stub.opened(), 0);
        assert_eq!(stub.closed(), 0);
    }

    #[tokio::test]
    async fn test_handshake_failure_closes_transport() {
        let stub = StubConnector::text("unused").refuse_initialize("handshake rejected");
        let err = ConnectionScope::acquire(&stub).await.err().unwrap();
        assert_eq!(err.to_string(), "Connection Error: HTTP error: handshake rejected");
        assert_eq!(stub.opened(), 1);
        assert_eq!(stub.closed(), 1);
        assert!(stub.calls().is_empty());
    }

    #[tokio::test]
    async fn test_run_releases_after_call_failure() {
        let stub = StubConnector::new(StubReply::Dropped("connection reset".to_string()));
        let err = ConnectionScope::run(&stub, |session| {
            Box::pin(session.call_tool("aws___list_regions", serde_json::Map::new()))
        })
        .await
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "HTTP error: connection reset");
        assert_eq!(stub.opened(), 1);
        assert_eq!(stub.closed(), 1);
    }

    #[tokio::test]
    async fn test_run_surfaces_upstream_rpc_error() {
        let stub = StubConnector::new(StubReply::RpcError {
            code: -32602,
            message: "Unknown tool".to_string(),
        });
        let err = ConnectionScope::run(&stub, |session| {
            Box::pin(session.call_tool("aws___nope", serde_json::Map::new()))
        })
        .await
        .err()
        .unwrap();
        assert!(matches!(err, RelayError::Upstream { code: -32602, .. }));
        assert_eq!(stub.closed(), stub.opened());
    }

    #[tokio::test]
    async fn test_each_acquire_opens_its_own_transport() {
        let stub = StubConnector::text("{}");
        let call = |stub: StubConnector| async move {
            ConnectionScope::run(&stub, |session| {
                Box::pin(session.call_tool("aws___list_regions", serde_json::Map::new()))
            })
            .await
        };
        let (a, b) = tokio::join!(call(stub.clone()), call(stub.clone()));
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert_eq!(stub.opened(), 2);
        assert_eq!(stub.closed(), 2);
        assert_eq!(stub.calls().len(), 2);
    }

    #[tokio::test]
    async fn test_cancelled_invocation_still_closes() {
        let stub = StubConnector::text("late").delay_calls(Duration::from_secs(30));
        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            ConnectionScope::run(&stub, |session| {
                Box::pin(session.call_tool("aws___list_regions", serde_json::Map::new()))
            }),
        )
        .await;
        assert!(outcome.is_err());

        // The close was spawned from Drop; give it a turn to run.
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(stub.opened(), 1);
        assert_eq!(stub.closed(), 1);
    }

    #[tokio::test]
    async fn test_close_failure_does_not_mask_call_error() {
        let stub = StubConnector::new(StubReply::RpcError {
            code: -32000,
            message: "throttled".to_string(),
        })
        .fail_close("socket already gone");
        let err = ConnectionScope::run(&stub, |session| {
            Box::pin(session.call_tool("aws___list_regions", serde_json::Map::new()))
        })
        .await
        .err()
        .unwrap();
        assert_eq!(err.to_string(), "MCP error -32000: throttled");
        assert_eq!(stub.opened(), 1);
        assert_eq!(stub.closed(), 1);
    }

    #[tokio::test]
    async fn test_close_failure_after_success_keeps_result() {
        let stub = StubConnector::text("fine").fail_close("socket already gone");
        let result = ConnectionScope::run(&stub, |session| {
            Box::pin(session.call_tool("aws___recommend", serde_json::Map::new()))
        })
        .await
        .unwrap();
        assert_eq!(result.content.len(), 1);
        assert_eq!(stub.closed(), 1);
    }

    #[tokio::test]
    async fn test_handshake_failure_with_failing_close_reports_handshake() {
        let stub = StubConnector::text("unused")
            .refuse_initialize("handshake rejected")
            .fail_close("socket already gone");
        let err = ConnectionScope::acquire(&stub).await.err().unwrap();
        assert_eq!(err.to_string(), "Connection Error: HTTP error: handshake rejected");
        assert_eq!(stub.closed(), 1);
    }

    #[tokio::test]
    async fn test_cancelled_invocation_with_failing_close() {
        let stub = StubConnector::text("late")
            .delay_calls(Duration::from_secs(30))
            .fail_close("socket already gone");
        let outcome = tokio::time::timeout(
            Duration::from_millis(50),
            ConnectionScope::run(&stub, |session| {
                Box::pin(session.call_tool("aws___list_regions", serde_json::Map::new()))
            }),
        )
        .await;
        assert!(outcome.is_err());

        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(stub.closed(), 1);
    }

    #[tokio::test]
    async fn test_release_is_not_repeated_on_drop() {
        let stub = StubConnector::text("x");
        let scoped = ConnectionScope::acquire(&stub).await.unwrap();
        scoped.release().await;
        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(stub.closed(), 1);
    }
}
