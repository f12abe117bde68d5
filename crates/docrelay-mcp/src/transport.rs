use crate::protocol::{JsonRpcRequest, JsonRpcResponse};
use async_trait::async_trait;
use docrelay_core::RelayResult;

/// A bidirectional message channel to one upstream MCP server.
///
/// A transport carries raw JSON-RPC frames. It knows nothing about the MCP
/// handshake; that belongs to [`UpstreamSession`](crate::session::UpstreamSession).
#[async_trait]
pub trait Transport: Send + Sync {
    /// Send a request and wait for the response carrying the same id.
    async fn request(&self, request: JsonRpcRequest) -> RelayResult<JsonRpcResponse>;

    /// Send a notification. No response is expected.
    async fn notify(&self, method: &str, params: Option<serde_json::Value>) -> RelayResult<()>;

    /// Record the protocol revision agreed during `initialize`.
    async fn set_protocol_version(&self, _version: &str) {}

    /// Release everything the transport holds.
    async fn close(&self) -> RelayResult<()>;
}

/// Opens fresh transports to a fixed upstream endpoint.
///
/// Every call to [`connect`](Connector::connect) yields an independent
/// transport; nothing is pooled between calls.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Open a new transport.
    async fn connect(&self) -> RelayResult<Box<dyn Transport>>;

    /// Address of the upstream endpoint, for logging.
    fn endpoint(&self) -> &str;
}
