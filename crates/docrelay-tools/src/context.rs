use docrelay_mcp::{Connector, HttpConnector};
use std::sync::Arc;
use std::time::Duration;

/// Default AWS Knowledge MCP endpoint.
pub const DEFAULT_ENDPOINT: &str = "https://knowledge-mcp.global.api.aws";

/// Default per-request timeout for upstream calls.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// Process-wide state shared by every tool handler.
///
/// Built once at startup. It knows where the upstream lives but never holds a
/// live connection; each invocation opens its own.
pub struct RelayContext {
    connector: Arc<dyn Connector>,
}

impl RelayContext {
    pub fn new(connector: Arc<dyn Connector>) -> Self {
        Self { connector }
    }

    /// Context for a streamable HTTP upstream.
    pub fn http(endpoint: impl Into<String>, timeout: Duration) -> Self {
        Self::new(Arc::new(HttpConnector::new(endpoint, timeout)))
    }

    pub fn connector(&self) -> &dyn Connector {
        self.connector.as_ref()
    }

    pub fn endpoint(&self) -> &str {
        self.connector.endpoint()
    }
}

impl Default for RelayContext {
    fn default() -> Self {
        Self::http(DEFAULT_ENDPOINT, DEFAULT_TIMEOUT)
    }
}
