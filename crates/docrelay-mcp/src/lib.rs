//! MCP client side of the relay.
//!
//! - [`protocol`]: JSON-RPC 2.0 and MCP message types.
//! - [`normalize`]: renders upstream content blocks as display text.
//! - [`transport`]: the [`Transport`] / [`Connector`] seam.
//! - [`http`]: streamable HTTP transport to a remote MCP server.
//! - [`session`]: per-invocation session lifecycle ([`ConnectionScope`]).

pub mod http;
pub mod normalize;
pub mod protocol;
pub mod session;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transport;

pub use http::HttpConnector;
pub use normalize::format_content;
pub use protocol::{ContentBlock, McpToolDef, McpToolResult};
pub use session::{ConnectionScope, ScopedSession, UpstreamSession};
pub use transport::{Connector, Transport};
