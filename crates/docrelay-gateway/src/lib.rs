//! Local MCP server for docrelay.
//!
//! [`McpServer`] dispatches JSON-RPC over the tool registry; [`GatewayServer`]
//! mounts it on HTTP (plain JSON and server-sent events) and [`serve_stdio`]
//! runs it over stdin/stdout.

pub mod dispatch;
pub mod server;
pub mod sse;
pub mod stdio;

pub use dispatch::{McpServer, RpcReply};
pub use server::GatewayServer;
pub use stdio::serve_stdio;
