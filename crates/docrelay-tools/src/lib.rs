//! Tool layer for docrelay.
//!
//! Defines the [`Tool`] trait, the [`ToolRegistry`] that routes calls by
//! name, and the five handlers that relay to the upstream knowledge server.

pub mod context;
pub mod handlers;
pub mod registry;
pub mod tool;

pub use context::{RelayContext, DEFAULT_ENDPOINT, DEFAULT_TIMEOUT};
pub use handlers::register_all;
pub use registry::ToolRegistry;
pub use tool::{Tool, ToolDescriptor};
