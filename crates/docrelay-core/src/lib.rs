//! Core types and error definitions for the docrelay workspace.
//!
//! This crate provides the foundational types shared across all docrelay crates,
//! including error handling and the tool call abstractions used by the local
//! dispatcher.
//!
//! # Main types
//!
//! - [`RelayError`]: Unified error enum for every relay subsystem.
//! - [`RelayResult`]: Convenience alias for `Result<T, RelayError>`.
//! - [`ToolCall`]: An inbound request to invoke one exposed tool.
//! - [`ToolResult`]: The text produced by a tool invocation.

use serde::{Deserialize, Serialize};

// --- Error types ---

/// JSON-RPC 2.0 error code for malformed JSON.
pub const PARSE_ERROR: i64 = -32700;
/// JSON-RPC 2.0 error code for a structurally invalid request.
pub const INVALID_REQUEST: i64 = -32600;
/// JSON-RPC 2.0 error code for an unknown method.
pub const METHOD_NOT_FOUND: i64 = -32601;
/// JSON-RPC 2.0 error code for invalid method parameters.
pub const INVALID_PARAMS: i64 = -32602;
/// JSON-RPC 2.0 error code for an internal failure.
pub const INTERNAL_ERROR: i64 = -32603;

/// Top-level error type for the relay.
///
/// Errors stay structured inside the workspace and are collapsed to text only
/// at the tool handler boundary.
#[derive(Debug, thiserror::Error)]
pub enum RelayError {
    /// The upstream transport or session handshake could not be established.
    #[error("Connection Error: {0}")]
    Connection(String),

    /// The upstream call failed after the session was established.
    #[error("{0}")]
    Call(String),

    /// The upstream answered with a JSON-RPC error object.
    #[error("MCP error {code}: {message}")]
    Upstream {
        /// JSON-RPC error code reported by the upstream.
        code: i64,
        /// Human-readable message reported by the upstream.
        message: String,
    },

    /// Caller-supplied tool arguments could not be parsed or validated.
    #[error("Invalid arguments: {0}")]
    InvalidArguments(String),

    /// The dispatcher has no tool registered under this name.
    #[error("Unknown tool: {0}")]
    UnknownTool(String),

    /// An error from an outbound HTTP request.
    #[error("HTTP error: {0}")]
    Http(String),

    /// An error in configuration parsing or validation.
    #[error("Config error: {0}")]
    Config(String),

    /// A JSON serialization or deserialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// A standard I/O error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl RelayError {
    /// The JSON-RPC error code this error maps to when reported over the wire.
    pub fn code(&self) -> i64 {
        match self {
            RelayError::Upstream { code, .. } => *code,
            RelayError::InvalidArguments(_) | RelayError::UnknownTool(_) => INVALID_PARAMS,
            RelayError::Json(_) => PARSE_ERROR,
            _ => INTERNAL_ERROR,
        }
    }
}

/// A convenience `Result` alias using [`RelayError`].
pub type RelayResult<T> = Result<T, RelayError>;

// --- Tool types ---

/// A request from a connected client to invoke a specific tool.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolCall {
    /// Identifier of the request that carried this call.
    pub id: String,
    /// Name of the tool to invoke.
    pub name: String,
    /// JSON arguments to pass to the tool.
    pub arguments: serde_json::Value,
}

impl ToolCall {
    /// Creates a tool call, treating `null` arguments as an empty object.
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        arguments: serde_json::Value,
    ) -> Self {
        let arguments = if arguments.is_null() {
            serde_json::Value::Object(serde_json::Map::new())
        } else {
            arguments
        };
        Self {
            id: id.into(),
            name: name.into(),
            arguments,
        }
    }
}

/// The result returned after executing a [`ToolCall`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolResult {
    /// The ID of the [`ToolCall`] this result corresponds to.
    pub call_id: String,
    /// The textual output produced by the tool.
    pub content: String,
    /// Whether the tool execution ended in an error.
    pub is_error: bool,
}

impl ToolResult {
    /// Creates a successful tool result.
    pub fn success(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: false,
        }
    }

    /// Creates an error tool result.
    pub fn error(call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            call_id: call_id.into(),
            content: content.into(),
            is_error: true,
        }
    }
}
