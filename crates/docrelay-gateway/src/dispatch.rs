//! JSON-RPC dispatcher for the local MCP server.
//!
//! Transport agnostic: the HTTP endpoint and the stdio loop both hand raw
//! messages to [`McpServer`] and write back whatever reply it produces.

use docrelay_core::{
    RelayError, ToolCall, INVALID_PARAMS, INVALID_REQUEST, METHOD_NOT_FOUND, PARSE_ERROR,
};
use docrelay_mcp::protocol::{JsonRpcError, McpToolDef, PROTOCOL_VERSION};
use docrelay_tools::ToolRegistry;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::sync::Arc;
use tracing::{debug, info, warn};

/// Name this server reports in `initialize`.
pub const SERVER_NAME: &str = "docrelay";

/// An inbound JSON-RPC message. A missing `id` marks a notification.
#[derive(Debug, Deserialize)]
struct RpcMessage {
    #[serde(default)]
    id: Option<Value>,
    method: String,
    #[serde(default)]
    params: Option<Value>,
}

/// Outbound JSON-RPC response. Ids are echoed verbatim, numeric or string.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RpcReply {
    pub jsonrpc: String,
    pub id: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

impl RpcReply {
    fn result(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: Some(result),
            error: None,
        }
    }

    fn error(id: Value, code: i64, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: "2.0".to_string(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }

    pub fn is_error(&self) -> bool {
        self.error.is_some()
    }
}

#[derive(Debug, Deserialize)]
struct CallParams {
    name: String,
    #[serde(default)]
    arguments: Value,
}

/// MCP server over a [`ToolRegistry`].
pub struct McpServer {
    registry: Arc<ToolRegistry>,
}

impl McpServer {
    pub fn new(registry: Arc<ToolRegistry>) -> Self {
        Self { registry }
    }

    /// Handle one raw message. Returns `None` for notifications.
    pub async fn handle_text(&self, raw: &str) -> Option<RpcReply> {
        match serde_json::from_str::<Value>(raw) {
            Ok(value) => self.handle_value(value).await,
            Err(e) => {
                warn!(error = %e, "Rejected unparseable JSON-RPC message");
                Some(RpcReply::error(
                    Value::Null,
                    PARSE_ERROR,
                    format!("Parse error: {e}"),
                ))
            }
        }
    }

    /// Handle one decoded message. Returns `None` for notifications.
    pub async fn handle_value(&self, value: Value) -> Option<RpcReply> {
        let fallback_id = value.get("id").cloned().unwrap_or(Value::Null);
        let message: RpcMessage = match serde_json::from_value(value) {
            Ok(m) => m,
            Err(e) => {
                return Some(RpcReply::error(
                    fallback_id,
                    INVALID_REQUEST,
                    format!("Invalid request: {e}"),
                ))
            }
        };

        let Some(id) = message.id else {
            debug!(method = %message.method, "Notification acknowledged");
            return None;
        };

        Some(self.dispatch(id, &message.method, message.params).await)
    }

    async fn dispatch(&self, id: Value, method: &str, params: Option<Value>) -> RpcReply {
        match method {
            "initialize" => RpcReply::result(id, self.initialize_result(params.as_ref())),
            "ping" => RpcReply::result(id, json!({})),
            "tools/list" => RpcReply::result(id, self.tools_list()),
            "tools/call" => self.tools_call(id, params).await,
            other => {
                debug!(method = %other, "Unknown method");
                RpcReply::error(id, METHOD_NOT_FOUND, format!("Method not found: {other}"))
            }
        }
    }

    fn initialize_result(&self, params: Option<&Value>) -> Value {
        if let Some(client) = params.and_then(|p| p.get("clientInfo")) {
            info!(
                client = %client["name"].as_str().unwrap_or("unknown"),
                version = %client["version"].as_str().unwrap_or(""),
                "Client initialized"
            );
        }
        json!({
            "protocolVersion": PROTOCOL_VERSION,
            "capabilities": {
                "tools": {"listChanged": false}
            },
            "serverInfo": {
                "name": SERVER_NAME,
                "version": env!("CARGO_PKG_VERSION")
            }
        })
    }

    fn tools_list(&self) -> Value {
        let tools: Vec<McpToolDef> = self
            .registry
            .list_descriptors()
            .into_iter()
            .map(|d| McpToolDef {
                name: d.name.clone(),
                description: d.description.clone(),
                input_schema: d.parameters_schema.clone(),
            })
            .collect();
        json!({ "tools": tools })
    }

    async fn tools_call(&self, id: Value, params: Option<Value>) -> RpcReply {
        let params = match params.map(serde_json::from_value::<CallParams>).transpose() {
            Ok(Some(p)) => p,
            Ok(None) => return RpcReply::error(id, INVALID_PARAMS, "Missing params"),
            Err(e) => return RpcReply::error(id, INVALID_PARAMS, format!("Invalid params: {e}")),
        };

        let call_id = match &id {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        };
        let call = ToolCall::new(call_id, params.name, params.arguments);

        // A handler failure is already a readable diagnostic; clients get it
        // as ordinary tool output.
        match self.registry.execute(call).await {
            Ok(result) => {
                if result.is_error {
                    debug!(call_id = %result.call_id, "Tool answered with a failure message");
                }
                RpcReply::result(
                    id,
                    json!({
                        "content": [{"type": "text", "text": result.content}],
                        "isError": false
                    }),
                )
            }
            Err(e) => {
                if !matches!(e, RelayError::UnknownTool(_)) {
                    warn!(error = %e, "Tool dispatch failed");
                }
                RpcReply::error(id, e.code(), e.to_string())
            }
        }
    }
}
