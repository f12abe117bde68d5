use async_trait::async_trait;
use docrelay_core::{RelayResult, ToolCall, ToolResult};
use serde::{Deserialize, Serialize};

/// Metadata describing a tool's interface, as advertised to clients.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub parameters_schema: serde_json::Value,
}

/// Trait that every exposed tool implements.
///
/// Relay tools never fail structurally: upstream and argument problems come
/// back as an error [`ToolResult`] whose content explains what went wrong.
/// An `Err` is reserved for the dispatcher itself.
#[async_trait]
pub trait Tool: Send + Sync {
    fn descriptor(&self) -> &ToolDescriptor;

    async fn execute(&self, call: ToolCall) -> RelayResult<ToolResult>;
}
