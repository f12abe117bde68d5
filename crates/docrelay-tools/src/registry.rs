use crate::tool::{Tool, ToolDescriptor};
use docrelay_core::{RelayError, RelayResult, ToolCall, ToolResult};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tracing::info;

/// Central registry for all exposed tools. Routes calls by name.
pub struct ToolRegistry {
    tools: HashMap<String, Arc<dyn Tool>>,
    order: Vec<String>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
            order: Vec::new(),
        }
    }

    /// Register a tool. A tool with the same name replaces the earlier one.
    pub fn register(&mut self, tool: Arc<dyn Tool>) {
        let name = tool.descriptor().name.clone();
        info!(tool = %name, "Registered tool");
        if self.tools.insert(name.clone(), tool).is_none() {
            self.order.push(name);
        }
    }

    /// Descriptors in registration order.
    pub fn list_descriptors(&self) -> Vec<&ToolDescriptor> {
        self.order
            .iter()
            .filter_map(|name| self.tools.get(name))
            .map(|t| t.descriptor())
            .collect()
    }

    /// Dispatch a call to the tool it names.
    pub async fn execute(&self, call: ToolCall) -> RelayResult<ToolResult> {
        let tool = self
            .tools
            .get(&call.name)
            .ok_or_else(|| RelayError::UnknownTool(call.name.clone()))?;

        let start = Instant::now();
        let tool_name = call.name.clone();
        let call_id = call.id.clone();

        info!(tool = %tool_name, call_id = %call_id, "Executing tool call");
        let result = tool.execute(call).await;

        let duration_ms = start.elapsed().as_millis() as u64;
        let success = matches!(&result, Ok(r) if !r.is_error);
        info!(
            tool = %tool_name,
            call_id = %call_id,
            duration_ms = duration_ms,
            success = success,
            "Tool call complete"
        );

        result
    }

    pub fn tool_count(&self) -> usize {
        self.tools.len()
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}
