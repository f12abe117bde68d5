//! The five relayed tools.
//!
//! Each handler maps caller arguments onto the upstream tool's argument set,
//! makes one call through a fresh [`ConnectionScope`], and renders the reply
//! with [`format_content`]. Every failure is turned into text carrying a
//! tool-specific prefix.

mod list_regions;
mod read_documentation;
mod recommend;
mod regional_availability;
mod search_documentation;

pub use list_regions::ListRegionsTool;
pub use read_documentation::ReadDocumentationTool;
pub use recommend::RecommendTool;
pub use regional_availability::{normalize_filters, Filters, RegionalAvailabilityTool, ResourceType};
pub use search_documentation::SearchDocumentationTool;

use crate::context::RelayContext;
use crate::registry::ToolRegistry;
use docrelay_core::{RelayError, RelayResult, ToolResult};
use docrelay_mcp::{format_content, ConnectionScope};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::sync::Arc;
use tracing::{debug, warn};

/// Register every relayed tool against one shared context.
pub fn register_all(registry: &mut ToolRegistry, context: Arc<RelayContext>) {
    registry.register(Arc::new(SearchDocumentationTool::new(context.clone())));
    registry.register(Arc::new(ReadDocumentationTool::new(context.clone())));
    registry.register(Arc::new(RecommendTool::new(context.clone())));
    registry.register(Arc::new(ListRegionsTool::new(context.clone())));
    registry.register(Arc::new(RegionalAvailabilityTool::new(context)));
}

/// Deserialize caller arguments into a handler's typed input.
pub(crate) fn parse_args<T: DeserializeOwned>(arguments: Value) -> RelayResult<T> {
    serde_json::from_value(arguments).map_err(|e| RelayError::InvalidArguments(e.to_string()))
}

/// Make one upstream call in its own session and render the content.
pub(crate) async fn relay(
    context: &RelayContext,
    upstream_tool: &'static str,
    arguments: Map<String, Value>,
) -> RelayResult<String> {
    let result = ConnectionScope::run(context.connector(), move |session| {
        Box::pin(session.call_tool(upstream_tool, arguments))
    })
    .await?;

    if result.is_error {
        debug!(tool = %upstream_tool, "Upstream flagged its result as an error");
    }
    Ok(format_content(&result.content))
}

/// Collapse a handler outcome into the result handed back to the caller.
pub(crate) fn finish(
    call_id: &str,
    tool: &str,
    error_label: &str,
    outcome: RelayResult<String>,
) -> ToolResult {
    match outcome {
        Ok(text) => ToolResult::success(call_id, text),
        Err(e) => {
            warn!(tool = %tool, error = %e, "Tool invocation failed");
            ToolResult::error(call_id, format!("{error_label}: {e}"))
        }
    }
}
