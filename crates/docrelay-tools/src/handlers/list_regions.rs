use super::{finish, relay};
use crate::context::RelayContext;
use crate::tool::{Tool, ToolDescriptor};
use async_trait::async_trait;
use docrelay_core::{RelayResult, ToolCall, ToolResult};
use serde_json::Map;
use std::sync::Arc;

const NAME: &str = "list_regions";
const UPSTREAM: &str = "aws___list_regions";
const ERROR_LABEL: &str = "Error listing regions";

/// Lists every AWS region with its identifier and name. Takes no arguments.
pub struct ListRegionsTool {
    descriptor: ToolDescriptor,
    context: Arc<RelayContext>,
}

impl ListRegionsTool {
    pub fn new(context: Arc<RelayContext>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: NAME.to_string(),
                description:
                    "Retrieve a list of all AWS regions, including their identifiers and names"
                        .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {}
                }),
            },
            context,
        }
    }
}

#[async_trait]
impl Tool for ListRegionsTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> RelayResult<ToolResult> {
        let outcome = relay(&self.context, UPSTREAM, Map::new()).await;
        Ok(finish(&call.id, NAME, ERROR_LABEL, outcome))
    }
}
