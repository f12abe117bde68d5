use super::{finish, parse_args, relay};
use crate::context::RelayContext;
use crate::tool::{Tool, ToolDescriptor};
use async_trait::async_trait;
use docrelay_core::{RelayResult, ToolCall, ToolResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const NAME: &str = "recommend";
const UPSTREAM: &str = "aws___recommend";
const ERROR_LABEL: &str = "Error getting recommendations";

#[derive(Debug, Deserialize)]
struct RecommendArgs {
    url: String,
}

/// Related-content recommendations for a documentation page.
pub struct RecommendTool {
    descriptor: ToolDescriptor,
    context: Arc<RelayContext>,
}

impl RecommendTool {
    pub fn new(context: Arc<RelayContext>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: NAME.to_string(),
                description: "Get content recommendations for AWS documentation pages".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "URL of the documentation page"
                        }
                    },
                    "required": ["url"]
                }),
            },
            context,
        }
    }
}

#[async_trait]
impl Tool for RecommendTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> RelayResult<ToolResult> {
        let outcome = match parse_args::<RecommendArgs>(call.arguments) {
            Ok(args) => {
                let mut arguments = Map::new();
                arguments.insert("url".into(), Value::String(args.url));
                relay(&self.context, UPSTREAM, arguments).await
            }
            Err(e) => Err(e),
        };
        Ok(finish(&call.id, NAME, ERROR_LABEL, outcome))
    }
}
