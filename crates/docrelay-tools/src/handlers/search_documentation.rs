use super::{finish, parse_args, relay};
use crate::context::RelayContext;
use crate::tool::{Tool, ToolDescriptor};
use async_trait::async_trait;
use docrelay_core::{RelayResult, ToolCall, ToolResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const NAME: &str = "search_documentation";
const UPSTREAM: &str = "aws___search_documentation";
const ERROR_LABEL: &str = "Error searching documentation";

#[derive(Debug, Deserialize)]
struct SearchArgs {
    query: String,
    #[serde(default)]
    topics: Option<Vec<String>>,
}

/// The upstream names the query `search_phrase`.
fn upstream_arguments(args: SearchArgs) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("search_phrase".into(), Value::String(args.query));
    if let Some(topics) = args.topics.filter(|t| !t.is_empty()) {
        out.insert(
            "topics".into(),
            Value::Array(topics.into_iter().map(Value::String).collect()),
        );
    }
    out
}

/// Full-text search across AWS documentation.
pub struct SearchDocumentationTool {
    descriptor: ToolDescriptor,
    context: Arc<RelayContext>,
}

impl SearchDocumentationTool {
    pub fn new(context: Arc<RelayContext>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: NAME.to_string(),
                description: "Search across all AWS documentation with optional topic-based filtering"
                    .to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "query": {
                            "type": "string",
                            "description": "Search phrase"
                        },
                        "topics": {
                            "type": "array",
                            "items": {"type": "string"},
                            "description": "Optional topics to narrow the search"
                        }
                    },
                    "required": ["query"]
                }),
            },
            context,
        }
    }
}

#[async_trait]
impl Tool for SearchDocumentationTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> RelayResult<ToolResult> {
        let outcome = match parse_args::<SearchArgs>(call.arguments) {
            Ok(args) => relay(&self.context, UPSTREAM, upstream_arguments(args)).await,
            Err(e) => Err(e),
        };
        Ok(finish(&call.id, NAME, ERROR_LABEL, outcome))
    }
}
