use super::{finish, parse_args, relay};
use crate::context::RelayContext;
use crate::tool::{Tool, ToolDescriptor};
use async_trait::async_trait;
use docrelay_core::{RelayResult, ToolCall, ToolResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const NAME: &str = "read_documentation";
const UPSTREAM: &str = "aws___read_documentation";
const ERROR_LABEL: &str = "Error reading documentation";

#[derive(Debug, Deserialize)]
struct ReadArgs {
    url: String,
    #[serde(default)]
    start_index: Option<i64>,
    #[serde(default)]
    max_length: Option<i64>,
}

fn upstream_arguments(args: ReadArgs) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert("url".into(), Value::String(args.url));
    if let Some(start_index) = args.start_index {
        out.insert("start_index".into(), start_index.into());
    }
    if let Some(max_length) = args.max_length {
        out.insert("max_length".into(), max_length.into());
    }
    out
}

/// Fetches one AWS documentation page as markdown.
pub struct ReadDocumentationTool {
    descriptor: ToolDescriptor,
    context: Arc<RelayContext>,
}

impl ReadDocumentationTool {
    pub fn new(context: Arc<RelayContext>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: NAME.to_string(),
                description: "Retrieve and convert AWS documentation pages to markdown".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "url": {
                            "type": "string",
                            "description": "URL of the documentation page"
                        },
                        "start_index": {
                            "type": "integer",
                            "description": "Character offset to start reading from"
                        },
                        "max_length": {
                            "type": "integer",
                            "description": "Maximum number of characters to return"
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
impl Tool for ReadDocumentationTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> RelayResult<ToolResult> {
        let outcome = match parse_args::<ReadArgs>(call.arguments) {
            Ok(args) => relay(&self.context, UPSTREAM, upstream_arguments(args)).await,
            Err(e) => Err(e),
        };
        Ok(finish(&call.id, NAME, ERROR_LABEL, outcome))
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_url_only() {
        let args = parse_args::<ReadArgs>(json!({"url": "https://docs.aws.amazon.com/s3/"})).unwrap();
        let out = upstream_arguments(args);
        assert_eq!(out.len(), 1);
        assert_eq!(out["url"], "https://docs.aws.amazon.com/s3/");
    }

    #[test]
    fn test_optionals_passed_through_when_present() {
        let args = parse_args::<ReadArgs>(json!({
            "url": "https://docs.aws.amazon.com/s3/",
            "start_index": 0,
            "max_length": 5000
        }))
        .unwrap();
        let out = upstream_arguments(args);
        assert_eq!(out["start_index"], 0);
        assert_eq!(out["max_length"], 5000);
    }

    #[test]
    fn test_null_optionals_omitted() {
        let args = parse_args::<ReadArgs>(json!({
            "url": "https://docs.aws.amazon.com/s3/",
            "start_index": null
        }))
        .unwrap();
        assert!(!upstream_arguments(args).contains_key("start_index"));
    }

    #[test]
    fn test_non_integer_length_rejected() {
        assert!(parse_args::<ReadArgs>(json!({"url": "u", "max_length": "lots"})).is_err());
    }
}
