use super::{finish, parse_args, relay};
use crate::context::RelayContext;
use crate::tool::{Tool, ToolDescriptor};
use async_trait::async_trait;
use docrelay_core::{RelayResult, ToolCall, ToolResult};
use serde::Deserialize;
use serde_json::{Map, Value};
use std::sync::Arc;

const NAME: &str = "get_regional_availability";
const UPSTREAM: &str = "aws___get_regional_availability";
const ERROR_LABEL: &str = "Error checking availability";

/// Region queried when the caller does not name one.
pub const DEFAULT_REGION: &str = "us-east-1";

/// Kind of resource whose availability is checked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ResourceType {
    /// A product, e.g. `AWS Lambda`.
    Product,
    /// A service API, e.g. `EC2`.
    Api,
    /// A CloudFormation resource type, e.g. `AWS::EC2::Instance`.
    Cfn,
}

impl ResourceType {
    pub fn as_str(self) -> &'static str {
        match self {
            ResourceType::Product => "product",
            ResourceType::Api => "api",
            ResourceType::Cfn => "cfn",
        }
    }
}

/// Filters as callers send them: a list, or a string that may hold a JSON list.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Filters {
    List(Vec<String>),
    Text(String),
}

/// Resolve caller filters into the list sent upstream.
///
/// A string is decoded as JSON first; if that yields an array the array is
/// used, otherwise the string becomes a one-element list. An empty string
/// means no filters.
pub fn normalize_filters(filters: Option<Filters>) -> Vec<Value> {
    match filters {
        None => Vec::new(),
        Some(Filters::List(items)) => items.into_iter().map(Value::String).collect(),
        Some(Filters::Text(text)) if text.is_empty() => Vec::new(),
        Some(Filters::Text(text)) => match serde_json::from_str::<Value>(&text) {
            Ok(Value::Array(items)) => items,
            _ => vec![Value::String(text)],
        },
    }
}

#[derive(Debug, Deserialize)]
struct AvailabilityArgs {
    resource_type: ResourceType,
    #[serde(default)]
    region: Option<String>,
    #[serde(default)]
    filters: Option<Filters>,
}

fn upstream_arguments(args: AvailabilityArgs) -> Map<String, Value> {
    let mut out = Map::new();
    out.insert(
        "resource_type".into(),
        Value::String(args.resource_type.as_str().to_string()),
    );
    out.insert(
        "region".into(),
        Value::String(args.region.unwrap_or_else(|| DEFAULT_REGION.to_string())),
    );

    let filters = normalize_filters(args.filters);
    if !filters.is_empty() {
        out.insert("filters".into(), Value::Array(filters));
    }
    out
}

/// Checks which regions offer a product, API, or CloudFormation resource.
pub struct RegionalAvailabilityTool {
    descriptor: ToolDescriptor,
    context: Arc<RelayContext>,
}

impl RegionalAvailabilityTool {
    pub fn new(context: Arc<RelayContext>) -> Self {
        Self {
            descriptor: ToolDescriptor {
                name: NAME.to_string(),
                description: "Retrieve AWS regional availability information. resource_type must be one of: 'product' (e.g. 'AWS Lambda'), 'api' (e.g. 'EC2'), or 'cfn' (e.g. 'AWS::EC2::Instance'). filters is a list of specific resource names to check.".to_string(),
                parameters_schema: serde_json::json!({
                    "type": "object",
                    "properties": {
                        "resource_type": {
                            "type": "string",
                            "enum": ["product", "api", "cfn"],
                            "description": "Kind of resource to check"
                        },
                        "region": {
                            "type": "string",
                            "default": DEFAULT_REGION,
                            "description": "Region to check"
                        },
                        "filters": {
                            "anyOf": [
                                {"type": "array", "items": {"type": "string"}},
                                {"type": "string"}
                            ],
                            "description": "Resource names to check; a list or a JSON-encoded list"
                        }
                    },
                    "required": ["resource_type"]
                }),
            },
            context,
        }
    }
}

#[async_trait]
impl Tool for RegionalAvailabilityTool {
    fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }

    async fn execute(&self, call: ToolCall) -> RelayResult<ToolResult> {
        let outcome = match parse_args::<AvailabilityArgs>(call.arguments) {
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

    fn filters(value: Value) -> Option<Filters> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_plain_string_wrapped() {
        assert_eq!(normalize_filters(filters(json!("abc"))), vec![json!("abc")]);
    }

    #[test]
    fn test_json_encoded_list_decoded() {
        assert_eq!(
            normalize_filters(filters(json!(r#"["a","b"]"#))),
            vec![json!("a"), json!("b")]
        );
    }

    #[test]
    fn test_json_non_list_wrapped_verbatim() {
        assert_eq!(
            normalize_filters(filters(json!(r#"{"a":1}"#))),
            vec![json!(r#"{"a":1}"#)]
        );
        assert_eq!(normalize_filters(filters(json!("42"))), vec![json!("42")]);
    }

    #[test]
    fn test_list_used_verbatim() {
        assert_eq!(
            normalize_filters(filters(json!(["AWS Lambda", "Amazon S3"]))),
            vec![json!("AWS Lambda"), json!("Amazon S3")]
        );
    }

    #[test]
    fn test_empty_inputs_yield_nothing() {
        assert!(normalize_filters(None).is_empty());
        assert!(normalize_filters(filters(Value::Null)).is_empty());
        assert!(normalize_filters(filters(json!([]))).is_empty());
        assert!(normalize_filters(filters(json!(""))).is_empty());
        assert!(normalize_filters(filters(json!("[]"))).is_empty());
    }

    #[test]
    fn test_region_defaults_and_filters_omitted() {
        let args = parse_args::<AvailabilityArgs>(json!({"resource_type": "api"})).unwrap();
        let out = upstream_arguments(args);
        assert_eq!(Value::Object(out), json!({"resource_type": "api", "region": "us-east-1"}));
    }

    #[test]
    fn test_full_argument_set() {
        let args = parse_args::<AvailabilityArgs>(json!({
            "resource_type": "cfn",
            "region": "eu-west-1",
            "filters": "[\"AWS::EC2::Instance\"]"
        }))
        .unwrap();
        assert_eq!(
            Value::Object(upstream_arguments(args)),
            json!({
                "resource_type": "cfn",
                "region": "eu-west-1",
                "filters": ["AWS::EC2::Instance"]
            })
        );
    }

    #[test]
    fn test_null_region_uses_default() {
        let args =
            parse_args::<AvailabilityArgs>(json!({"resource_type": "product", "region": null}))
                .unwrap();
        assert_eq!(upstream_arguments(args)["region"], "us-east-1");
    }

    #[test]
    fn test_unknown_resource_type_rejected() {
        let err = parse_args::<AvailabilityArgs>(json!({"resource_type": "lambda"})).unwrap_err();
        let text = err.to_string();
        assert!(text.starts_with("Invalid arguments: "));
        assert!(text.contains("lambda"));
    }
}
