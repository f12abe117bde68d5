#![allow(clippy::unwrap_used, clippy::expect_used)]

use docrelay_core::ToolCall;
use docrelay_mcp::testing::{StubConnector, StubReply};
use docrelay_mcp::{ContentBlock, McpToolResult};
use docrelay_tools::{register_all, RelayContext, ToolRegistry};
use serde_json::json;
use std::sync::Arc;

fn registry_with(stub: &StubConnector) -> ToolRegistry {
    let mut registry = ToolRegistry::new();
    let context = Arc::new(RelayContext::new(Arc::new(stub.clone())));
    register_all(&mut registry, context);
    registry
}

async fn invoke(registry: &ToolRegistry, tool: &str, args: serde_json::Value) -> (String, bool) {
    let result = registry
        .execute(ToolCall::new("call-1", tool, args))
        .await
        .unwrap();
    (result.content, result.is_error)
}

#[test]
fn test_all_five_tools_registered_in_order() {
    let stub = StubConnector::text("");
    let registry = registry_with(&stub);
    let names: Vec<_> = registry
        .list_descriptors()
        .iter()
        .map(|d| d.name.clone())
        .collect();
    assert_eq!(
        names,
        vec![
            "search_documentation",
            "read_documentation",
            "recommend",
            "list_regions",
            "get_regional_availability",
        ]
    );
    assert_eq!(stub.opened(), 0);
}

#[tokio::test]
async fn test_list_regions_unwraps_envelope() {
    let stub = StubConnector::text(
        r#"{"content":{"result":{"regions":["us-east-1"]},"next_token":null}}"#,
    );
    let registry = registry_with(&stub);

    let (text, is_error) = invoke(&registry, "list_regions", json!({})).await;
    assert!(!is_error);
    assert_eq!(text, "{\n  \"regions\": [\n    \"us-east-1\"\n  ]\n}");

    let calls = stub.calls();
    assert_eq!(calls.len(), 1);
    assert_eq!(calls[0].name, "aws___list_regions");
    assert_eq!(calls[0].arguments, json!({}));
    assert_eq!((stub.opened(), stub.closed()), (1, 1));
}

#[tokio::test]
async fn test_search_relays_renamed_arguments() {
    let stub = StubConnector::text("plain result");
    let registry = registry_with(&stub);

    let (text, _) = invoke(
        &registry,
        "search_documentation",
        json!({"query": "lambda layers", "topics": ["general"]}),
    )
    .await;
    assert_eq!(text, "plain result");
    assert_eq!(stub.calls()[0].name, "aws___search_documentation");
    assert_eq!(
        stub.calls()[0].arguments,
        json!({"search_phrase": "lambda layers", "topics": ["general"]})
    );
}

#[tokio::test]
async fn test_regional_availability_defaults_region() {
    let stub = StubConnector::text("[]");
    let registry = registry_with(&stub);

    invoke(
        &registry,
        "get_regional_availability",
        json!({"resource_type": "product", "filters": "AWS Lambda"}),
    )
    .await;
    assert_eq!(
        stub.calls()[0].arguments,
        json!({"resource_type": "product", "region": "us-east-1", "filters": ["AWS Lambda"]})
    );
}

#[tokio::test]
async fn test_multiple_text_blocks_joined() {
    let stub = StubConnector::new(StubReply::Result(McpToolResult {
        content: vec![
            ContentBlock::Text {
                text: "first".into(),
            },
            ContentBlock::Text {
                text: "second".into(),
            },
        ],
        is_error: false,
    }));
    let registry = registry_with(&stub);

    let (text, _) = invoke(&registry, "recommend", json!({"url": "https://docs.aws.amazon.com/"})).await;
    assert_eq!(text, "first\nsecond");
}

#[tokio::test]
async fn test_upstream_error_flag_still_rendered() {
    let stub = StubConnector::new(StubReply::Result(McpToolResult {
        content: vec![ContentBlock::Text {
            text: "page not found".into(),
        }],
        is_error: true,
    }));
    let registry = registry_with(&stub);

    let (text, is_error) = invoke(
        &registry,
        "read_documentation",
        json!({"url": "https://docs.aws.amazon.com/missing"}),
    )
    .await;
    assert_eq!(text, "page not found");
    assert!(!is_error);
}

#[tokio::test]
async fn test_connect_failure_prefixed() {
    let stub = StubConnector::text("unused").refuse_connect("connection refused");
    let registry = registry_with(&stub);

    let (text, is_error) = invoke(&registry, "list_regions", json!({})).await;
    assert!(is_error);
    assert!(text.starts_with("Error listing regions: Connection Error: "));
    assert!(text.contains("connection refused"));
    assert_eq!(stub.opened(), 0);
}

#[tokio::test]
async fn test_handshake_failure_closes_transport() {
    let stub = StubConnector::text("unused").refuse_initialize("bad gateway");
    let registry = registry_with(&stub);

    let (text, is_error) = invoke(&registry, "recommend", json!({"url": "u"})).await;
    assert!(is_error);
    assert!(text.starts_with("Error getting recommendations: Connection Error: "));
    assert_eq!((stub.opened(), stub.closed()), (1, 1));
    assert!(stub.calls().is_empty());
}

#[tokio::test]
async fn test_dropped_call_prefixed_and_released() {
    let stub = StubConnector::new(StubReply::Dropped("stream reset".into()));
    let registry = registry_with(&stub);

    let (text, is_error) = invoke(&registry, "search_documentation", json!({"query": "s3"})).await;
    assert!(is_error);
    assert!(text.starts_with("Error searching documentation: "));
    assert!(text.contains("stream reset"));
    assert_eq!((stub.opened(), stub.closed()), (1, 1));
}

#[tokio::test]
async fn test_rpc_error_prefixed() {
    let stub = StubConnector::new(StubReply::RpcError {
        code: -32000,
        message: "throttled".into(),
    });
    let registry = registry_with(&stub);

    let (text, is_error) = invoke(
        &registry,
        "get_regional_availability",
        json!({"resource_type": "api"}),
    )
    .await;
    assert!(is_error);
    assert_eq!(text, "Error checking availability: MCP error -32000: throttled");
    assert_eq!(stub.closed(), 1);
}

#[tokio::test]
async fn test_invalid_arguments_never_connect() {
    let stub = StubConnector::text("unused");
    let registry = registry_with(&stub);

    let (text, is_error) = invoke(
        &registry,
        "get_regional_availability",
        json!({"resource_type": "service"}),
    )
    .await;
    assert!(is_error);
    assert!(text.starts_with("Error checking availability: Invalid arguments: "));

    let (text, _) = invoke(&registry, "read_documentation", json!({})).await;
    assert!(text.starts_with("Error reading documentation: Invalid arguments: "));
    assert_eq!(stub.opened(), 0);
}

#[tokio::test]
async fn test_each_invocation_uses_its_own_session() {
    let stub = StubConnector::text("ok");
    let registry = Arc::new(registry_with(&stub));

    let mut handles = Vec::new();
    for i in 0..8 {
        let registry = registry.clone();
        handles.push(tokio::spawn(async move {
            registry
                .execute(ToolCall::new(
                    format!("call-{i}"),
                    "search_documentation",
                    json!({"query": format!("q{i}")}),
                ))
                .await
                .unwrap()
        }));
    }
    for handle in handles {
        assert_eq!(handle.await.unwrap().content, "ok");
    }

    assert_eq!(stub.opened(), 8);
    assert_eq!(stub.closed(), 8);
    assert_eq!(stub.calls().len(), 8);
}
