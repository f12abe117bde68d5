use crate::dispatch::McpServer;
use docrelay_core::RelayResult;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt};
use tracing::{debug, info};

/// Serve newline-delimited JSON-RPC from `input`, writing replies to `output`.
///
/// Returns when `input` reaches end of file. Blank lines are ignored and
/// notifications produce no output line.
pub async fn serve_stdio<R, W>(server: &McpServer, input: R, mut output: W) -> RelayResult<()>
where
    R: AsyncBufRead + Unpin,
    W: AsyncWrite + Unpin,
{
    info!("Serving MCP over stdio");
    let mut lines = input.lines();

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        let Some(reply) = server.handle_text(line).await else {
            continue;
        };
        let mut frame = serde_json::to_vec(&reply)?;
        frame.push(b'\n');
        output.write_all(&frame).await?;
        output.flush().await?;
    }

    debug!("stdin closed, stopping stdio server");
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use docrelay_mcp::testing::StubConnector;
    use docrelay_tools::{register_all, RelayContext, ToolRegistry};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_one_reply_per_request_line() {
        let stub = StubConnector::text(r#"{"regions":["eu-west-1"]}"#);
        let mut registry = ToolRegistry::new();
        register_all(
            &mut registry,
            Arc::new(RelayContext::new(Arc::new(stub.clone()))),
        );
        let server = McpServer::new(Arc::new(registry));

        let input = concat!(
            r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{}}"#,
            "\n",
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
            "\n\n",
            r#"{"jsonrpc":"2.0","id":2,"method":"tools/call","params":{"name":"list_regions"}}"#,
            "\n",
        );
        let mut output = Vec::new();
        serve_stdio(&server, input.as_bytes(), &mut output)
            .await
            .unwrap();

        let text = String::from_utf8(output).unwrap();
        let replies: Vec<serde_json::Value> = text
            .lines()
            .map(|l| serde_json::from_str(l).unwrap())
            .collect();
        assert_eq!(replies.len(), 2);
        assert_eq!(replies[0]["id"], 1);
        assert_eq!(replies[1]["id"], 2);
        assert_eq!(
            replies[1]["result"]["content"][0]["text"],
            "{\n  \"regions\": [\n    \"eu-west-1\"\n  ]\n}"
        );
        assert_eq!((stub.opened(), stub.closed()), (1, 1));
    }

    #[tokio::test]
    async fn test_garbage_line_answered_with_parse_error() {
        let server = McpServer::new(Arc::new(ToolRegistry::new()));
        let mut output = Vec::new();
        serve_stdio(&server, "not json\n".as_bytes(), &mut output)
            .await
            .unwrap();

        let reply: serde_json::Value =
            serde_json::from_str(String::from_utf8(output).unwrap().trim()).unwrap();
        assert_eq!(reply["error"]["code"], -32700);
        assert!(reply["id"].is_null());
    }
}
