use crate::dispatch::McpServer;
use crate::sse::{messages_handler, sse_handler, SseSessions};
use axum::{
    body::Bytes,
    extract::State,
    http::{header, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::{debug, info};
use uuid::Uuid;

/// Header carrying the session id assigned on `initialize`.
pub const SESSION_ID_HEADER: &str = "mcp-session-id";

/// Shared application state.
pub struct AppState {
    pub server: Arc<McpServer>,
    pub sse: Arc<SseSessions>,
}

/// HTTP face of the local MCP server.
pub struct GatewayServer;

impl GatewayServer {
    /// `POST /mcp` for JSON-RPC, `GET /sse` with `POST /messages/` for the
    /// event-stream transport, `GET /health` for liveness.
    pub fn build(server: Arc<McpServer>) -> Router {
        let state = Arc::new(AppState {
            server,
            sse: SseSessions::new(),
        });

        Router::new()
            .route("/mcp", post(mcp_handler))
            .route("/sse", get(sse_handler))
            .route("/messages", post(messages_handler))
            .route("/messages/", post(messages_handler))
            .route("/health", get(health_handler))
            .with_state(state)
    }
}

async fn health_handler() -> impl IntoResponse {
    Json(serde_json::json!({"status": "ok", "service": "docrelay"}))
}

async fn mcp_handler(State(state): State<Arc<AppState>>, body: Bytes) -> Response {
    let raw = String::from_utf8_lossy(&body);
    let is_initialize = serde_json::from_str::<serde_json::Value>(&raw)
        .map(|v| v["method"] == "initialize")
        .unwrap_or(false);

    let Some(reply) = state.server.handle_text(&raw).await else {
        return StatusCode::ACCEPTED.into_response();
    };

    let status = match &reply.error {
        Some(e) if e.code == docrelay_core::PARSE_ERROR => StatusCode::BAD_REQUEST,
        _ => StatusCode::OK,
    };
    let mut response = (status, Json(&reply)).into_response();

    if is_initialize && !reply.is_error() {
        let session_id = Uuid::new_v4();
        info!(session_id = %session_id, "MCP session opened");
        if let Ok(value) = HeaderValue::from_str(&session_id.to_string()) {
            response.headers_mut().insert(SESSION_ID_HEADER, value);
        }
    } else {
        debug!(status = %status, "MCP request handled");
    }

    response
        .headers_mut()
        .insert(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
    response
}
