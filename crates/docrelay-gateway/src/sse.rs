//! MCP over server-sent events.
//!
//! A client opens `GET /sse` and receives an `endpoint` event naming the URL
//! to POST its JSON-RPC messages to (`/messages/?session_id=<id>`). Each POST
//! is acknowledged with `202 Accepted`; the reply travels back as a
//! `message` event on the client's open stream.

use crate::server::AppState;
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::StatusCode,
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Response,
    },
};
use futures_util::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::Arc;
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Path clients POST their messages to.
pub const MESSAGES_PATH: &str = "/messages/";

/// Open event streams, keyed by session id.
#[derive(Default)]
pub struct SseSessions {
    streams: RwLock<HashMap<Uuid, mpsc::UnboundedSender<String>>>,
}

impl SseSessions {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    async fn add(&self, id: Uuid, tx: mpsc::UnboundedSender<String>) {
        self.streams.write().await.insert(id, tx);
        info!(session_id = %id, "SSE session opened");
    }

    async fn remove(&self, id: Uuid) {
        if self.streams.write().await.remove(&id).is_some() {
            info!(session_id = %id, "SSE session closed");
        }
    }

    async fn contains(&self, id: Uuid) -> bool {
        self.streams.read().await.contains_key(&id)
    }

    /// Queue `message` on the session's stream. False when the stream is gone.
    async fn send(&self, id: Uuid, message: String) -> bool {
        let delivered = match self.streams.read().await.get(&id) {
            Some(tx) => tx.send(message).is_ok(),
            None => false,
        };
        if !delivered {
            self.remove(id).await;
        }
        delivered
    }
}

/// Unregisters the session when its event stream is dropped.
struct StreamGuard {
    id: Uuid,
    sessions: Arc<SseSessions>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let id = self.id;
        let sessions = self.sessions.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move { sessions.remove(id).await });
        }
    }
}

pub(crate) async fn sse_handler(
    State(state): State<Arc<AppState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let id = Uuid::new_v4();
    let (tx, rx) = mpsc::unbounded_channel::<String>();
    state.sse.add(id, tx).await;

    let endpoint = format!("{MESSAGES_PATH}?session_id={}", id.simple());
    let guard = StreamGuard {
        id,
        sessions: state.sse.clone(),
    };

    let announce = stream::once(async move {
        Ok::<_, Infallible>(Event::default().event("endpoint").data(endpoint))
    });
    let replies = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let message = rx.recv().await?;
        Some((
            Ok::<_, Infallible>(Event::default().event("message").data(message)),
            (rx, guard),
        ))
    });

    Sse::new(announce.chain(replies)).keep_alive(KeepAlive::default())
}

#[derive(Debug, Deserialize)]
pub(crate) struct MessagesQuery {
    session_id: String,
}

pub(crate) async fn messages_handler(
    State(state): State<Arc<AppState>>,
    Query(query): Query<MessagesQuery>,
    body: Bytes,
) -> Response {
    let Ok(id) = Uuid::parse_str(&query.session_id) else {
        return (StatusCode::BAD_REQUEST, "Invalid session ID").into_response();
    };
    if !state.sse.contains(id).await {
        debug!(session_id = %id, "Message for unknown SSE session");
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    }

    let raw = String::from_utf8_lossy(&body).into_owned();
    let server = state.server.clone();
    let sessions = state.sse.clone();
    tokio::spawn(async move {
        let Some(reply) = server.handle_text(&raw).await else {
            return;
        };
        match serde_json::to_string(&reply) {
            Ok(frame) => {
                if !sessions.send(id, frame).await {
                    warn!(session_id = %id, "SSE stream closed before reply was delivered");
                }
            }
            Err(e) => warn!(error = %e, "Failed to encode reply"),
        }
    });

    (StatusCode::ACCEPTED, "Accepted").into_response()
}
