//! `WebSocket` handler for live timeline updates.
//!
//! Clients connect to `GET /ws/timeline`, immediately receive the current
//! timeline (or `null`), then a JSON message each time the store publishes
//! a new value. A client that falls behind skips to the newest value.

use std::sync::Arc;

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use marquee_core::backend::EventBackend;
use marquee_types::Timeline;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, warn};

use crate::state::AppState;

/// Upgrade to a `WebSocket` and stream timeline updates.
///
/// # Route
///
/// `GET /ws/timeline`
pub async fn ws_timeline<B: EventBackend>(
    ws: WebSocketUpgrade,
    State(state): State<Arc<AppState<B>>>,
) -> impl IntoResponse {
    ws.on_upgrade(|socket| handle_ws(socket, state))
}

async fn send_timeline(socket: &mut WebSocket, timeline: Option<&Timeline>) -> bool {
    let json = match serde_json::to_string(&timeline) {
        Ok(j) => j,
        Err(e) => {
            warn!("Failed to serialize timeline: {e}");
            return true;
        }
    };
    socket.send(Message::Text(json.into())).await.is_ok()
}

fn is_same_snapshot(sent: Option<&Arc<Timeline>>, received: Option<&Arc<Timeline>>) -> bool {
    matches!((sent, received), (Some(a), Some(b)) if Arc::ptr_eq(a, b))
}

async fn handle_ws<B: EventBackend>(mut socket: WebSocket, state: Arc<AppState<B>>) {
    debug!("WebSocket client connected");

    // Subscribe before reading so no publish between the two is missed.
    let mut rx = state.timeline.subscribe();

    let initial = match state.timeline.fetch_or_get().await {
        Ok(timeline) => timeline,
        Err(e) => {
            warn!(error = %e, "Initial timeline fetch failed, sending cached value");
            state.timeline.current().await
        }
    };
    if !send_timeline(&mut socket, initial.as_deref()).await {
        debug!("WebSocket client disconnected (initial send failed)");
        return;
    }

    // A cold-start fetch publishes the value it returns, so the first
    // broadcast may be the snapshot just sent.
    let mut echo = initial;

    loop {
        tokio::select! {
            result = rx.recv() => {
                match result {
                    Ok(timeline) => {
                        if is_same_snapshot(echo.take().as_ref(), timeline.as_ref()) {
                            continue;
                        }
                        if !send_timeline(&mut socket, timeline.as_deref()).await {
                            debug!("WebSocket client disconnected (send failed)");
                            return;
                        }
                    }
                    Err(RecvError::Lagged(n)) => {
                        debug!(skipped = n, "WebSocket client lagged, skipping ahead");
                    }
                    Err(RecvError::Closed) => {
                        debug!("Timeline channel closed, shutting down WebSocket");
                        return;
                    }
                }
            }
            msg = socket.recv() => {
                match msg {
                    Some(Ok(Message::Close(_))) | None => {
                        debug!("WebSocket client disconnected");
                        return;
                    }
                    Some(Ok(Message::Ping(data))) => {
                        if socket.send(Message::Pong(data)).await.is_err() {
                            debug!("WebSocket client disconnected (pong failed)");
                            return;
                        }
                    }
                    Some(Err(e)) => {
                        debug!("WebSocket error: {e}");
                        return;
                    }
                    _ => {}
                }
            }
        }
    }
}
