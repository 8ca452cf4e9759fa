//! Live update feed over WebSocket. A client connects with `?event=<id>`
//! and receives one full snapshot immediately, then a fresh one whenever
//! anything about the event changes in the store. Snapshots replace the
//! client's entire view; there are no deltas.

use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        Query, State,
    },
    response::IntoResponse,
};
use futures::{sink::SinkExt, stream::StreamExt};
use serde::Deserialize;
use std::sync::Arc;

use crate::protocol::{ClientMessage, ServerMessage};
use crate::state::AppState;
use crate::store::EventStore;

#[derive(Debug, Deserialize)]
pub struct WsQuery {
    pub event: Option<String>,
}

/// WebSocket upgrade handler
pub async fn ws_handler(
    ws: WebSocketUpgrade,
    Query(params): Query<WsQuery>,
    State(state): State<Arc<AppState>>,
) -> impl IntoResponse {
    tracing::info!(event = ?params.event, "WebSocket connection request");
    ws.on_upgrade(move |socket| handle_socket(socket, params, state))
}

async fn handle_socket(socket: WebSocket, params: WsQuery, state: Arc<AppState>) {
    let (mut sender, mut receiver) = socket.split();

    let Some(mut event_id) = params.event else {
        let _ = sender
            .send(error_frame("missing ?event= query parameter"))
            .await;
        return;
    };

    if send_snapshot(&mut sender, &state, &event_id).await.is_err() {
        return;
    }
    let mut subscription = state.store.subscribe(&event_id);

    loop {
        tokio::select! {
            changed = subscription.changed() => {
                if !changed {
                    break;
                }
                if send_snapshot(&mut sender, &state, &event_id).await.is_err() {
                    break;
                }
            }
            incoming = receiver.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<ClientMessage>(&text) {
                            Ok(ClientMessage::Subscribe { event_id: next_id }) => {
                                event_id = next_id;
                                subscription = state.store.subscribe(&event_id);
                                if send_snapshot(&mut sender, &state, &event_id).await.is_err() {
                                    break;
                                }
                            }
                            Err(error) => {
                                tracing::debug!(%error, "ignoring malformed client message");
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | None => break,
                    Some(Ok(_)) => {}
                    Some(Err(error)) => {
                        tracing::debug!(%error, "WebSocket receive error");
                        break;
                    }
                }
            }
        }
    }

    tracing::debug!(event_id, "WebSocket feed closed");
}

/// Recompute and push one full snapshot. Err means the socket is gone; a
/// missing event is reported to the client but keeps the connection open.
async fn send_snapshot(
    sender: &mut (impl SinkExt<Message> + Unpin),
    state: &AppState,
    event_id: &str,
) -> Result<(), ()> {
    let frame = match state.snapshot(event_id).await {
        Ok((event, leaderboard)) => ServerMessage::Snapshot {
            event,
            leaderboard,
            server_now: chrono::Utc::now().to_rfc3339(),
        },
        Err(error) => ServerMessage::Error {
            message: error.to_string(),
        },
    };
    send_frame(sender, &frame).await
}

async fn send_frame(
    sender: &mut (impl SinkExt<Message> + Unpin),
    message: &ServerMessage,
) -> Result<(), ()> {
    let Ok(json) = serde_json::to_string(message) else {
        return Err(());
    };
    sender.send(Message::Text(json.into())).await.map_err(|_| ())
}

fn error_frame(message: &str) -> Message {
    let frame = ServerMessage::Error {
        message: message.to_string(),
    };
    Message::Text(
        serde_json::to_string(&frame)
            .unwrap_or_else(|_| String::new())
            .into(),
    )
}
