//! WebSocket relay handler.
//!
//! Bridges a remote client (typically a browser player) into a hub topic:
//! inbound text frames parse as wire messages and publish to the room,
//! hub deliveries serialize back out to the socket. The hub itself answers
//! `ping` with `pong`, so the relay stays a dumb pipe.
//!
//! Malformed frames are logged and dropped - a misbehaving client cannot
//! wedge the room or crash the relay.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{Path, State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures::sink::SinkExt;
use futures::stream::StreamExt;
use serde::Serialize;

use crate::api::AppState;
use crate::channel::SessionChannel;
use crate::protocol::SyncMessage;

/// Relay-level error frame, sent once before closing a refused connection.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RelayError {
    event: &'static str,
    reason: String,
}

impl RelayError {
    fn to_message(reason: String) -> Option<Message> {
        let frame = RelayError {
            event: "error",
            reason,
        };
        serde_json::to_string(&frame)
            .ok()
            .map(|s| Message::Text(s.into()))
    }
}

/// WebSocket upgrade handler for `/ws/video/{stream_id}`.
pub async fn ws_handler(
    Path(stream_id): Path<String>,
    ws: WebSocketUpgrade,
    State(state): State<AppState>,
) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_ws(socket, state, stream_id))
}

/// Main relay connection loop.
async fn handle_ws(socket: WebSocket, state: AppState, stream_id: String) {
    let (mut sender, mut receiver) = socket.split();

    let channel = state.hub.channel_for_stream(&stream_id);
    if let Err(err) = channel.join().await {
        log::warn!("[Relay] Refusing connection to {}: {}", channel.topic(), err);
        if let Some(frame) = RelayError::to_message(err.to_string()) {
            let _ = sender.send(frame).await;
        }
        return;
    }

    // Single subscription per connection; the channel was just created, so
    // the receiver is always available here.
    let Some(mut incoming) = channel.take_incoming() else {
        channel.leave().await;
        return;
    };

    log::info!("[Relay] Client joined {}", channel.topic());

    loop {
        tokio::select! {
            // Frames from the remote client -> room.
            frame = receiver.next() => {
                match frame {
                    Some(Ok(Message::Text(text))) => {
                        match serde_json::from_str::<SyncMessage>(&text) {
                            Ok(msg) => channel.send(msg),
                            Err(err) => {
                                log::debug!(
                                    "[Relay] Ignoring malformed frame on {}: {}",
                                    channel.topic(),
                                    err
                                );
                            }
                        }
                    }
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    _ => {}
                }
            }
            // Room deliveries -> remote client.
            msg = incoming.recv() => {
                let Some(msg) = msg else { break };
                match serde_json::to_string(&msg) {
                    Ok(json) => {
                        if sender.send(Message::Text(json.into())).await.is_err() {
                            break;
                        }
                    }
                    Err(err) => {
                        log::warn!("[Relay] Failed to serialize message: {}", err);
                    }
                }
            }
        }
    }

    channel.leave().await;
    log::info!("[Relay] Client left {}", channel.topic());
}
