use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::IntoResponse,
};
use futures::{SinkExt, StreamExt};
use std::sync::Arc;
use tokio::sync::broadcast;

use calbook_core::models::event::CalendarEvent;

use crate::{middleware::auth::AuthUser, ApiState};

/// WebSocket endpoint streaming calendar lifecycle events.
///
/// Unauthenticated connections are rejected by the `AuthUser` extractor
/// before the upgrade completes. Every accepted socket joins the single
/// shared group and receives every event; there is no per-client filtering.
#[axum::debug_handler]
pub async fn calendar_updates(
    State(state): State<Arc<ApiState>>,
    AuthUser(user): AuthUser,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let events = state.events.subscribe();
    let username = user.username;
    ws.on_upgrade(move |socket| handle_socket(socket, events, username))
}

async fn handle_socket(
    socket: WebSocket,
    mut events: broadcast::Receiver<CalendarEvent>,
    username: String,
) {
    tracing::debug!("Calendar subscriber connected: {}", username);
    let (mut sink, mut stream) = socket.split();

    loop {
        tokio::select! {
            event = events.recv() => {
                match event {
                    Ok(event) => {
                        let Ok(frame) = serde_json::to_string(&event) else {
                            continue;
                        };
                        if sink.send(Message::Text(frame)).await.is_err() {
                            break;
                        }
                    }
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        // Best-effort channel: a slow client just misses events
                        tracing::warn!(
                            "Subscriber {} lagged behind, skipped {} events",
                            username,
                            skipped
                        );
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
            inbound = stream.next() => {
                match inbound {
                    // Inbound frames are accepted and ignored; the channel
                    // is output-only from the server's perspective.
                    Some(Ok(Message::Close(_))) | Some(Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }

    // Dropping the receiver removes this subscriber from the group
    tracing::debug!("Calendar subscriber disconnected: {}", username);
}
