//! `WS /ws`: no-auth bidirectional broadcast-event socket.
//!
//! Inbound client frames are currently ignored beyond keeping the
//! connection alive; the socket exists to push [`BroadcastEvent`]s to
//! dashboards and other passive observers.

use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::response::IntoResponse;
use futures_util::{SinkExt, StreamExt};
use tracing::debug;

use crate::state::ApiState;

pub async fn ws_handler(ws: WebSocketUpgrade, State(state): State<ApiState>) -> impl IntoResponse {
    ws.on_upgrade(move |socket| handle_socket(socket, state))
}

async fn handle_socket(socket: WebSocket, state: ApiState) {
    let (mut sender, mut receiver) = socket.split();
    let rx = state.events.subscribe();

    let mut forward = tokio::spawn(async move {
        let mut stream = rx.into_stream();
        while let Some(event) = stream.next().await {
            let Ok(data) = serde_json::to_string(&event) else {
                continue;
            };
            if sender.send(Message::Text(data.into())).await.is_err() {
                break;
            }
        }
    });

    let mut drain_inbound = tokio::spawn(async move {
        while let Some(Ok(msg)) = receiver.next().await {
            if matches!(msg, Message::Close(_)) {
                break;
            }
        }
    });

    tokio::select! {
        _ = &mut forward => drain_inbound.abort(),
        _ = &mut drain_inbound => forward.abort(),
    }

    debug!("websocket connection closed");
}
