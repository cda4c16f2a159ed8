use std::sync::Arc;
use std::sync::atomic::Ordering;

use axum::extract::FromRequest;
use axum::extract::ws::{Message, WebSocket};
use axum::extract::{State, WebSocketUpgrade};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use bytes::Bytes;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use townsquare_core::net::messages::{
    ClientMessage, ServerMessage, SubscribeMsg, SubscribeResponseMsg,
};
use townsquare_core::net::protocol::{
    MAX_MESSAGE_SIZE, PROTOCOL_VERSION, decode_client_message, encode_server_message,
};

use crate::state::{AppState, ConnectionGuard};

/// Longest user id accepted in a subscribe frame.
const MAX_USER_ID_LEN: usize = 128;

pub async fn ws_handler(
    State(state): State<AppState>,
    request: axum::extract::Request,
) -> Result<axum::response::Response, StatusCode> {
    let max_ws = state.config.limits.max_ws_connections;
    let current = state.ws_connection_count.load(Ordering::Relaxed);
    if current >= max_ws {
        tracing::warn!(current, max = max_ws, "WS connection limit reached");
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }

    let ws = WebSocketUpgrade::from_request(request, &state)
        .await
        .map_err(|_| StatusCode::BAD_REQUEST)?;

    Ok(ws
        .on_upgrade(move |socket| handle_socket(socket, state))
        .into_response())
}

async fn handle_socket(socket: WebSocket, state: AppState) {
    let _guard = ConnectionGuard::new(Arc::clone(&state.ws_connection_count));
    let (mut ws_sender, mut ws_receiver) = socket.split();

    // The first frame must subscribe the connection to a user's group.
    let first_msg = match ws_receiver.next().await {
        Some(Ok(Message::Binary(data))) => data,
        _ => return,
    };

    let subscribe = match decode_client_message(&first_msg) {
        Ok(ClientMessage::Subscribe(s)) => s,
        Err(e) => {
            tracing::debug!(error = %e, "Malformed subscribe frame");
            send_subscribe_error(&mut ws_sender, "expected a subscribe message").await;
            return;
        },
    };

    if let Err(reason) = validate_subscribe(&subscribe) {
        send_subscribe_error(&mut ws_sender, &reason).await;
        return;
    }

    let user_id = subscribe.user_id;
    let (connection_id, rx) = state.presence.connect(&user_id).await;

    let response = ServerMessage::SubscribeResponse(SubscribeResponseMsg {
        success: true,
        connection_id: Some(connection_id),
        error: None,
    });
    let sent = match encode_server_message(&response) {
        Ok(data) => ws_sender.send(Message::Binary(data.into())).await.is_ok(),
        Err(e) => {
            tracing::warn!(error = %e, "Failed to encode SubscribeResponse");
            false
        },
    };

    if sent {
        tracing::info!(user = %user_id, connection_id, "Notification socket subscribed");
        spawn_writer(ws_sender, rx);
        read_loop(&mut ws_receiver, &user_id, connection_id).await;
    }

    state.presence.disconnect(&user_id, connection_id).await;
    tracing::info!(user = %user_id, connection_id, "Notification socket closed");
}

fn validate_subscribe(subscribe: &SubscribeMsg) -> Result<(), String> {
    if subscribe.protocol_version != 0 && subscribe.protocol_version != PROTOCOL_VERSION {
        return Err(format!(
            "Protocol version mismatch: client={}, server={}",
            subscribe.protocol_version, PROTOCOL_VERSION
        ));
    }
    let user_id = subscribe.user_id.as_str();
    let padded = user_id.trim() != user_id;
    if user_id.trim().is_empty() || padded || user_id.len() > MAX_USER_ID_LEN {
        return Err("invalid user id".to_string());
    }
    Ok(())
}

async fn send_subscribe_error(ws_sender: &mut SplitSink<WebSocket, Message>, error: &str) {
    let msg = ServerMessage::SubscribeResponse(SubscribeResponseMsg {
        success: false,
        connection_id: None,
        error: Some(error.to_string()),
    });
    if let Ok(response) = encode_server_message(&msg)
        && let Err(e) = ws_sender.send(Message::Binary(response.into())).await
    {
        tracing::warn!(error = %e, "Failed to send subscribe error response");
    }
}

fn spawn_writer(mut ws_sender: SplitSink<WebSocket, Message>, mut rx: mpsc::Receiver<Bytes>) {
    tokio::spawn(async move {
        while let Some(data) = rx.recv().await {
            if ws_sender.send(Message::Binary(data)).await.is_err() {
                break;
            }
        }
    });
}

/// The channel is server-to-client only; inbound frames after the subscribe
/// are drained until the client closes.
async fn read_loop(ws_receiver: &mut SplitStream<WebSocket>, user_id: &str, connection_id: u64) {
    while let Some(Ok(msg)) = ws_receiver.next().await {
        match msg {
            Message::Close(_) => break,
            Message::Binary(data) if data.len() > MAX_MESSAGE_SIZE => {
                tracing::debug!(user = %user_id, connection_id, "Dropping oversized frame");
            },
            _ => {},
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscribe(user_id: &str, protocol_version: u8) -> SubscribeMsg {
        SubscribeMsg {
            user_id: user_id.to_string(),
            protocol_version,
        }
    }

    #[test]
    fn subscribe_validation() {
        assert!(validate_subscribe(&subscribe("alice", PROTOCOL_VERSION)).is_ok());
        assert!(validate_subscribe(&subscribe("alice", 0)).is_ok());
        assert!(validate_subscribe(&subscribe("alice", PROTOCOL_VERSION + 1)).is_err());
        assert!(validate_subscribe(&subscribe("  ", PROTOCOL_VERSION)).is_err());
        assert!(validate_subscribe(&subscribe(" bob", PROTOCOL_VERSION)).is_err());
        assert!(validate_subscribe(&subscribe("bob\n", PROTOCOL_VERSION)).is_err());
        assert!(validate_subscribe(&subscribe(&"u".repeat(200), PROTOCOL_VERSION)).is_err());
    }
}
