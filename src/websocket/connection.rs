//! Per-socket connection lifecycle: the `CONNECTING -> AUTHED -> IN_ROOM ->
//! CLOSED` state machine (§4.2). Authentication happens once, immediately
//! after the upgrade; everything after that is ordinary event dispatch.

use axum::extract::ws::{Message, WebSocket};
use futures_util::{SinkExt, StreamExt};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::sync::mpsc;

use crate::error::ErrorCode;
use crate::protocol::{ClientEvent, ServerEvent};
use crate::server::{dispatch, RegisterConnectionError, SyncServer};

use super::sending::send_one;

const OUTBOUND_QUEUE_CAPACITY: usize = 64;

pub(super) async fn handle_socket(
    socket: WebSocket,
    server: Arc<SyncServer>,
    addr: SocketAddr,
    token: Option<String>,
) {
    let (mut sender, mut receiver) = socket.split();

    let Some(token) = token else {
        let _ = send_one(&mut sender, &ServerEvent::error(ErrorCode::AuthFailed)).await;
        let _ = sender.close().await;
        return;
    };
    let identity = match server.token_verifier().verify(&token).await {
        Ok(identity) => identity,
        Err(_) => {
            let _ = send_one(&mut sender, &ServerEvent::error(ErrorCode::AuthFailed)).await;
            let _ = sender.close().await;
            return;
        }
    };
    let user_id = identity.user_id;

    let connection_id = uuid::Uuid::new_v4();
    let (tx, mut rx) = mpsc::channel::<Arc<ServerEvent>>(OUTBOUND_QUEUE_CAPACITY);

    if let Err(RegisterConnectionError::IpLimitExceeded { current, limit }) =
        server.register_connection(connection_id, user_id, tx, addr.ip())
    {
        tracing::warn!(%addr, current, limit, "rejecting connection over the per-IP limit");
        let _ = send_one(&mut sender, &ServerEvent::error(ErrorCode::Unauthorized)).await;
        let _ = sender.close().await;
        return;
    }
    tracing::info!(%connection_id, %user_id, client_addr = %addr, "connection established");

    let ping_interval = server.config().socket_ping_interval;
    let send_task = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(ping_interval);
        ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
        ticker.tick().await; // first tick fires immediately; skip it

        loop {
            tokio::select! {
                event = rx.recv() => {
                    match event {
                        Some(event) => {
                            if send_one(&mut sender, &event).await.is_err() {
                                break;
                            }
                        }
                        None => break,
                    }
                }
                _ = ticker.tick() => {
                    if sender.send(Message::Ping(Vec::new().into())).await.is_err() {
                        break;
                    }
                }
            }
        }
    });

    let server_for_receive = server.clone();
    let ping_timeout = server.config().socket_ping_timeout;
    let receive_task = tokio::spawn(async move {
        loop {
            let message = match tokio::time::timeout(ping_timeout, receiver.next()).await {
                Ok(Some(Ok(message))) => message,
                Ok(Some(Err(err))) => {
                    tracing::debug!(%connection_id, error = %err, "websocket transport error");
                    break;
                }
                Ok(None) => break,
                Err(_) => {
                    tracing::info!(%connection_id, "no pong within the timeout, treating as disconnected");
                    break;
                }
            };

            match message {
                Message::Text(text) => {
                    let event: ClientEvent = match serde_json::from_str(&text) {
                        Ok(event) => event,
                        Err(err) => {
                            tracing::debug!(%connection_id, error = %err, "rejected malformed client event");
                            server_for_receive
                                .connections
                                .send_to(&connection_id, Arc::new(ServerEvent::error(ErrorCode::InvalidPayload)))
                                .await;
                            continue;
                        }
                    };
                    dispatch(&server_for_receive, connection_id, event).await;
                }
                Message::Close(_) => break,
                _ => {}
            }
        }
    });

    tokio::select! {
        _ = send_task => {}
        _ = receive_task => {}
    }

    server.disconnect(connection_id).await;
    tracing::info!(%connection_id, "connection closed");
}
