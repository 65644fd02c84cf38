//! Upgrades `/ws` to a WebSocket and hands the socket to `connection::handle_socket`.

use axum::extract::ws::WebSocketUpgrade;
use axum::extract::{ConnectInfo, State};
use axum::http::HeaderMap;
use axum::response::Response;
use std::net::SocketAddr;
use std::sync::Arc;

use crate::server::SyncServer;

use super::connection::handle_socket;

fn bearer_token(headers: &HeaderMap) -> Option<String> {
    let value = headers.get(axum::http::header::AUTHORIZATION)?.to_str().ok()?;
    value.strip_prefix("Bearer ").map(str::to_string)
}

pub async fn websocket_handler(
    ws: WebSocketUpgrade,
    ConnectInfo(addr): ConnectInfo<SocketAddr>,
    State(server): State<Arc<SyncServer>>,
    headers: HeaderMap,
) -> Response {
    let token = bearer_token(&headers);
    ws.on_upgrade(move |socket| handle_socket(socket, server, addr, token))
}
