//! Frame encoding for outbound events. One JSON text frame per [`ServerEvent`].

use axum::extract::ws::{Message, WebSocket};
use futures_util::stream::SplitSink;
use futures_util::SinkExt;

use crate::protocol::ServerEvent;

pub(super) async fn send_one(
    sender: &mut SplitSink<WebSocket, Message>,
    event: &ServerEvent,
) -> Result<(), axum::Error> {
    let payload = match serde_json::to_string(event) {
        Ok(payload) => payload,
        Err(err) => {
            tracing::error!(error = %err, "failed to serialize server event");
            return Ok(());
        }
    };
    sender.send(Message::Text(payload.into())).await
}
