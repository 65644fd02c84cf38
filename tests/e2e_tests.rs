
use futures_util::{SinkExt, StreamExt};
use room_sync_core::protocol::{ClientEvent, Codec, Role, ServerEvent};
use room_sync_core::server::CreateRoomInput;
use test_helpers::{create_test_server, start_test_server};
use tokio_tungstenite::{connect_async, tungstenite::Message};
use uuid::Uuid;

fn test_codec() -> Codec {
    Codec {
        video: "h264".to_string(),
        audio: "aac".to_string(),
        resolution: Some("1080p".to_string()),
    }
}

type WsSender = futures_util::stream::SplitSink<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
    Message,
>;
type WsReceiver = futures_util::stream::SplitStream<
    tokio_tungstenite::WebSocketStream<tokio_tungstenite::MaybeTlsStream<tokio::net::TcpStream>>,
>;

async fn connect_client(addr: std::net::SocketAddr, token: &str) -> (WsSender, WsReceiver) {
    let url = format!("ws://{addr}/ws");
    let mut request = tokio_tungstenite::tungstenite::client::IntoClientRequest::into_client_request(
        url.as_str(),
    )
    .unwrap();
    request.headers_mut().insert(
        axum::http::header::AUTHORIZATION,
        format!("Bearer {token}").parse().unwrap(),
    );

    let (ws_stream, _) = tokio::time::timeout(
        std::time::Duration::from_secs(5),
        connect_async(request),
    )
    .await
    .expect("websocket connect timed out")
    .expect("failed to connect");

    ws_stream.split()
}

async fn send_event(sender: &mut WsSender, event: &ClientEvent) {
    let json = serde_json::to_string(event).unwrap();
    sender.send(Message::Text(json.into())).await.unwrap();
}

async fn recv_event(receiver: &mut WsReceiver) -> ServerEvent {
    let msg = tokio::time::timeout(std::time::Duration::from_secs(5), receiver.next())
        .await
        .expect("timed out waiting for a server event")
        .expect("connection closed")
        .expect("transport error");
    let text = msg.into_text().unwrap();
    serde_json::from_str(&text).unwrap()
}

#[tokio::test]
async fn host_and_follower_sync_playback_end_to_end() {
    let host_id = Uuid::new_v4();
    let follower_id = Uuid::new_v4();
    let (server, tokens) = create_test_server(&[host_id, follower_id]).await;

    let room = server
        .create_room(CreateRoomInput {
            host_id,
            file_hash: "abc123".to_string(),
            duration_ms: 60_000,
            file_size: 123_456,
            codec: test_codec(),
            expires_in_days: 7,
            passcode: None,
        })
        .await
        .expect("room creation should succeed");

    let addr = start_test_server(server).await;

    let (mut host_tx, mut host_rx) = connect_client(addr, &tokens[0]).await;
    send_event(
        &mut host_tx,
        &ClientEvent::JoinRoom {
            room_id: room.room_id.clone(),
            role: Role::Host,
            file_hash: "abc123".to_string(),
        },
    )
    .await;
    match recv_event(&mut host_rx).await {
        ServerEvent::Joined { room_id, .. } => assert_eq!(room_id, room.room_id),
        other => panic!("expected Joined, got {other:?}"),
    }

    let (mut follower_tx, mut follower_rx) = connect_client(addr, &tokens[1]).await;
    send_event(
        &mut follower_tx,
        &ClientEvent::JoinRoom {
            room_id: room.room_id.clone(),
            role: Role::Follower,
            file_hash: "abc123".to_string(),
        },
    )
    .await;
    match recv_event(&mut follower_rx).await {
        ServerEvent::Joined { participants, .. } => assert_eq!(participants.len(), 2),
        other => panic!("expected Joined, got {other:?}"),
    }

    // The host also sees the roster update once the follower joins.
    match recv_event(&mut host_rx).await {
        ServerEvent::Joined { participants, .. } => assert_eq!(participants.len(), 2),
        other => panic!("expected a roster-refresh Joined event, got {other:?}"),
    }

    send_event(
        &mut host_tx,
        &ClientEvent::HostPlay {
            room_id: room.room_id.clone(),
            position_sec: 12.5,
            host_timestamp_ms: 1_000,
            playback_rate: None,
        },
    )
    .await;

    match recv_event(&mut follower_rx).await {
        ServerEvent::HostPlay { position_sec, .. } => assert_eq!(position_sec, 12.5),
        other => panic!("expected HostPlay, got {other:?}"),
    }
}

#[tokio::test]
async fn follower_with_mismatched_file_hash_is_rejected() {
    let host_id = Uuid::new_v4();
    let follower_id = Uuid::new_v4();
    let (server, tokens) = create_test_server(&[host_id, follower_id]).await;

    let room = server
        .create_room(CreateRoomInput {
            host_id,
            file_hash: "abc123".to_string(),
            duration_ms: 60_000,
            file_size: 123_456,
            codec: test_codec(),
            expires_in_days: 7,
            passcode: None,
        })
        .await
        .unwrap();

    let addr = start_test_server(server).await;

    let (mut follower_tx, mut follower_rx) = connect_client(addr, &tokens[1]).await;
    send_event(
        &mut follower_tx,
        &ClientEvent::JoinRoom {
            room_id: room.room_id.clone(),
            role: Role::Follower,
            file_hash: "different-hash".to_string(),
        },
    )
    .await;

    match recv_event(&mut follower_rx).await {
        ServerEvent::Error {
            code,
            expected,
            received,
            ..
        } => {
            assert_eq!(code, room_sync_core::error::ErrorCode::FileMismatch);
            assert_eq!(expected.as_deref(), Some("abc123"));
            assert_eq!(received.as_deref(), Some("different-hash"));
        }
        other => panic!("expected a file-mismatch error, got {other:?}"),
    }
}

#[tokio::test]
async fn follower_cannot_drive_playback() {
    let host_id = Uuid::new_v4();
    let follower_id = Uuid::new_v4();
    let (server, tokens) = create_test_server(&[host_id, follower_id]).await;

    let room = server
        .create_room(CreateRoomInput {
            host_id,
            file_hash: "abc123".to_string(),
            duration_ms: 60_000,
            file_size: 123_456,
            codec: test_codec(),
            expires_in_days: 7,
            passcode: None,
        })
        .await
        .unwrap();

    let addr = start_test_server(server).await;

    let (mut host_tx, mut host_rx) = connect_client(addr, &tokens[0]).await;
    send_event(
        &mut host_tx,
        &ClientEvent::JoinRoom {
            room_id: room.room_id.clone(),
            role: Role::Host,
            file_hash: "abc123".to_string(),
        },
    )
    .await;
    recv_event(&mut host_rx).await;

    let (mut follower_tx, mut follower_rx) = connect_client(addr, &tokens[1]).await;
    send_event(
        &mut follower_tx,
        &ClientEvent::JoinRoom {
            room_id: room.room_id.clone(),
            role: Role::Follower,
            file_hash: "abc123".to_string(),
        },
    )
    .await;
    recv_event(&mut follower_rx).await;
    recv_event(&mut host_rx).await; // roster refresh on the host side

    send_event(
        &mut follower_tx,
        &ClientEvent::HostPlay {
            room_id: room.room_id.clone(),
            position_sec: 30.0,
            host_timestamp_ms: 2_000,
            playback_rate: None,
        },
    )
    .await;

    match recv_event(&mut follower_rx).await {
        ServerEvent::Error { code, .. } => {
            assert_eq!(code, room_sync_core::error::ErrorCode::Unauthorized)
        }
        other => panic!("expected Unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn ping_is_answered_with_pong() {
    let user_id = Uuid::new_v4();
    let (server, tokens) = create_test_server(&[user_id]).await;
    let addr = start_test_server(server).await;

    let (mut tx, mut rx) = connect_client(addr, &tokens[0]).await;
    send_event(
        &mut tx,
        &ClientEvent::Ping {
            nonce: "n-1".to_string(),
            ts: 42,
        },
    )
    .await;

    match recv_event(&mut rx).await {
        ServerEvent::Pong { nonce, client_ts, .. } => {
            assert_eq!(nonce, "n-1");
            assert_eq!(client_ts, 42);
        }
        other => panic!("expected Pong, got {other:?}"),
    }
}

#[tokio::test]
async fn connecting_without_a_bearer_token_is_rejected() {
    let (server, _tokens) = create_test_server(&[]).await;
    let addr = start_test_server(server).await;

    let url = format!("ws://{addr}/ws");
    let (mut ws_stream, _) = connect_async(&url).await.expect("transport should connect");
    let msg = ws_stream.next().await.expect("connection closed").unwrap();
    let event: ServerEvent = serde_json::from_str(&msg.into_text().unwrap()).unwrap();
    match event {
        ServerEvent::Error { code, .. } => {
            assert_eq!(code, room_sync_core::error::ErrorCode::AuthFailed)
        }
        other => panic!("expected AuthFailed, got {other:?}"),
    }
}
