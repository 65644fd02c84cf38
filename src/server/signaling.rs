//! Inbound signaling event dispatch (§4.2). One `dispatch` call per event,
//! run to completion before the connection's next event is processed
//! (§5 "each inbound event is processed to completion").

use std::sync::Arc;

use chrono::Utc;

use crate::error::ErrorCode;
use crate::protocol::{
    validation, ClientEvent, ConnectionId, ParticipantRecord, ParticipantView, Role, RoomEventKind,
    RoomEventRow, RoomId, ServerEvent, UserId,
};
use crate::registry::{JoinOutcome, LiveRoom};

use super::grace_timer;
use super::SyncServer;

async fn send_error(server: &SyncServer, connection_id: ConnectionId, code: ErrorCode) {
    server
        .connections
        .send_to(&connection_id, Arc::new(ServerEvent::error(code)))
        .await;
}

pub(super) fn merge_roster(records: &[ParticipantRecord], live: &LiveRoom) -> Vec<ParticipantView> {
    records
        .iter()
        .map(|r| ParticipantView {
            user_id: r.user_id,
            role: r.role,
            is_online: r.is_connected || live.participants.values().any(|e| e.user_id == r.user_id),
        })
        .collect()
}

async fn log_event(server: &SyncServer, room_id: &RoomId, user_id: UserId, kind: RoomEventKind, payload: serde_json::Value) {
    let _ = server
        .store
        .append_event(RoomEventRow {
            room_id: room_id.clone(),
            user_id,
            event_type: kind,
            payload,
            at: Utc::now(),
        })
        .await;
}

/// `true` if `connection_id` is the room's current host connection.
async fn is_host(server: &SyncServer, room_id: &RoomId, connection_id: ConnectionId) -> bool {
    server
        .registry
        .with_room(room_id, |room| room.is_host_connection(connection_id))
        .await
        .unwrap_or(false)
}

pub(super) async fn recipients_of(server: &SyncServer, room_id: &RoomId) -> Vec<ConnectionId> {
    server
        .registry
        .snapshot(room_id)
        .await
        .map(|room| room.participants.keys().copied().collect())
        .unwrap_or_default()
}

pub async fn dispatch(server: &Arc<SyncServer>, connection_id: ConnectionId, event: ClientEvent) {
    let Some(user_id) = server.connections.user_of(&connection_id) else {
        return;
    };

    match event {
        ClientEvent::JoinRoom { room_id, role, file_hash } => {
            handle_join_room(server, connection_id, user_id, room_id, role, file_hash).await;
        }
        ClientEvent::HostPlay {
            room_id,
            position_sec,
            host_timestamp_ms,
            playback_rate,
        } => {
            if !is_host(server, &room_id, connection_id).await {
                send_error(server, connection_id, ErrorCode::Unauthorized).await;
                return;
            }
            let mut errors = validation::validate_host_timing(position_sec, host_timestamp_ms);
            if let Some(rate) = playback_rate {
                errors.extend(validation::validate_playback_rate(rate));
            }
            if !errors.is_empty() {
                send_error(server, connection_id, ErrorCode::InvalidPayload).await;
                return;
            }

            server
                .registry
                .with_room(&room_id, |room| {
                    room.current_position_sec = position_sec;
                    room.is_playing = true;
                })
                .await;

            let recipients: Vec<_> = recipients_of(server, &room_id)
                .await
                .into_iter()
                .filter(|id| *id != connection_id)
                .collect();
            let event = Arc::new(ServerEvent::HostPlay {
                position_sec,
                host_timestamp_ms,
                playback_rate,
            });
            server.connections.fan_out(&recipients, event).await;
            log_event(
                server,
                &room_id,
                user_id,
                RoomEventKind::Play,
                serde_json::json!({ "position_sec": position_sec }),
            )
            .await;
        }
        ClientEvent::HostPause {
            room_id,
            position_sec,
            host_timestamp_ms,
        } => {
            if !is_host(server, &room_id, connection_id).await {
                send_error(server, connection_id, ErrorCode::Unauthorized).await;
                return;
            }
            let errors = validation::validate_host_timing(position_sec, host_timestamp_ms);
            if !errors.is_empty() {
                send_error(server, connection_id, ErrorCode::InvalidPayload).await;
                return;
            }

            server
                .registry
                .with_room(&room_id, |room| {
                    room.current_position_sec = position_sec;
                    room.is_playing = false;
                })
                .await;

            let recipients: Vec<_> = recipients_of(server, &room_id)
                .await
                .into_iter()
                .filter(|id| *id != connection_id)
                .collect();
            let event = Arc::new(ServerEvent::HostPause {
                position_sec,
                host_timestamp_ms,
                reason: None,
            });
            server.connections.fan_out(&recipients, event).await;
            log_event(
                server,
                &room_id,
                user_id,
                RoomEventKind::Pause,
                serde_json::json!({ "position_sec": position_sec }),
            )
            .await;
        }
        ClientEvent::HostSeek {
            room_id,
            position_sec,
            host_timestamp_ms,
        } => {
            if !is_host(server, &room_id, connection_id).await {
                send_error(server, connection_id, ErrorCode::Unauthorized).await;
                return;
            }
            let errors = validation::validate_host_timing(position_sec, host_timestamp_ms);
            if !errors.is_empty() {
                send_error(server, connection_id, ErrorCode::InvalidPayload).await;
                return;
            }

            server
                .registry
                .with_room(&room_id, |room| {
                    room.current_position_sec = position_sec;
                })
                .await;

            let recipients: Vec<_> = recipients_of(server, &room_id)
                .await
                .into_iter()
                .filter(|id| *id != connection_id)
                .collect();
            let event = Arc::new(ServerEvent::HostSeek {
                position_sec,
                host_timestamp_ms,
            });
            server.connections.fan_out(&recipients, event).await;
            log_event(
                server,
                &room_id,
                user_id,
                RoomEventKind::Seek,
                serde_json::json!({ "position_sec": position_sec }),
            )
            .await;
        }
        ClientEvent::HostTimeSync {
            room_id,
            position_sec,
            host_timestamp_ms,
            is_playing,
        } => {
            // Unauthorized mismatches are silently dropped here (§4.2) to
            // avoid storming the sender with errors on a high-rate event.
            if !is_host(server, &room_id, connection_id).await {
                return;
            }
            if !validation::validate_host_timing(position_sec, host_timestamp_ms).is_empty() {
                return;
            }

            server
                .registry
                .with_room(&room_id, |room| {
                    room.current_position_sec = position_sec;
                    room.is_playing = is_playing;
                })
                .await;

            let recipients: Vec<_> = recipients_of(server, &room_id)
                .await
                .into_iter()
                .filter(|id| *id != connection_id)
                .collect();
            let event = Arc::new(ServerEvent::HostTimeSync {
                position_sec,
                host_timestamp_ms,
                is_playing,
            });
            server.connections.fan_out(&recipients, event).await;
        }
        ClientEvent::HostSpeedChange { room_id, playback_rate } => {
            if !is_host(server, &room_id, connection_id).await {
                send_error(server, connection_id, ErrorCode::Unauthorized).await;
                return;
            }
            if !validation::validate_playback_rate(playback_rate).is_empty() {
                send_error(server, connection_id, ErrorCode::InvalidPayload).await;
                return;
            }

            let recipients: Vec<_> = recipients_of(server, &room_id)
                .await
                .into_iter()
                .filter(|id| *id != connection_id)
                .collect();
            let event = Arc::new(ServerEvent::HostSpeedChange { playback_rate });
            server.connections.fan_out(&recipients, event).await;
        }
        ClientEvent::Ping { nonce, ts } => {
            let event = Arc::new(ServerEvent::Pong {
                nonce,
                client_ts: ts,
                server_ts: Utc::now().timestamp_millis(),
            });
            server.connections.send_to(&connection_id, event).await;
        }
        ClientEvent::Reaction { room_id, kind } => {
            if server.connections.room_of(&connection_id).as_ref() != Some(&room_id) {
                send_error(server, connection_id, ErrorCode::Unauthorized).await;
                return;
            }
            let recipients: Vec<_> = recipients_of(server, &room_id)
                .await
                .into_iter()
                .filter(|id| *id != connection_id)
                .collect();
            let event = Arc::new(ServerEvent::Reaction {
                user_id,
                kind,
                server_ts: Utc::now().timestamp_millis(),
            });
            server.connections.fan_out(&recipients, event).await;
        }
        ClientEvent::ChatMessage { room_id, text } => {
            if server.connections.room_of(&connection_id).as_ref() != Some(&room_id) {
                send_error(server, connection_id, ErrorCode::Unauthorized).await;
                return;
            }
            if !validation::validate_chat_message(&text).is_empty() {
                send_error(server, connection_id, ErrorCode::InvalidPayload).await;
                return;
            }

            let recipients = recipients_of(server, &room_id).await;
            let event = Arc::new(ServerEvent::ChatMessage {
                user_id,
                text: text.clone(),
                server_ts: Utc::now().timestamp_millis(),
            });
            server.connections.fan_out(&recipients, event).await;
            server.metrics.increment_chat_messages_relayed();
            log_event(
                server,
                &room_id,
                user_id,
                RoomEventKind::Chat,
                serde_json::json!({ "text": text }),
            )
            .await;
        }
        ClientEvent::LeaveRoom { room_id } => {
            grace_timer::handle_leave(server.clone(), room_id, connection_id).await;
        }
    }
}

async fn handle_join_room(
    server: &Arc<SyncServer>,
    connection_id: ConnectionId,
    user_id: UserId,
    room_id: RoomId,
    role: Role,
    file_hash: String,
) {
    if !validation::validate_join_room(&room_id, &file_hash).is_empty() {
        send_error(server, connection_id, ErrorCode::InvalidPayload).await;
        return;
    }

    let room = match server.store.get_room(&room_id).await {
        Err(_) => {
            send_error(server, connection_id, ErrorCode::StorageUnavailable).await;
            return;
        }
        Ok(None) => {
            send_error(server, connection_id, ErrorCode::RoomNotFound).await;
            return;
        }
        Ok(Some(room)) => room,
    };
    if !room.is_live(Utc::now()) {
        send_error(server, connection_id, ErrorCode::RoomExpired).await;
        return;
    }

    if role == Role::Follower && file_hash != room.host_file_hash {
        server
            .connections
            .send_to(
                &connection_id,
                Arc::new(ServerEvent::file_mismatch(&room.host_file_hash, &file_hash)),
            )
            .await;
        return;
    }
    if role == Role::Host && user_id != room.host_user_id {
        send_error(server, connection_id, ErrorCode::Unauthorized).await;
        return;
    }

    let room_existed_live = server.registry.contains(&room_id);
    let now = Utc::now();
    let outcome = server
        .registry
        .join(&room_id, room.host_user_id, connection_id, user_id, role, now)
        .await;

    server.connections.set_room(&connection_id, room_id.clone());
    if !room_existed_live {
        server.metrics.increment_active_rooms();
    }

    let _ = server
        .store
        .add_participant(ParticipantRecord {
            room_id: room_id.clone(),
            user_id,
            role,
            joined_at: now,
            left_at: None,
            is_connected: true,
            last_connection_id: Some(connection_id),
        })
        .await;

    if matches!(outcome, JoinOutcome::HostReconnected) {
        server.metrics.increment_grace_timers_cancelled();
        let recipients: Vec<_> = recipients_of(server, &room_id)
            .await
            .into_iter()
            .filter(|id| *id != connection_id)
            .collect();
        server
            .connections
            .fan_out(&recipients, Arc::new(ServerEvent::HostReconnected))
            .await;
    }

    let Some(live) = server.registry.snapshot(&room_id).await else {
        return;
    };
    let records = server.store.get_participants(&room_id).await.unwrap_or_default();
    let roster = merge_roster(&records, &live);

    let joined_event = Arc::new(ServerEvent::Joined {
        room_id: room_id.clone(),
        host_user_id: room.host_user_id,
        host_file_hash: room.host_file_hash.clone(),
        host_file_duration_ms: room.host_file_duration_ms,
        participants: roster,
        is_playing: live.is_playing,
        position_sec: live.current_position_sec,
    });
    let recipients: Vec<_> = live.participants.keys().copied().collect();
    server.connections.fan_out(&recipients, joined_event).await;

    log_event(
        server,
        &room_id,
        user_id,
        RoomEventKind::Join,
        serde_json::json!({ "role": role }),
    )
    .await;
}
