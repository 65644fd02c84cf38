//! Grace Timer Subsystem (§4.3): shared leave handling for both explicit
//! `leaveRoom` events and WebSocket disconnects, plus the delayed host
//! promotion/room teardown that follows a host's disconnect.

use std::sync::Arc;

use chrono::Utc;

use crate::protocol::{ConnectionId, RoomId, Role, ServerEvent};

use super::signaling::{merge_roster, recipients_of};
use super::SyncServer;

/// Runs on `leaveRoom` and on raw socket close alike (§4.3: "the same leave
/// path handles both a graceful `leaveRoom` event and an unexpected
/// disconnect").
pub async fn handle_leave(server: Arc<SyncServer>, room_id: RoomId, connection_id: ConnectionId) {
    let Some(outcome) = server.registry.leave(&room_id, connection_id).await else {
        return;
    };
    server.connections.clear_room(&connection_id);

    let _ = server
        .store
        .set_participant_status(&room_id, outcome.user_id, false)
        .await;

    let records = server.store.get_participants(&room_id).await.unwrap_or_default();
    let live = server.registry.snapshot(&room_id).await;
    let roster = live.as_ref().map(|l| merge_roster(&records, l)).unwrap_or_default();

    let recipients = recipients_of(&server, &room_id).await;
    server
        .connections
        .fan_out(
            &recipients,
            Arc::new(ServerEvent::ParticipantLeft {
                user_id: outcome.user_id,
                participants: roster,
                was_host: outcome.was_host,
            }),
        )
        .await;

    if outcome.was_host {
        server.metrics.increment_grace_timers_armed();
        let grace_period_ms = server.config.host_reconnect_grace.as_millis() as u64;
        server
            .connections
            .fan_out(
                &recipients,
                Arc::new(ServerEvent::HostDisconnected { grace_period_ms }),
            )
            .await;
        arm_grace_timer(server.clone(), room_id, outcome.epoch_after_leave);
    } else if outcome.is_playing {
        // A non-host participant dropping mid-playback still reads as the
        // host going quiet from everyone else's perspective, so pause in
        // sympathy (§4.3) rather than leave followers stuck on stale state.
        server
            .registry
            .with_room(&room_id, |room| room.is_playing = false)
            .await;
        server
            .connections
            .fan_out(
                &recipients,
                Arc::new(ServerEvent::HostPause {
                    position_sec: outcome.current_position_sec,
                    host_timestamp_ms: Utc::now().timestamp_millis(),
                    reason: Some("Participant left".to_string()),
                }),
            )
            .await;
    }
}

/// Spawns the delayed follow-up to a host disconnect. `epoch` pins this
/// timer to the registry state as observed at arm time: if the room has
/// moved on (host reconnected, room already torn down) by the time the
/// timer fires, it's a no-op rather than racing the newer state.
fn arm_grace_timer(server: Arc<SyncServer>, room_id: RoomId, epoch: u64) {
    let grace_period = server.config.host_reconnect_grace;
    tokio::spawn(async move {
        tokio::time::sleep(grace_period).await;

        let Some(room) = server.registry.snapshot(&room_id).await else {
            server.metrics.increment_grace_timers_cancelled();
            return;
        };
        if room.epoch != epoch || room.host_connection_id.is_some() || room.host_disconnected_at.is_none() {
            server.metrics.increment_grace_timers_cancelled();
            return;
        }

        server.metrics.increment_grace_timers_fired();

        if room.participants.is_empty() {
            server.registry.remove(&room_id);
            server.metrics.decrement_active_rooms();
            let _ = server.store.close_room(&room_id).await;
            return;
        }

        let Some((new_host_connection_id, entry)) = room
            .participants
            .iter()
            .min_by_key(|(_, entry)| entry.joined_at)
            .map(|(id, entry)| (*id, entry.clone()))
        else {
            return;
        };

        let promoted = server
            .registry
            .with_room(&room_id, |room| {
                if room.epoch != epoch || room.host_connection_id.is_some() {
                    return false;
                }
                room.host_connection_id = Some(new_host_connection_id);
                room.host_user_id = entry.user_id;
                room.host_disconnected_at = None;
                room.epoch += 1;
                true
            })
            .await
            .unwrap_or(false);
        if !promoted {
            return;
        }

        let _ = server
            .store
            .set_participant_role(&room_id, entry.user_id, Role::Host)
            .await;
        server.metrics.increment_host_transfers();

        let recipients = recipients_of(&server, &room_id).await;
        server
            .connections
            .fan_out(
                &recipients,
                Arc::new(ServerEvent::HostTransferred {
                    new_host_user_id: entry.user_id,
                    reason: "host disconnected past the grace period".to_string(),
                }),
            )
            .await;
    });
}
