//! Room Registry (§2.3, §5): the in-memory mapping of active rooms to live
//! state. Shaped like `protocol::room_state::Room` /
//! `EnhancedGameServer`'s room-mutation methods, but re-keyed around host
//! authority instead of lobby/ready-state.
//!
//! **Shared resource policy.** Each room entry is its own mutual-exclusion
//! domain (`Mutex<LiveRoom>` behind a `DashMap` bucket), matching §5:
//! mutations happen inside the lock, fan-out enumerates recipients inside
//! the lock and then releases it before writing to transports.

use crate::protocol::{ConnectionId, RoomId, Role, UserId};
use chrono::{DateTime, Utc};
use dashmap::DashMap;
use std::collections::HashMap;
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct ParticipantEntry {
    pub user_id: UserId,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
}

/// In-memory, non-durable live state (§3 "Live Room State").
///
/// `epoch` is bumped every time `host_connection_id` changes (join,
/// reconnect, transfer) so a
/// stale grace-timer firing can recognize that the state it was scheduled
/// against has already moved on, without needing out-of-band cancellation
/// (see `server::grace_timer`).
#[derive(Debug, Clone)]
pub struct LiveRoom {
    pub host_connection_id: Option<ConnectionId>,
    pub host_user_id: UserId,
    pub participants: HashMap<ConnectionId, ParticipantEntry>,
    pub current_position_sec: f64,
    pub is_playing: bool,
    pub host_disconnected_at: Option<DateTime<Utc>>,
    pub epoch: u64,
}

impl LiveRoom {
    pub fn new(host_user_id: UserId) -> Self {
        Self {
            host_connection_id: None,
            host_user_id,
            participants: HashMap::new(),
            current_position_sec: 0.0,
            is_playing: false,
            host_disconnected_at: None,
            epoch: 0,
        }
    }

    pub fn is_host_connection(&self, connection_id: ConnectionId) -> bool {
        self.host_connection_id == Some(connection_id)
    }
}

pub enum JoinOutcome {
    /// First time this room entry sees a live connection (or the host
    /// re-joining after the room had never been live).
    Joined,
    /// A host connection joined while `host_disconnected_at` was set: the
    /// grace timer armed for that absence must now be ignored when it
    /// fires (see `epoch`).
    HostReconnected,
}

#[derive(Default)]
pub struct RoomRegistry {
    rooms: DashMap<RoomId, Mutex<LiveRoom>>,
}

impl RoomRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, room_id: &RoomId) -> bool {
        self.rooms.contains_key(room_id)
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Snapshot of every room id with a live registry entry, for the
    /// maintenance sweep (`server::maintenance`) to walk.
    pub fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Materializes the entry on first access, matching §3's "the live
    /// entry is lazily materialized on the first successful signaling
    /// join". Subsequent callers reuse the same entry.
    pub async fn join(
        &self,
        room_id: &RoomId,
        host_user_id: UserId,
        connection_id: ConnectionId,
        user_id: UserId,
        role: Role,
        joined_at: DateTime<Utc>,
    ) -> JoinOutcome {
        let entry = self
            .rooms
            .entry(room_id.clone())
            .or_insert_with(|| Mutex::new(LiveRoom::new(host_user_id)));
        let mut room = entry.lock().await;

        room.participants.insert(
            connection_id,
            ParticipantEntry {
                user_id,
                role,
                joined_at,
            },
        );

        if role == Role::Host {
            let was_disconnected = room.host_disconnected_at.is_some();
            room.host_connection_id = Some(connection_id);
            room.host_disconnected_at = None;
            room.epoch += 1;
            if was_disconnected {
                return JoinOutcome::HostReconnected;
            }
        }

        JoinOutcome::Joined
    }

    /// Runs `f` with exclusive access to the room's live state, returning
    /// `None` if the room has no live entry. Mutations to position/
    /// `is_playing` go through here so every call site enforces the host
    /// check at the same layer (`server::signaling`).
    pub async fn with_room<F, T>(&self, room_id: &RoomId, f: F) -> Option<T>
    where
        F: FnOnce(&mut LiveRoom) -> T,
    {
        let entry = self.rooms.get(room_id)?;
        let mut room = entry.lock().await;
        Some(f(&mut room))
    }

    pub async fn snapshot(&self, room_id: &RoomId) -> Option<LiveRoom> {
        let entry = self.rooms.get(room_id)?;
        let room = entry.lock().await;
        Some(room.clone())
    }

    /// Removes the connection from the room, returning whether it was the
    /// host connection and the room's current `is_playing`/position at the
    /// moment of removal, for the caller (`server::grace_timer`) to decide
    /// on Grace Timer arming and sympathetic-pause fan-out.
    pub async fn leave(
        &self,
        room_id: &RoomId,
        connection_id: ConnectionId,
    ) -> Option<LeaveOutcome> {
        let entry = self.rooms.get(room_id)?;
        let mut room = entry.lock().await;
        let removed = room.participants.remove(&connection_id)?;
        let was_host = room.is_host_connection(connection_id);

        if was_host {
            room.host_connection_id = None;
            room.host_disconnected_at = Some(Utc::now());
            room.epoch += 1;
        }

        Some(LeaveOutcome {
            user_id: removed.user_id,
            was_host,
            is_playing: room.is_playing,
            current_position_sec: room.current_position_sec,
            remaining_participants: room.participants.len(),
            epoch_after_leave: room.epoch,
        })
    }

    /// Removes the room entry entirely (grace timer fired with no
    /// remaining participants, or the host explicitly closed the room).
    pub fn remove(&self, room_id: &RoomId) {
        self.rooms.remove(room_id);
    }
}

pub struct LeaveOutcome {
    pub user_id: UserId,
    pub was_host: bool,
    pub is_playing: bool,
    pub current_position_sec: f64,
    pub remaining_participants: usize,
    pub epoch_after_leave: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn first_join_materializes_the_entry() {
        let registry = RoomRegistry::new();
        let host_id = uuid::Uuid::new_v4();
        let conn_id = uuid::Uuid::new_v4();
        assert!(!registry.contains(&"ABCDEF".to_string()));

        registry
            .join(&"ABCDEF".to_string(), host_id, conn_id, host_id, Role::Host, Utc::now())
            .await;

        assert!(registry.contains(&"ABCDEF".to_string()));
        let snap = registry.snapshot(&"ABCDEF".to_string()).await.unwrap();
        assert_eq!(snap.host_connection_id, Some(conn_id));
    }

    #[tokio::test]
    async fn host_leave_clears_connection_and_arms_disconnect() {
        let registry = RoomRegistry::new();
        let host_id = uuid::Uuid::new_v4();
        let conn_id = uuid::Uuid::new_v4();
        registry
            .join(&"ABCDEF".to_string(), host_id, conn_id, host_id, Role::Host, Utc::now())
            .await;

        let outcome = registry.leave(&"ABCDEF".to_string(), conn_id).await.unwrap();
        assert!(outcome.was_host);

        let snap = registry.snapshot(&"ABCDEF".to_string()).await.unwrap();
        assert!(snap.host_connection_id.is_none());
        assert!(snap.host_disconnected_at.is_some());
    }

    #[tokio::test]
    async fn host_rejoin_after_disconnect_is_reported_as_reconnected() {
        let registry = RoomRegistry::new();
        let host_id = uuid::Uuid::new_v4();
        let conn_a = uuid::Uuid::new_v4();
        let conn_b = uuid::Uuid::new_v4();
        registry
            .join(&"ABCDEF".to_string(), host_id, conn_a, host_id, Role::Host, Utc::now())
            .await;
        registry.leave(&"ABCDEF".to_string(), conn_a).await;

        let outcome = registry
            .join(&"ABCDEF".to_string(), host_id, conn_b, host_id, Role::Host, Utc::now())
            .await;
        assert!(matches!(outcome, JoinOutcome::HostReconnected));

        let snap = registry.snapshot(&"ABCDEF".to_string()).await.unwrap();
        assert!(snap.host_disconnected_at.is_none());
        assert_eq!(snap.host_connection_id, Some(conn_b));
    }

    #[tokio::test]
    async fn at_most_one_host_connection_per_room() {
        let registry = RoomRegistry::new();
        let host_id = uuid::Uuid::new_v4();
        let conn_id = uuid::Uuid::new_v4();
        let follower_conn = uuid::Uuid::new_v4();
        registry
            .join(&"ABCDEF".to_string(), host_id, conn_id, host_id, Role::Host, Utc::now())
            .await;
        registry
            .join(
                &"ABCDEF".to_string(),
                host_id,
                follower_conn,
                uuid::Uuid::new_v4(),
                Role::Follower,
                Utc::now(),
            )
            .await;

        let snap = registry.snapshot(&"ABCDEF".to_string()).await.unwrap();
        assert_eq!(snap.host_connection_id, Some(conn_id));
        assert_eq!(snap.participants.len(), 2);
    }
}
