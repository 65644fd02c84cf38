//! Always-available in-memory metadata store, grounded on
//! `database::InMemoryDatabase`: a handful of `RwLock`-guarded maps with
//! explicit lock-ordering discipline to keep cross-map state consistent
//! under concurrent access, rather than a single coarse lock.

use super::{MetadataStore, StoreError};
use crate::protocol::{ParticipantRecord, Role, Room, RoomEventRow, RoomId, UserId};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use tokio::sync::RwLock;

#[derive(Default)]
pub struct InMemoryMetadataStore {
    users: RwLock<HashSet<UserId>>,
    rooms: RwLock<HashMap<RoomId, Room>>,
    participants: RwLock<HashMap<(RoomId, UserId), ParticipantRecord>>,
    events: RwLock<Vec<RoomEventRow>>,
}

impl InMemoryMetadataStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl MetadataStore for InMemoryMetadataStore {
    async fn upsert_user(&self, user_id: UserId) -> Result<(), StoreError> {
        self.users.write().await.insert(user_id);
        Ok(())
    }

    async fn create_room(&self, room: Room) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        if rooms.contains_key(&room.id) {
            return Err(StoreError::IdCollision);
        }
        rooms.insert(room.id.clone(), room);
        Ok(())
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        Ok(self.rooms.read().await.get(room_id).cloned())
    }

    async fn close_room(&self, room_id: &RoomId) -> Result<(), StoreError> {
        let mut rooms = self.rooms.write().await;
        let room = rooms.get_mut(room_id).ok_or(StoreError::RoomNotFound)?;
        room.is_active = false;
        room.closed_at = Some(chrono::Utc::now());
        drop(rooms);

        let mut participants = self.participants.write().await;
        for record in participants
            .values_mut()
            .filter(|record| &record.room_id == room_id)
        {
            record.is_connected = false;
            record.left_at.get_or_insert(chrono::Utc::now());
        }
        Ok(())
    }

    async fn add_participant(&self, record: ParticipantRecord) -> Result<(), StoreError> {
        let key = (record.room_id.clone(), record.user_id);
        self.participants.write().await.insert(key, record);
        Ok(())
    }

    async fn set_participant_status(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        is_connected: bool,
    ) -> Result<(), StoreError> {
        let mut participants = self.participants.write().await;
        if let Some(record) = participants.get_mut(&(room_id.clone(), user_id)) {
            record.is_connected = is_connected;
            if !is_connected {
                record.left_at = Some(chrono::Utc::now());
            } else {
                record.left_at = None;
            }
        }
        Ok(())
    }

    async fn set_participant_role(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        role: Role,
    ) -> Result<(), StoreError> {
        let mut participants = self.participants.write().await;
        if let Some(record) = participants.get_mut(&(room_id.clone(), user_id)) {
            record.role = role;
        }
        Ok(())
    }

    async fn get_participants(
        &self,
        room_id: &RoomId,
    ) -> Result<Vec<ParticipantRecord>, StoreError> {
        Ok(self
            .participants
            .read()
            .await
            .values()
            .filter(|record| &record.room_id == room_id)
            .cloned()
            .collect())
    }

    async fn append_event(&self, event: RoomEventRow) -> Result<(), StoreError> {
        // Bounded so a pathological room can't grow this unboundedly in a
        // long-lived memory-only process; oldest events are dropped first,
        // which is acceptable since the log is explicitly best-effort.
        const MAX_BUFFERED_EVENTS: usize = 10_000;
        let mut events = self.events.write().await;
        if events.len() >= MAX_BUFFERED_EVENTS {
            events.remove(0);
        }
        events.push(event);
        Ok(())
    }
}
