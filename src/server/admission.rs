//! Admission Service (§4.1): the synchronous request/response surface
//! consumed by `http::handlers`. Every operation here is storage-aware:
//! non-essential writes degrade rather than fail the caller (§4.4, §7).

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::auth::{hash_passcode, secrets_match, verify_passcode};
use crate::config;
use crate::error::AppError;
use crate::protocol::{
    validation, Codec, ParticipantRecord, ParticipantView, Room, RoomId, ServerEvent, UserId,
};
use crate::protocol::room_codes::generate_candidate_with;
use crate::registry::LiveRoom;

use super::SyncServer;

pub struct CreateRoomInput {
    pub host_id: UserId,
    pub file_hash: String,
    pub duration_ms: u64,
    pub file_size: u64,
    pub codec: Codec,
    pub expires_in_days: u32,
    pub passcode: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateRoomResult {
    pub room_id: RoomId,
    pub share_url: String,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ValidateRoomResult {
    pub room_id: RoomId,
    pub is_active: bool,
    pub host_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub requires_passcode: bool,
    pub hash_matches: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomDetails {
    pub room_id: RoomId,
    pub is_active: bool,
    pub host_user_id: UserId,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub requires_passcode: bool,
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RejoinSnapshot {
    pub room_id: RoomId,
    pub video_id: String,
    #[serde(rename = "playbackState")]
    pub is_playing: bool,
    #[serde(rename = "currentPosition")]
    pub current_position_sec: f64,
    pub participants: Vec<ParticipantView>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LeaveTemporaryResult {
    pub success: bool,
    pub paused: bool,
}

fn share_url(room_id: &str) -> String {
    format!("room/{room_id}")
}

fn participant_views(records: &[ParticipantRecord]) -> Vec<ParticipantView> {
    records
        .iter()
        .map(|r| ParticipantView {
            user_id: r.user_id,
            role: r.role,
            is_online: r.is_connected,
        })
        .collect()
}

impl SyncServer {
    pub async fn create_room(&self, input: CreateRoomInput) -> Result<CreateRoomResult, AppError> {
        let errors = validation::validate_create_room(&validation::CreateRoomInput {
            file_hash: &input.file_hash,
            duration_ms: input.duration_ms as i64,
            file_size: input.file_size as i64,
            codec: &input.codec,
            expires_in_days: input.expires_in_days as i64,
            passcode: input.passcode.as_deref(),
        });
        if let Some(first) = errors.first() {
            return Err(AppError::InvalidPayload(first.message.clone()));
        }

        self.ensure_user_exists(input.host_id).await;

        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(input.expires_in_days as i64);
        let passcode_hash = input.passcode.as_deref().map(hash_passcode);

        let room_id = self.allocate_room_id().await?;

        let room = Room {
            id: room_id.clone(),
            host_user_id: input.host_id,
            host_file_hash: input.file_hash,
            host_file_duration_ms: input.duration_ms,
            host_file_size: input.file_size,
            host_file_codec: input.codec,
            passcode_hash,
            created_at: now,
            expires_at,
            closed_at: None,
            is_active: true,
        };

        if self.store.create_room(room).await.is_err() {
            self.metrics.increment_storage_fallbacks();
        }
        self.metrics.increment_rooms_created();

        Ok(CreateRoomResult {
            room_id: room_id.clone(),
            share_url: share_url(&room_id),
            expires_at,
        })
    }

    async fn allocate_room_id(&self) -> Result<RoomId, AppError> {
        self.allocate_room_id_with(&mut rand::rng()).await
    }

    /// Retries room-id generation up to `ROOM_ID_GENERATION_ATTEMPTS` times
    /// on collision (§4.1). A collision is detected by attempting the
    /// insert and reading back `Err(StoreError::IdCollision)`, but since
    /// the id is also the registry key we check the registry first to
    /// avoid a wasted store round trip.
    ///
    /// Generic over the RNG so the exhaustion path (`RoomIdExhausted` after
    /// ten consecutive collisions) can be driven deterministically in tests.
    pub(crate) async fn allocate_room_id_with<R: rand::Rng + ?Sized>(
        &self,
        rng: &mut R,
    ) -> Result<RoomId, AppError> {
        for _ in 0..config::ROOM_ID_GENERATION_ATTEMPTS {
            let candidate = generate_candidate_with(self.config.room_id_length, rng);
            if !self.registry.contains(&candidate)
                && matches!(self.store.get_room(&candidate).await, Ok(None))
            {
                return Ok(candidate);
            }
        }
        Err(AppError::RoomIdExhausted)
    }

    pub async fn validate_room(
        &self,
        room_id: &RoomId,
        file_hash: Option<&str>,
        passcode: Option<&str>,
    ) -> Result<ValidateRoomResult, AppError> {
        let room = self.load_live_room(room_id).await?;

        if room.requires_passcode() {
            match passcode {
                None => return Err(AppError::PasscodeRequired),
                Some(supplied) => {
                    let stored = room.passcode_hash.as_deref().unwrap_or_default();
                    if !verify_passcode(supplied, stored) {
                        return Err(AppError::InvalidPasscode);
                    }
                }
            }
        }

        let hash_matches = file_hash
            .map(|hash| secrets_match(hash, &room.host_file_hash))
            .unwrap_or(false);

        Ok(ValidateRoomResult {
            room_id: room.id.clone(),
            is_active: room.is_active,
            host_user_id: room.host_user_id,
            created_at: room.created_at,
            expires_at: room.expires_at,
            requires_passcode: room.requires_passcode(),
            hash_matches,
        })
    }

    pub async fn room_details(&self, room_id: &RoomId) -> Result<RoomDetails, AppError> {
        let room = self.load_live_room(room_id).await?;
        let participants = self
            .store
            .get_participants(room_id)
            .await
            .unwrap_or_default();

        Ok(RoomDetails {
            room_id: room.id.clone(),
            is_active: room.is_active,
            host_user_id: room.host_user_id,
            created_at: room.created_at,
            expires_at: room.expires_at,
            requires_passcode: room.requires_passcode(),
            participants: participant_views(&participants),
        })
    }

    /// Unauthenticated existence probe (§6 footnote resolution: split from
    /// the authenticated detail fetch).
    pub async fn probe_room(&self, room_id: &RoomId) -> Result<bool, AppError> {
        let room = self
            .store
            .get_room(room_id)
            .await
            .map_err(|_| AppError::StorageUnavailable)?
            .ok_or(AppError::RoomNotFound)?;
        Ok(room.is_live(Utc::now()))
    }

    pub async fn close_room(&self, room_id: &RoomId, caller_id: UserId) -> Result<(), AppError> {
        let room = self.load_live_room_allow_inactive(room_id).await?;
        if room.host_user_id != caller_id {
            return Err(AppError::Unauthorized("only the host may close the room".into()));
        }

        if self.store.close_room(room_id).await.is_err() {
            self.metrics.increment_storage_fallbacks();
        }
        self.registry.remove(room_id);
        self.metrics.increment_rooms_closed();
        Ok(())
    }

    pub async fn rejoin(&self, room_id: &RoomId, caller_id: UserId) -> Result<RejoinSnapshot, AppError> {
        let room = self.load_live_room(room_id).await?;

        if self
            .store
            .set_participant_status(room_id, caller_id, true)
            .await
            .is_err()
        {
            self.metrics.increment_storage_fallbacks();
        }

        let live = self.registry.snapshot(room_id).await;
        let participants = self
            .store
            .get_participants(room_id)
            .await
            .unwrap_or_default();

        let (is_playing, current_position_sec) = match live {
            Some(LiveRoom {
                is_playing,
                current_position_sec,
                ..
            }) => (is_playing, current_position_sec),
            None => (false, 0.0),
        };

        Ok(RejoinSnapshot {
            room_id: room.id.clone(),
            video_id: room.host_file_hash.clone(),
            is_playing,
            current_position_sec,
            participants: participant_views(&participants),
        })
    }

    /// Always best-effort (§4.1): succeeds even when the room isn't live.
    pub async fn leave_temporary(&self, room_id: &RoomId, caller_id: UserId) -> LeaveTemporaryResult {
        if self
            .store
            .set_participant_status(room_id, caller_id, false)
            .await
            .is_err()
        {
            self.metrics.increment_storage_fallbacks();
        }

        let paused = self
            .registry
            .with_room(room_id, |room| {
                let was_playing = room.is_playing;
                room.is_playing = false;
                was_playing
            })
            .await
            .unwrap_or(false);

        if paused {
            self.fan_out_sympathetic_pause(room_id).await;
        }

        LeaveTemporaryResult {
            success: true,
            paused,
        }
    }

    /// Fans out a synthetic `hostPause` so the host appears paused in
    /// sympathy with a caller going temporarily offline (§4.1, §4.3).
    async fn fan_out_sympathetic_pause(&self, room_id: &RoomId) {
        let Some(room) = self.registry.snapshot(room_id).await else {
            return;
        };
        let recipients: Vec<_> = room.participants.keys().copied().collect();
        let event = Arc::new(ServerEvent::HostPause {
            position_sec: room.current_position_sec,
            host_timestamp_ms: Utc::now().timestamp_millis(),
            reason: Some("Participant left".to_string()),
        });
        self.connections.fan_out(&recipients, event).await;
    }

    async fn load_live_room(&self, room_id: &RoomId) -> Result<Room, AppError> {
        let room = self
            .store
            .get_room(room_id)
            .await
            .map_err(|_| AppError::StorageUnavailable)?
            .ok_or(AppError::RoomNotFound)?;
        if !room.is_live(Utc::now()) {
            return Err(AppError::RoomExpired);
        }
        Ok(room)
    }

    /// Like `load_live_room` but tolerates an already-inactive room, for
    /// `close` (§4.1: "idempotent; double-close succeeds").
    async fn load_live_room_allow_inactive(&self, room_id: &RoomId) -> Result<Room, AppError> {
        self.store
            .get_room(room_id)
            .await
            .map_err(|_| AppError::StorageUnavailable)?
            .ok_or(AppError::RoomNotFound)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::StaticTokenVerifier;
    use crate::config::RoomSyncConfig;
    use crate::metrics::RoomMetrics;
    use crate::store::InMemoryMetadataStore;

    /// Always reports zero entropy, so every candidate id collides with
    /// whatever id the registry already holds.
    struct ZeroRng;

    impl rand::RngCore for ZeroRng {
        fn next_u32(&mut self) -> u32 {
            0
        }

        fn next_u64(&mut self) -> u64 {
            0
        }

        fn fill_bytes(&mut self, dest: &mut [u8]) {
            dest.fill(0);
        }

        fn try_fill_bytes(&mut self, dest: &mut [u8]) -> Result<(), rand::Error> {
            dest.fill(0);
            Ok(())
        }
    }

    #[tokio::test]
    async fn ten_consecutive_collisions_exhaust_the_room_id_space() {
        let store: Arc<dyn crate::store::MetadataStore> = Arc::new(InMemoryMetadataStore::new());
        let token_verifier = Arc::new(StaticTokenVerifier::new(Vec::new()));
        let metrics = Arc::new(RoomMetrics::new());
        let server = SyncServer::new(RoomSyncConfig::default(), store, token_verifier, metrics);

        let colliding_id = generate_candidate_with(server.config.room_id_length, &mut ZeroRng);
        let host_id = uuid::Uuid::new_v4();
        server
            .registry
            .join(
                &colliding_id,
                host_id,
                uuid::Uuid::new_v4(),
                host_id,
                crate::protocol::Role::Host,
                Utc::now(),
            )
            .await;

        let result = server.allocate_room_id_with(&mut ZeroRng).await;
        assert!(matches!(result, Err(AppError::RoomIdExhausted)));
    }
}
