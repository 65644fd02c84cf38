//! Exercises the "store down" degraded-mode paths (§4.1, §4.4, §7):
//! non-essential metadata writes must fail silently and fall back, never
//! surfacing a failure to the caller for operations with a memory-only
//! fallback.


use async_trait::async_trait;
use room_sync_core::auth::{StaticTokenVerifier, VerifiedIdentity};
use room_sync_core::metrics::RoomMetrics;
use room_sync_core::protocol::{Codec, ParticipantRecord, Role, Room, RoomEventRow, RoomId, UserId};
use room_sync_core::server::{CreateRoomInput, SyncServer};
use room_sync_core::store::{InMemoryMetadataStore, MetadataStore, StoreError};
use std::sync::Arc;
use uuid::Uuid;

/// Wraps an in-memory store and fails every write while still answering
/// reads, standing in for "the Postgres pool is unreachable but we can
/// still check the registry" during admission.
struct FlakyMetadataStore {
    inner: InMemoryMetadataStore,
}

#[async_trait]
impl MetadataStore for FlakyMetadataStore {
    async fn upsert_user(&self, _user_id: UserId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn create_room(&self, _room: Room) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError> {
        self.inner.get_room(room_id).await
    }

    async fn close_room(&self, _room_id: &RoomId) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn add_participant(&self, _record: ParticipantRecord) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn set_participant_status(
        &self,
        _room_id: &RoomId,
        _user_id: UserId,
        _is_connected: bool,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn set_participant_role(
        &self,
        _room_id: &RoomId,
        _user_id: UserId,
        _role: Role,
    ) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn get_participants(&self, _room_id: &RoomId) -> Result<Vec<ParticipantRecord>, StoreError> {
        Err(StoreError::Unavailable)
    }

    async fn append_event(&self, _event: RoomEventRow) -> Result<(), StoreError> {
        Err(StoreError::Unavailable)
    }
}

fn test_codec() -> Codec {
    Codec {
        video: "h264".to_string(),
        audio: "aac".to_string(),
        resolution: None,
    }
}

#[tokio::test]
async fn room_creation_succeeds_with_fallback_metrics_when_the_store_is_down() {
    let host_id = Uuid::new_v4();
    let store: Arc<dyn MetadataStore> = Arc::new(FlakyMetadataStore {
        inner: InMemoryMetadataStore::new(),
    });
    let token_verifier = Arc::new(StaticTokenVerifier::new(vec![(
        "tok".to_string(),
        VerifiedIdentity {
            user_id: host_id,
            email: None,
            phone: None,
        },
    )]));
    let metrics = Arc::new(RoomMetrics::new());
    let server = SyncServer::new(
        room_sync_core::config::RoomSyncConfig::default(),
        store,
        token_verifier,
        metrics.clone(),
    );

    let result = server
        .create_room(CreateRoomInput {
            host_id,
            file_hash: "hash".to_string(),
            duration_ms: 1000,
            file_size: 1000,
            codec: test_codec(),
            expires_in_days: 7,
            passcode: None,
        })
        .await
        .expect("room creation must not fail just because the durable store is down");

    assert!(!result.room_id.is_empty());
    let snapshot = metrics.snapshot();
    assert!(
        snapshot.storage_fallbacks >= 2,
        "expected both upsert_user and create_room to count as storage fallbacks, got {}",
        snapshot.storage_fallbacks
    );
}

#[tokio::test]
async fn leave_temporary_is_always_best_effort_even_with_the_store_down() {
    let caller_id = Uuid::new_v4();
    let store: Arc<dyn MetadataStore> = Arc::new(FlakyMetadataStore {
        inner: InMemoryMetadataStore::new(),
    });
    let token_verifier = Arc::new(StaticTokenVerifier::new(Vec::new()));
    let metrics = Arc::new(RoomMetrics::new());
    let server = SyncServer::new(
        room_sync_core::config::RoomSyncConfig::default(),
        store,
        token_verifier,
        metrics,
    );

    let result = server.leave_temporary(&"NOPE".to_string(), caller_id).await;
    assert!(result.success);
    assert!(!result.paused);
}
