//! Metadata Store Adapter (§4.4): a façade over a relational store with
//! transactions and JSON columns, reserved for future expansion in the
//! codebase (`database::DatabaseConfig` has a single `InMemory` variant) and
//! completed here with a real durable implementation.
//!
//! The capability marker traits below (blanket-implemented over anything
//! that implements [`MetadataStore`]) mirror a
//! `database::{RoomStore, ParticipantStore, ...}` slicing idiom: callers
//! that only need room operations can depend on `dyn RoomStore` rather
//! than the full trait.

mod memory;
#[cfg(feature = "postgres")]
mod postgres;

pub use memory::InMemoryMetadataStore;
#[cfg(feature = "postgres")]
pub use postgres::PostgresMetadataStore;

use crate::protocol::{ParticipantRecord, Role, Room, RoomEventRow, RoomId, UserId};
use async_trait::async_trait;

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("store unavailable")]
    Unavailable,
    #[error("room not found")]
    RoomNotFound,
    #[error("id collision")]
    IdCollision,
}

#[async_trait]
pub trait MetadataStore: Send + Sync {
    /// Idempotent upsert; callers fall back to an in-memory user set if
    /// this fails (see `server::admission::create_room`).
    async fn upsert_user(&self, user_id: UserId) -> Result<(), StoreError>;

    async fn create_room(&self, room: Room) -> Result<(), StoreError>;

    async fn get_room(&self, room_id: &RoomId) -> Result<Option<Room>, StoreError>;

    /// Two logical statements in one call: mark the room inactive/closed,
    /// then mark every participant disconnected.
    async fn close_room(&self, room_id: &RoomId) -> Result<(), StoreError>;

    /// Insert-or-update on `(room_id, user_id)`.
    async fn add_participant(&self, record: ParticipantRecord) -> Result<(), StoreError>;

    async fn set_participant_status(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        is_connected: bool,
    ) -> Result<(), StoreError>;

    async fn set_participant_role(
        &self,
        room_id: &RoomId,
        user_id: UserId,
        role: Role,
    ) -> Result<(), StoreError>;

    async fn get_participants(&self, room_id: &RoomId) -> Result<Vec<ParticipantRecord>, StoreError>;

    /// Best-effort; failures here must never propagate out of the
    /// Admission or Hub call sites (§4.4, §7 "Storage failures during
    /// best-effort writes... are logged and swallowed").
    async fn append_event(&self, event: RoomEventRow) -> Result<(), StoreError>;
}

pub trait RoomStore: MetadataStore {}
impl<T: MetadataStore + ?Sized> RoomStore for T {}

pub trait ParticipantStore: MetadataStore {}
impl<T: MetadataStore + ?Sized> ParticipantStore for T {}

pub trait EventLogStore: MetadataStore {}
impl<T: MetadataStore + ?Sized> EventLogStore for T {}
