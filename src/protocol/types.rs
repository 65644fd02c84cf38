//! Core domain types shared by the Admission Service, Room Registry, and
//! Signaling Hub. Shaped like `protocol::types` (`PlayerId`/
//! `RoomId` aliases, small `Copy` structs for wire payloads).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Stable identifier of an authenticated user, resolved by the Token
/// Verifier. Distinct from [`ConnectionId`]: a user may reconnect under a
/// fresh connection while keeping the same `UserId`.
pub type UserId = Uuid;

/// Transient identifier of one live duplex connection. Assigned fresh by
/// the Signaling Hub on every WebSocket upgrade, parallel to a
/// per-connection `PlayerId` assigned in `register_client`.
pub type ConnectionId = Uuid;

/// Short opaque room identifier, drawn from [`crate::config::ROOM_ID_ALPHABET`].
pub type RoomId = String;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Host,
    Follower,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Codec {
    pub video: String,
    pub audio: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resolution: Option<String>,
}

/// Durable room row. Shaped like `protocol::room_state::Room`
/// but keyed on content binding (file hash) rather than game/lobby state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Room {
    pub id: RoomId,
    pub host_user_id: UserId,
    pub host_file_hash: String,
    pub host_file_duration_ms: u64,
    pub host_file_size: u64,
    pub host_file_codec: Codec,
    /// Salted hash; never the plaintext passcode.
    #[serde(skip_serializing)]
    pub passcode_hash: Option<String>,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub closed_at: Option<DateTime<Utc>>,
    pub is_active: bool,
}

impl Room {
    pub fn requires_passcode(&self) -> bool {
        self.passcode_hash.is_some()
    }

    /// `expires_at < now ⇒ is_active=false`, enforced lazily wherever a
    /// room is read rather than only by a background sweep.
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at >= now
    }
}

/// Durable participant projection row: `(room_id, user_id)` unique.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ParticipantRecord {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub role: Role,
    pub joined_at: DateTime<Utc>,
    pub left_at: Option<DateTime<Utc>>,
    pub is_connected: bool,
    pub last_connection_id: Option<ConnectionId>,
}

/// Append-only room event log row. Best-effort; loss does not affect the
/// correctness of the live system (see §3 Room Event Log).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub enum RoomEventKind {
    Play,
    Pause,
    Seek,
    Join,
    Leave,
    Reaction,
    Chat,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoomEventRow {
    pub room_id: RoomId,
    pub user_id: UserId,
    pub event_type: RoomEventKind,
    pub payload: serde_json::Value,
    pub at: DateTime<Utc>,
}

/// A public, room-listing-safe view of a participant for roster payloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParticipantView {
    pub user_id: UserId,
    pub role: Role,
    pub is_online: bool,
}
