//! Wire types, validation, and room id generation. Split into
//! `protocol::{types, messages, room_codes, validation, error_codes}`.

pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use messages::{ClientEvent, ReactionKind, ServerEvent};
pub use types::{
    Codec, ConnectionId, ParticipantRecord, ParticipantView, Role, Room, RoomEventKind,
    RoomEventRow, RoomId, UserId,
};
