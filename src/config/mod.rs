//! Configuration: types, defaults, environment loading, and startup
//! validation, split into submodules the same way as
//! `config::{types, defaults, loader, validation}`.

mod defaults;
mod loader;
mod types;
mod validation;

pub use defaults::{MAX_ROOM_ID_LENGTH, MIN_ROOM_ID_LENGTH, ROOM_ID_ALPHABET, ROOM_ID_GENERATION_ATTEMPTS};
pub use loader::load;
pub use types::{LoggingConfig, RoomSyncConfig};
pub use validation::validate;
