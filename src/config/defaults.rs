//! Struct defaults, following the pattern of `ServerConfig::default()`
//! (sensible timeouts baked in, overridable by environment in `loader`).

use super::types::{LoggingConfig, RoomSyncConfig};
use std::time::Duration;

pub const DEFAULT_ROOM_ID_LENGTH: u8 = 6;
pub const MIN_ROOM_ID_LENGTH: u8 = 6;
pub const MAX_ROOM_ID_LENGTH: u8 = 8;

pub const DEFAULT_ROOM_EXPIRY_DAYS: u32 = 7;
pub const MIN_ROOM_EXPIRY_DAYS: u32 = 1;
pub const MAX_ROOM_EXPIRY_DAYS: u32 = 30;

pub const DEFAULT_HOST_RECONNECT_GRACE_MS: u64 = 300_000;

pub const ROOM_ID_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
pub const ROOM_ID_GENERATION_ATTEMPTS: u32 = 10;

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            rust_log: "info".to_string(),
            json: false,
            ansi: true,
            log_dir: None,
        }
    }
}

impl Default for RoomSyncConfig {
    fn default() -> Self {
        Self {
            port: 8080,
            room_id_length: DEFAULT_ROOM_ID_LENGTH,
            room_expiry_days_default: DEFAULT_ROOM_EXPIRY_DAYS,
            host_reconnect_grace: Duration::from_millis(DEFAULT_HOST_RECONNECT_GRACE_MS),
            socket_ping_interval: Duration::from_secs(25),
            socket_ping_timeout: Duration::from_secs(60),
            rate_limit_window: Duration::from_secs(60),
            rate_limit_max_requests: 120,
            max_connections_per_ip: 16,
            cors_origins: "*".to_string(),
            database_url: None,
            metrics_auth_token: None,
            admission_timeout: Duration::from_secs(30),
            identity_provider_url: None,
            logging: LoggingConfig::default(),
        }
    }
}
