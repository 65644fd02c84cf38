//! Environment-driven config loading, following the style of the
//! `config::loader` (env-first, struct-default fallback).

use super::types::{LoggingConfig, RoomSyncConfig};
use std::time::Duration;

fn env_u64(key: &str, default: u64) -> u64 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u32(key: &str, default: u32) -> u32 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u16(key: &str, default: u16) -> u16 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_u8(key: &str, default: u8) -> u8 {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

fn env_string(key: &str, default: &str) -> String {
    std::env::var(key).unwrap_or_else(|_| default.to_string())
}

fn env_bool(key: &str, default: bool) -> bool {
    std::env::var(key)
        .ok()
        .map(|v| matches!(v.to_lowercase().as_str(), "1" | "true" | "yes"))
        .unwrap_or(default)
}

/// Load configuration from the process environment, falling back to
/// [`RoomSyncConfig::default`] for anything unset.
pub fn load() -> RoomSyncConfig {
    let defaults = RoomSyncConfig::default();

    RoomSyncConfig {
        port: env_u16("PORT", defaults.port),
        room_id_length: env_u8("ROOM_ID_LENGTH", defaults.room_id_length),
        room_expiry_days_default: env_u32(
            "ROOM_EXPIRY_DAYS",
            defaults.room_expiry_days_default,
        ),
        host_reconnect_grace: Duration::from_millis(env_u64(
            "HOST_RECONNECT_GRACE_MS",
            defaults.host_reconnect_grace.as_millis() as u64,
        )),
        socket_ping_interval: Duration::from_secs(env_u64(
            "SOCKET_PING_INTERVAL",
            defaults.socket_ping_interval.as_secs(),
        )),
        socket_ping_timeout: Duration::from_secs(env_u64(
            "SOCKET_PING_TIMEOUT",
            defaults.socket_ping_timeout.as_secs(),
        )),
        rate_limit_window: Duration::from_millis(env_u64(
            "RATE_LIMIT_WINDOW_MS",
            defaults.rate_limit_window.as_millis() as u64,
        )),
        rate_limit_max_requests: env_u32(
            "RATE_LIMIT_MAX_REQUESTS",
            defaults.rate_limit_max_requests,
        ),
        max_connections_per_ip: env_u32(
            "MAX_CONNECTIONS_PER_IP",
            defaults.max_connections_per_ip as u32,
        ) as usize,
        cors_origins: env_string("CORS_ORIGIN", &defaults.cors_origins),
        database_url: std::env::var("DATABASE_URL").ok(),
        metrics_auth_token: std::env::var("METRICS_AUTH_TOKEN").ok(),
        admission_timeout: defaults.admission_timeout,
        identity_provider_url: std::env::var("IDENTITY_PROVIDER_URL").ok(),
        logging: LoggingConfig {
            rust_log: env_string("RUST_LOG", &defaults.logging.rust_log),
            json: env_bool("LOG_FORMAT_JSON", defaults.logging.json),
            ansi: env_bool("LOG_ANSI", defaults.logging.ansi),
            log_dir: std::env::var("LOG_DIR").ok(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_helpers_fall_back_to_default_when_unset() {
        assert_eq!(env_u16("ROOM_SYNC_CORE_TEST_UNSET_PORT", 1234), 1234);
        assert_eq!(env_string("ROOM_SYNC_CORE_TEST_UNSET_STR", "x"), "x");
    }
}
