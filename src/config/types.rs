//! Configuration value types, split from `loader`/`defaults` in the
//! style of keeping `config::types` separate from `config::loader`.

use serde::Serialize;
use std::time::Duration;

#[derive(Debug, Clone, Serialize)]
pub struct RoomSyncConfig {
    pub port: u16,
    pub room_id_length: u8,
    pub room_expiry_days_default: u32,
    pub host_reconnect_grace: Duration,
    pub socket_ping_interval: Duration,
    pub socket_ping_timeout: Duration,
    pub rate_limit_window: Duration,
    pub rate_limit_max_requests: u32,
    pub max_connections_per_ip: usize,
    pub cors_origins: String,
    pub database_url: Option<String>,
    pub metrics_auth_token: Option<String>,
    pub admission_timeout: Duration,
    /// Base URL of the external identity provider the core forwards bearer
    /// tokens to (§1: token issuance is out of scope, verification is not).
    /// `None` runs with [`crate::auth::StaticTokenVerifier`] instead, for
    /// local development and tests.
    pub identity_provider_url: Option<String>,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct LoggingConfig {
    pub rust_log: String,
    pub json: bool,
    pub ansi: bool,
    pub log_dir: Option<String>,
}
