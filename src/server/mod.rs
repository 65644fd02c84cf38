//! The Synchronization/Signaling core, wired the way `EnhancedGameServer`
//! is: one struct owning the collaborators, `impl SyncServer` blocks split
//! into submodules by concern.

use std::collections::HashSet;
use std::net::IpAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use thiserror::Error;
use tokio::sync::{mpsc, RwLock};

use crate::auth::TokenVerifier;
use crate::config::RoomSyncConfig;
use crate::error::AppError;
use crate::metrics::RoomMetrics;
use crate::protocol::{ConnectionId, ServerEvent, UserId};
use crate::registry::RoomRegistry;
use crate::store::MetadataStore;

mod admission;
mod connection_manager;
mod grace_timer;
mod maintenance;
mod rate_limit;
mod signaling;

use rate_limit::AdmissionRateLimiter;

pub use admission::{
    CreateRoomInput, CreateRoomResult, LeaveTemporaryResult, RejoinSnapshot, RoomDetails,
    ValidateRoomResult,
};
pub(crate) use connection_manager::ConnectionManager;
pub use maintenance::spawn as spawn_maintenance;
pub use signaling::dispatch;

#[derive(Debug, Error)]
pub enum RegisterConnectionError {
    #[error("too many connections from this address ({current}/{limit})")]
    IpLimitExceeded { current: usize, limit: usize },
}

/// Top-level collaborator holder. Cheap to clone behind an `Arc`; every
/// background task and every connection handler holds one.
pub struct SyncServer {
    pub(crate) registry: RoomRegistry,
    pub(crate) connections: ConnectionManager,
    pub(crate) store: Arc<dyn MetadataStore>,
    pub(crate) token_verifier: Arc<dyn TokenVerifier>,
    pub(crate) metrics: Arc<RoomMetrics>,
    pub(crate) config: RoomSyncConfig,
    pub(crate) rate_limiter: AdmissionRateLimiter,
    /// Degraded-mode user set, consulted only when `store.upsert_user`
    /// fails (§4.1 "falls back to in-memory user set if store is down").
    memory_users: RwLock<HashSet<UserId>>,
    started_at: Instant,
}

impl SyncServer {
    pub fn new(
        config: RoomSyncConfig,
        store: Arc<dyn MetadataStore>,
        token_verifier: Arc<dyn TokenVerifier>,
        metrics: Arc<RoomMetrics>,
    ) -> Arc<Self> {
        let max_connections_per_ip = config.max_connections_per_ip;
        let rate_limiter =
            AdmissionRateLimiter::new(config.rate_limit_window, config.rate_limit_max_requests);
        Arc::new(Self {
            registry: RoomRegistry::new(),
            connections: ConnectionManager::new(max_connections_per_ip),
            store,
            token_verifier,
            metrics,
            config,
            rate_limiter,
            memory_users: RwLock::new(HashSet::new()),
            started_at: Instant::now(),
        })
    }

    /// Wall-clock time since this instance came up, reported by `GET /health`.
    pub fn uptime(&self) -> Duration {
        self.started_at.elapsed()
    }

    /// Admission rate limit for authenticated REST calls, keyed on caller
    /// (§5, `RATE_LIMIT_WINDOW_MS`/`RATE_LIMIT_MAX_REQUESTS`).
    pub(crate) fn check_admission_rate_limit(&self, user_id: UserId) -> Result<(), AppError> {
        if self.rate_limiter.check(user_id) {
            Ok(())
        } else {
            Err(AppError::RateLimited)
        }
    }

    async fn ensure_user_exists(&self, user_id: UserId) {
        if self.store.upsert_user(user_id).await.is_err() {
            self.metrics.increment_storage_fallbacks();
            self.memory_users.write().await.insert(user_id);
        }
    }

    pub fn config(&self) -> &RoomSyncConfig {
        &self.config
    }

    pub fn token_verifier(&self) -> &Arc<dyn TokenVerifier> {
        &self.token_verifier
    }

    pub fn metrics(&self) -> &Arc<RoomMetrics> {
        &self.metrics
    }

    /// Reserves the caller's per-IP connection slot and registers the
    /// connection, or rejects it outright if the limit is already hit
    /// (§5 "caps concurrent connections per client address").
    pub fn register_connection(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        sender: mpsc::Sender<Arc<ServerEvent>>,
        client_ip: IpAddr,
    ) -> Result<(), RegisterConnectionError> {
        self.connections
            .try_reserve_ip_slot(client_ip)
            .map_err(|current| RegisterConnectionError::IpLimitExceeded {
                current,
                limit: self.config.max_connections_per_ip,
            })?;
        self.connections.register(connection_id, user_id, sender, client_ip);
        self.metrics.increment_active_connections();
        Ok(())
    }

    /// Unregisters a connection and, if it was still in a room, runs the
    /// same leave path a `leaveRoom` event would (§4.3).
    pub async fn disconnect(self: &Arc<Self>, connection_id: ConnectionId) {
        let room_id = self.connections.room_of(&connection_id);
        self.connections.unregister(&connection_id);
        self.metrics.decrement_active_connections();
        if let Some(room_id) = room_id {
            grace_timer::handle_leave(self.clone(), room_id, connection_id).await;
        }
    }
}
