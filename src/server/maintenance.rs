//! Periodic maintenance: lazily-expired rooms are already treated as dead
//! wherever they're read (`Room::is_live`), but a left-behind live registry
//! entry for a room nobody ever explicitly closed would otherwise sit
//! around forever. This sweep reclaims those.

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tracing::{debug, warn};

use super::SyncServer;

const SWEEP_INTERVAL: Duration = Duration::from_secs(60);

/// Spawns the background sweep loop. Intended to run for the lifetime of
/// the process; cancelled implicitly when the runtime shuts down.
pub fn spawn(server: Arc<SyncServer>) {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(SWEEP_INTERVAL);
        loop {
            ticker.tick().await;
            sweep_once(&server).await;
        }
    });
}

async fn sweep_once(server: &Arc<SyncServer>) {
    let room_ids = server.registry.room_ids();
    let now = Utc::now();
    let mut reclaimed = 0u64;

    for room_id in room_ids {
        let is_empty = server
            .registry
            .snapshot(&room_id)
            .await
            .map(|room| room.participants.is_empty())
            .unwrap_or(true);
        if !is_empty {
            continue;
        }

        match server.store.get_room(&room_id).await {
            Ok(Some(room)) if room.is_live(now) => continue,
            Ok(_) => {}
            Err(err) => {
                warn!(%room_id, %err, "maintenance sweep could not check room liveness, leaving entry in place");
                continue;
            }
        }

        server.registry.remove(&room_id);
        server.metrics.decrement_active_rooms();
        reclaimed += 1;
    }

    if reclaimed > 0 {
        debug!(reclaimed, "maintenance sweep reclaimed empty, expired room entries");
    }
}
