//! Process-wide counters, in the shape of `ServerMetrics`: a struct
//! of `AtomicU64` counters, a JSON snapshot for `/metrics`, and a
//! Prometheus text-exposition snapshot for `/metrics/prom`.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Default)]
pub struct RoomMetrics {
    active_rooms: AtomicU64,
    active_connections: AtomicU64,
    rooms_created: AtomicU64,
    rooms_closed: AtomicU64,
    grace_timers_armed: AtomicU64,
    grace_timers_cancelled: AtomicU64,
    grace_timers_fired: AtomicU64,
    host_transfers: AtomicU64,
    storage_fallbacks: AtomicU64,
    chat_messages_relayed: AtomicU64,
}

#[derive(Serialize)]
pub struct MetricsSnapshot {
    pub active_rooms: u64,
    pub active_connections: u64,
    pub rooms_created: u64,
    pub rooms_closed: u64,
    pub grace_timers_armed: u64,
    pub grace_timers_cancelled: u64,
    pub grace_timers_fired: u64,
    pub host_transfers: u64,
    pub storage_fallbacks: u64,
    pub chat_messages_relayed: u64,
}

impl RoomMetrics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn increment_active_rooms(&self) {
        self.active_rooms.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_rooms(&self) {
        self.active_rooms.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn increment_active_connections(&self) {
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decrement_active_connections(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_created(&self) {
        self.rooms_created.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_rooms_closed(&self) {
        self.rooms_closed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_grace_timers_armed(&self) {
        self.grace_timers_armed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_grace_timers_cancelled(&self) {
        self.grace_timers_cancelled.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_grace_timers_fired(&self) {
        self.grace_timers_fired.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_host_transfers(&self) {
        self.host_transfers.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_storage_fallbacks(&self) {
        self.storage_fallbacks.fetch_add(1, Ordering::Relaxed);
    }

    pub fn increment_chat_messages_relayed(&self) {
        self.chat_messages_relayed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            active_rooms: self.active_rooms.load(Ordering::Relaxed),
            active_connections: self.active_connections.load(Ordering::Relaxed),
            rooms_created: self.rooms_created.load(Ordering::Relaxed),
            rooms_closed: self.rooms_closed.load(Ordering::Relaxed),
            grace_timers_armed: self.grace_timers_armed.load(Ordering::Relaxed),
            grace_timers_cancelled: self.grace_timers_cancelled.load(Ordering::Relaxed),
            grace_timers_fired: self.grace_timers_fired.load(Ordering::Relaxed),
            host_transfers: self.host_transfers.load(Ordering::Relaxed),
            storage_fallbacks: self.storage_fallbacks.load(Ordering::Relaxed),
            chat_messages_relayed: self.chat_messages_relayed.load(Ordering::Relaxed),
        }
    }

    pub fn to_prometheus_text(&self) -> String {
        let snap = self.snapshot();
        format!(
            "# TYPE room_sync_active_rooms gauge\nroom_sync_active_rooms {}\n\
             # TYPE room_sync_active_connections gauge\nroom_sync_active_connections {}\n\
             # TYPE room_sync_rooms_created_total counter\nroom_sync_rooms_created_total {}\n\
             # TYPE room_sync_rooms_closed_total counter\nroom_sync_rooms_closed_total {}\n\
             # TYPE room_sync_grace_timers_armed_total counter\nroom_sync_grace_timers_armed_total {}\n\
             # TYPE room_sync_grace_timers_cancelled_total counter\nroom_sync_grace_timers_cancelled_total {}\n\
             # TYPE room_sync_grace_timers_fired_total counter\nroom_sync_grace_timers_fired_total {}\n\
             # TYPE room_sync_host_transfers_total counter\nroom_sync_host_transfers_total {}\n\
             # TYPE room_sync_storage_fallbacks_total counter\nroom_sync_storage_fallbacks_total {}\n\
             # TYPE room_sync_chat_messages_relayed_total counter\nroom_sync_chat_messages_relayed_total {}\n",
            snap.active_rooms,
            snap.active_connections,
            snap.rooms_created,
            snap.rooms_closed,
            snap.grace_timers_armed,
            snap.grace_timers_cancelled,
            snap.grace_timers_fired,
            snap.host_transfers,
            snap.storage_fallbacks,
            snap.chat_messages_relayed,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn counters_increment_and_snapshot() {
        let m = RoomMetrics::new();
        m.increment_rooms_created();
        m.increment_rooms_created();
        m.increment_active_rooms();
        m.decrement_active_rooms();
        let snap = m.snapshot();
        assert_eq!(snap.rooms_created, 2);
        assert_eq!(snap.active_rooms, 0);
    }

    #[test]
    fn prometheus_text_contains_metric_names() {
        let m = RoomMetrics::new();
        let text = m.to_prometheus_text();
        assert!(text.contains("room_sync_active_rooms"));
        assert!(text.contains("room_sync_grace_timers_fired_total"));
    }
}
