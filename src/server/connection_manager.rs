//! Per-connection bookkeeping: senders, current room, and per-IP accounting.
//! Shaped like `server::connection_manager::ConnectionManager`, re-keyed on
//! [`ConnectionId`] so the same user can hold multiple live connections
//! (e.g. across a reconnect race) without the registry confusing them.

use std::net::IpAddr;
use std::sync::Arc;

use dashmap::DashMap;
use tokio::sync::mpsc;

use crate::protocol::{ConnectionId, RoomId, ServerEvent, UserId};

#[derive(Clone)]
pub(crate) struct ClientConnection {
    pub room_id: Option<RoomId>,
    pub user_id: UserId,
    pub sender: mpsc::Sender<Arc<ServerEvent>>,
    pub client_ip: IpAddr,
}

pub(crate) struct ConnectionManager {
    clients: DashMap<ConnectionId, ClientConnection>,
    connections_per_ip: DashMap<IpAddr, usize>,
    max_connections_per_ip: usize,
}

impl ConnectionManager {
    pub fn new(max_connections_per_ip: usize) -> Self {
        Self {
            clients: DashMap::new(),
            connections_per_ip: DashMap::new(),
            max_connections_per_ip,
        }
    }

    pub fn try_reserve_ip_slot(&self, ip: IpAddr) -> Result<(), usize> {
        let mut entry = self.connections_per_ip.entry(ip).or_insert(0);
        if *entry >= self.max_connections_per_ip {
            return Err(*entry);
        }
        *entry += 1;
        Ok(())
    }

    fn release_ip_slot(&self, ip: IpAddr) {
        if let Some(mut entry) = self.connections_per_ip.get_mut(&ip) {
            *entry = entry.saturating_sub(1);
        }
    }

    pub fn register(
        &self,
        connection_id: ConnectionId,
        user_id: UserId,
        sender: mpsc::Sender<Arc<ServerEvent>>,
        client_ip: IpAddr,
    ) {
        self.clients.insert(
            connection_id,
            ClientConnection {
                room_id: None,
                user_id,
                sender,
                client_ip,
            },
        );
    }

    pub fn unregister(&self, connection_id: &ConnectionId) {
        if let Some((_, connection)) = self.clients.remove(connection_id) {
            self.release_ip_slot(connection.client_ip);
        }
    }

    pub fn set_room(&self, connection_id: &ConnectionId, room_id: RoomId) {
        if let Some(mut connection) = self.clients.get_mut(connection_id) {
            connection.room_id = Some(room_id);
        }
    }

    pub fn clear_room(&self, connection_id: &ConnectionId) {
        if let Some(mut connection) = self.clients.get_mut(connection_id) {
            connection.room_id = None;
        }
    }

    pub fn room_of(&self, connection_id: &ConnectionId) -> Option<RoomId> {
        self.clients.get(connection_id).and_then(|c| c.room_id.clone())
    }

    pub fn user_of(&self, connection_id: &ConnectionId) -> Option<UserId> {
        self.clients.get(connection_id).map(|c| c.user_id)
    }

    pub async fn send_to(&self, connection_id: &ConnectionId, event: Arc<ServerEvent>) {
        let sender = self.clients.get(connection_id).map(|c| c.sender.clone());
        if let Some(sender) = sender {
            let _ = sender.send(event).await;
        }
    }

    /// Sends `event` to every connection id in `recipients`, skipping any
    /// that disconnected between the registry snapshot and this call.
    pub async fn fan_out(&self, recipients: &[ConnectionId], event: Arc<ServerEvent>) {
        for connection_id in recipients {
            self.send_to(connection_id, event.clone()).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::Ipv4Addr;

    #[tokio::test]
    async fn register_then_send_delivers_event() {
        let manager = ConnectionManager::new(10);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (tx, mut rx) = mpsc::channel(4);
        let conn_id = uuid::Uuid::new_v4();
        manager.register(conn_id, uuid::Uuid::new_v4(), tx, ip);

        manager
            .send_to(&conn_id, Arc::new(ServerEvent::HostReconnected))
            .await;
        assert!(rx.recv().await.is_some());
    }

    #[test]
    fn ip_slot_limit_is_enforced() {
        let manager = ConnectionManager::new(1);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        assert!(manager.try_reserve_ip_slot(ip).is_ok());
        assert!(manager.try_reserve_ip_slot(ip).is_err());
    }

    #[test]
    fn unregister_frees_the_ip_slot() {
        let manager = ConnectionManager::new(1);
        let ip = IpAddr::V4(Ipv4Addr::LOCALHOST);
        let (tx, _rx) = mpsc::channel(4);
        let conn_id = uuid::Uuid::new_v4();
        manager.try_reserve_ip_slot(ip).unwrap();
        manager.register(conn_id, uuid::Uuid::new_v4(), tx, ip);
        manager.unregister(&conn_id);
        assert!(manager.try_reserve_ip_slot(ip).is_ok());
    }
}
