//! In-memory room roster

use std::sync::{Arc, RwLock};

use super::{ConnectionId, RoomConnection, RoomRoster};

/// A roster the host updates as connections join and leave a room
#[derive(Default)]
pub struct SharedRoster {
    connections: RwLock<Vec<Arc<dyn RoomConnection>>>,
}

impl SharedRoster {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a connection; a connection already present is replaced
    pub fn join(&self, conn: Arc<dyn RoomConnection>) {
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
        connections.retain(|c| c.id() != conn.id());
        connections.push(conn);
    }

    /// Remove a connection, returning whether it was present
    pub fn leave(&self, id: ConnectionId) -> bool {
        let mut connections = self.connections.write().unwrap_or_else(|e| e.into_inner());
        let before = connections.len();
        connections.retain(|c| c.id() != id);
        connections.len() != before
    }

    pub fn len(&self) -> usize {
        self.connections.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl RoomRoster for SharedRoster {
    fn connections(&self) -> Vec<Arc<dyn RoomConnection>> {
        self.connections.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}
