//! Room registry
//!
//! Maps room ids to their [`RoomSession`]s. Owned by the host's service
//! lifecycle: rooms are opened and closed alongside the host's own rooms,
//! and the host forwards its lifecycle hooks through here.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::RwLock;

use crate::host::{BroadcastSource, ConnectionId, RoomConnection, RoomRoster, StreamId};
use crate::media::MediaPacket;
use crate::remux::PacketOutcome;
use crate::stats::RoomStats;

use super::config::RoomConfig;
use super::error::RoomError;
use super::session::RoomSession;
use super::RoomId;

/// Registry of open rooms
///
/// The map lock is only held for lookups; sessions are used after it is
/// released, so rooms never wait on each other.
pub struct RoomRegistry {
    rooms: RwLock<HashMap<RoomId, Arc<RoomSession>>>,
    config: RoomConfig,
}

impl RoomRegistry {
    /// Create a new room registry with default configuration
    pub fn new() -> Self {
        Self::with_config(RoomConfig::default())
    }

    /// Create a new room registry with custom configuration
    pub fn with_config(config: RoomConfig) -> Self {
        Self {
            rooms: RwLock::new(HashMap::new()),
            config,
        }
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Open a room, or return the session of an already open one
    pub async fn open_room(
        &self,
        room_id: impl Into<RoomId>,
        roster: Arc<dyn RoomRoster>,
    ) -> Arc<RoomSession> {
        let room_id = room_id.into();
        let mut rooms = self.rooms.write().await;

        if let Some(session) = rooms.get(&room_id) {
            tracing::debug!(room = %room_id, "Room already open");
            return Arc::clone(session);
        }

        let session = Arc::new(RoomSession::new(
            room_id.clone(),
            roster,
            self.config.clone(),
        ));
        rooms.insert(room_id.clone(), Arc::clone(&session));

        tracing::info!(room = %room_id, rooms = rooms.len(), "Room opened");
        session
    }

    /// Close a room, ending its broadcast if one is active
    ///
    /// Returns false if the room was not open.
    pub async fn close_room(&self, room_id: &str) -> bool {
        let session = self.rooms.write().await.remove(room_id);

        match session {
            Some(session) => {
                session.shutdown().await;
                tracing::info!(room = %room_id, "Room closed");
                true
            }
            None => false,
        }
    }

    /// Get the session of an open room
    pub async fn get(&self, room_id: &str) -> Option<Arc<RoomSession>> {
        self.rooms.read().await.get(room_id).cloned()
    }

    pub async fn room_count(&self) -> usize {
        self.rooms.read().await.len()
    }

    pub async fn room_ids(&self) -> Vec<RoomId> {
        self.rooms.read().await.keys().cloned().collect()
    }

    /// Route a broadcast start
    ///
    /// A broadcast outside any open room is refused by terminating its source.
    pub async fn start_broadcast(
        &self,
        room_id: &str,
        conn: ConnectionId,
        source: Arc<dyn BroadcastSource>,
    ) -> Result<(), RoomError> {
        let Some(session) = self.get(room_id).await else {
            tracing::warn!(
                room = %room_id,
                connection = %conn,
                stream = %source.id(),
                "Broadcast rejected, room is not open"
            );
            source.terminate();
            return Err(RoomError::RoomNotFound(room_id.to_string()));
        };

        session.start_broadcast(conn, source).await
    }

    /// Route a broadcast stop; returns whether a broadcast was stopped
    pub async fn stop_broadcast(&self, room_id: &str, conn: ConnectionId) -> bool {
        match self.get(room_id).await {
            Some(session) => session.stop_broadcast(conn).await,
            None => false,
        }
    }

    /// Route one packet
    pub async fn on_packet(
        &self,
        room_id: &str,
        stream: StreamId,
        packet: &MediaPacket,
    ) -> Option<PacketOutcome> {
        let session = self.get(room_id).await?;
        session.on_packet(stream, packet).await
    }

    /// Route a viewer connect
    ///
    /// Fails for a room that is not open so the host can refuse the
    /// connection. Otherwise returns whether a bootstrap was delivered.
    pub async fn connect(
        &self,
        room_id: &str,
        conn: &dyn RoomConnection,
    ) -> Result<bool, RoomError> {
        let session = self
            .get(room_id)
            .await
            .ok_or_else(|| RoomError::RoomNotFound(room_id.to_string()))?;

        Ok(session.connect(conn).await)
    }

    /// Route a disconnect
    pub async fn disconnect(&self, room_id: &str, conn: ConnectionId) -> bool {
        match self.get(room_id).await {
            Some(session) => session.disconnect(conn).await,
            None => false,
        }
    }

    /// Statistics of one room
    pub async fn room_stats(&self, room_id: &str) -> Option<RoomStats> {
        let session = self.get(room_id).await?;
        Some(session.stats().await)
    }

    /// Statistics of every open room
    pub async fn all_stats(&self) -> Vec<RoomStats> {
        let sessions: Vec<Arc<RoomSession>> = self.rooms.read().await.values().cloned().collect();

        let mut stats = Vec::with_capacity(sessions.len());
        for session in sessions {
            stats.push(session.stats().await);
        }
        stats
    }

    /// Close every room
    pub async fn shutdown(&self) {
        let sessions: Vec<Arc<RoomSession>> =
            self.rooms.write().await.drain().map(|(_, s)| s).collect();

        for session in &sessions {
            session.shutdown().await;
        }

        tracing::info!(rooms = sessions.len(), "Room registry shut down");
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new()
    }
}
