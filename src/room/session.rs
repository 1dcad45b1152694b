//! Room session
//!
//! A room has at most one broadcaster. While a broadcast is active its
//! packets run through a [`StreamRemuxer`] and every remuxer event is fanned
//! out to the room's viewers before the packet call returns:
//!
//! - `BootstrapChanged` resends the full bootstrap (`flvHeader`, then
//!   `flvMetaData` for the metadata tag and each seed tag)
//! - `PacketProduced` sends one `flvData`
//!
//! Viewers are resolved from the host roster at every send: everyone in the
//! room except the broadcaster and connections that cannot take remote calls.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use tokio::sync::broadcast::error::TryRecvError;
use tokio::sync::{broadcast, Mutex, RwLock};

use crate::host::{BroadcastSource, ConnectionId, RoomConnection, RoomRoster, StreamId};
use crate::media::MediaPacket;
use crate::protocol::ServiceCall;
use crate::remux::{BootstrapState, PacketOutcome, RemuxEvent, StreamRemuxer};
use crate::stats::RoomStats;

use super::config::RoomConfig;
use super::error::RoomError;
use super::RoomId;

/// Remuxer of an active broadcast and this room's subscription to it
struct Pipeline {
    remuxer: StreamRemuxer,
    events: broadcast::Receiver<RemuxEvent>,
}

/// The broadcast currently occupying a room
struct ActiveBroadcast {
    broadcaster: ConnectionId,
    source: Arc<dyn BroadcastSource>,
    stream: StreamId,
    started_at: Instant,
    pipeline: Mutex<Pipeline>,
}

#[derive(Default)]
struct RoomCounters {
    broadcasts_started: AtomicU64,
    broadcasts_rejected: AtomicU64,
    packets_discarded: AtomicU64,
    calls_delivered: AtomicU64,
    delivery_failures: AtomicU64,
}

/// Fan-out controller for one room
pub struct RoomSession {
    room_id: RoomId,
    roster: Arc<dyn RoomRoster>,
    config: RoomConfig,

    /// Idle when `None`; written only by broadcast start and stop
    slot: RwLock<Option<Arc<ActiveBroadcast>>>,

    counters: RoomCounters,
}

impl RoomSession {
    /// Create an idle session for `room_id`
    pub fn new(
        room_id: impl Into<RoomId>,
        roster: Arc<dyn RoomRoster>,
        config: RoomConfig,
    ) -> Self {
        Self {
            room_id: room_id.into(),
            roster,
            config,
            slot: RwLock::new(None),
            counters: RoomCounters::default(),
        }
    }

    pub fn room_id(&self) -> &str {
        &self.room_id
    }

    pub fn config(&self) -> &RoomConfig {
        &self.config
    }

    /// Whether a broadcast is active
    pub async fn is_active(&self) -> bool {
        self.slot.read().await.is_some()
    }

    /// Connection currently broadcasting, if any
    pub async fn broadcaster(&self) -> Option<ConnectionId> {
        self.slot.read().await.as_ref().map(|a| a.broadcaster)
    }

    /// Bootstrap a viewer connecting now would receive
    pub async fn current_bootstrap(&self) -> Option<Arc<BootstrapState>> {
        let slot = self.slot.read().await;
        let active = slot.as_ref()?;
        let pipeline = active.pipeline.lock().await;
        Some(pipeline.remuxer.current_bootstrap())
    }

    /// Start a broadcast from `conn`
    ///
    /// Rejects the new stream when the room already has a broadcaster: the
    /// incoming source is terminated and the current broadcast is untouched.
    pub async fn start_broadcast(
        &self,
        conn: ConnectionId,
        source: Arc<dyn BroadcastSource>,
    ) -> Result<(), RoomError> {
        let mut slot = self.slot.write().await;

        if let Some(active) = slot.as_ref() {
            self.counters.broadcasts_rejected.fetch_add(1, Ordering::Relaxed);
            tracing::warn!(
                room = %self.room_id,
                connection = %conn,
                stream = %source.id(),
                current = %active.broadcaster,
                "Broadcast rejected, room already has a broadcaster"
            );
            source.terminate();
            return Err(RoomError::AlreadyBroadcasting {
                room: self.room_id.clone(),
                current: active.broadcaster,
            });
        }

        let remuxer = match StreamRemuxer::new(self.config.remuxer.clone()) {
            Ok(remuxer) => remuxer,
            Err(e) => {
                tracing::error!(
                    room = %self.room_id,
                    connection = %conn,
                    error = %e,
                    "Failed to create remuxer"
                );
                source.terminate();
                return Err(e.into());
            }
        };
        let events = remuxer.subscribe();
        let stream = source.id();

        *slot = Some(Arc::new(ActiveBroadcast {
            broadcaster: conn,
            source,
            stream,
            started_at: Instant::now(),
            pipeline: Mutex::new(Pipeline { remuxer, events }),
        }));
        self.counters.broadcasts_started.fetch_add(1, Ordering::Relaxed);

        tracing::info!(
            room = %self.room_id,
            connection = %conn,
            stream = %stream,
            "Broadcast started"
        );

        Ok(())
    }

    /// Stop the broadcast of `conn`
    ///
    /// Viewers receive `flvEnd`. Returns false, doing nothing, when `conn`
    /// is not the current broadcaster. Once this returns no event of the
    /// stopped broadcast reaches a viewer.
    pub async fn stop_broadcast(&self, conn: ConnectionId) -> bool {
        match self.detach(Some(conn), true).await {
            Some(active) => {
                self.log_stopped(&active, "Broadcast stopped").await;
                true
            }
            None => {
                tracing::debug!(
                    room = %self.room_id,
                    connection = %conn,
                    "Ignoring stop from a connection that is not broadcasting"
                );
                false
            }
        }
    }

    /// Feed one packet of the stream `stream`
    ///
    /// Returns `None` when `stream` is not the active broadcast; such packets
    /// (late packets of a stopped broadcast, a rejected second stream) are
    /// discarded.
    pub async fn on_packet(&self, stream: StreamId, packet: &MediaPacket) -> Option<PacketOutcome> {
        let slot = self.slot.read().await;

        let Some(active) = slot.as_ref().filter(|a| a.stream == stream) else {
            self.counters.packets_discarded.fetch_add(1, Ordering::Relaxed);
            tracing::trace!(
                room = %self.room_id,
                stream = %stream,
                "Discarding packet without active broadcast"
            );
            return None;
        };

        let mut pipeline = active.pipeline.lock().await;
        let outcome = pipeline.remuxer.on_packet(packet);

        loop {
            match pipeline.events.try_recv() {
                Ok(RemuxEvent::BootstrapChanged) => {
                    let bootstrap = pipeline.remuxer.current_bootstrap();
                    tracing::debug!(
                        room = %self.room_id,
                        seeds = bootstrap.seeds().len(),
                        "Resending bootstrap"
                    );
                    self.fan_out(active.broadcaster, &bootstrap.calls());
                }
                Ok(RemuxEvent::PacketProduced(tag)) => {
                    self.fan_out(active.broadcaster, &[ServiceCall::FlvData(tag)]);
                }
                Err(TryRecvError::Lagged(skipped)) => {
                    // A dropped BootstrapChanged would leave viewers without
                    // the header for the new codecs; resend it
                    let bootstrap = pipeline.remuxer.current_bootstrap();
                    tracing::warn!(
                        room = %self.room_id,
                        skipped = skipped,
                        "Remuxer events lagged, resending bootstrap"
                    );
                    self.fan_out(active.broadcaster, &bootstrap.calls());
                }
                Err(TryRecvError::Empty) | Err(TryRecvError::Closed) => break,
            }
        }

        Some(outcome)
    }

    /// Prime a newly connected viewer
    ///
    /// Sends the current bootstrap to `conn` alone. Returns false when the
    /// room is idle, the connection cannot take remote calls, or delivery
    /// failed.
    pub async fn connect(&self, conn: &dyn RoomConnection) -> bool {
        if !conn.is_service_capable() {
            tracing::debug!(
                room = %self.room_id,
                connection = %conn.id(),
                "Connection cannot receive remote calls"
            );
            return false;
        }

        let slot = self.slot.read().await;
        let Some(active) = slot.as_ref() else {
            return false;
        };

        let bootstrap = active.pipeline.lock().await.remuxer.current_bootstrap();
        let delivered = self.deliver(conn, &bootstrap.calls());

        tracing::debug!(
            room = %self.room_id,
            connection = %conn.id(),
            seeds = bootstrap.seeds().len(),
            delivered = delivered,
            "Viewer connected"
        );

        delivered
    }

    /// Handle a connection leaving the room
    ///
    /// The broadcaster leaving ends its broadcast; returns true in that case.
    pub async fn disconnect(&self, conn: ConnectionId) -> bool {
        match self.detach(Some(conn), true).await {
            Some(active) => {
                self.log_stopped(&active, "Broadcaster disconnected, broadcast stopped")
                    .await;
                true
            }
            None => false,
        }
    }

    /// End any active broadcast; used when the room closes
    ///
    /// The broadcast source is terminated since its room no longer exists.
    pub async fn shutdown(&self) {
        if let Some(active) = self.detach(None, self.config.end_on_close).await {
            active.source.terminate();
            self.log_stopped(&active, "Room closed, broadcast stopped").await;
        }
    }

    /// Snapshot of the room's statistics
    pub async fn stats(&self) -> RoomStats {
        let mut stats = RoomStats {
            room_id: self.room_id.clone(),
            broadcasts_started: self.counters.broadcasts_started.load(Ordering::Relaxed),
            broadcasts_rejected: self.counters.broadcasts_rejected.load(Ordering::Relaxed),
            packets_discarded: self.counters.packets_discarded.load(Ordering::Relaxed),
            calls_delivered: self.counters.calls_delivered.load(Ordering::Relaxed),
            delivery_failures: self.counters.delivery_failures.load(Ordering::Relaxed),
            ..Default::default()
        };

        let slot = self.slot.read().await;
        if let Some(active) = slot.as_ref() {
            let pipeline = active.pipeline.lock().await;
            let codecs = pipeline.remuxer.codecs();

            stats.broadcaster = Some(active.broadcaster);
            stats.stream = Some(active.stream);
            stats.video_codec_id = codecs.video_codec_id;
            stats.audio_codec_id = codecs.audio_codec_id;
            stats.broadcast_duration = active.started_at.elapsed();
            stats.remuxer = pipeline.remuxer.stats().clone();
        }

        stats
    }

    /// Clear the slot if it holds `conn`'s broadcast (any broadcast for
    /// `None`), optionally sending `flvEnd` to the viewers
    async fn detach(
        &self,
        conn: Option<ConnectionId>,
        send_end: bool,
    ) -> Option<Arc<ActiveBroadcast>> {
        let mut slot = self.slot.write().await;

        let matches = match (slot.as_ref(), conn) {
            (Some(active), Some(conn)) => active.broadcaster == conn,
            (Some(_), None) => true,
            (None, _) => false,
        };
        if !matches {
            return None;
        }

        let active = slot.take()?;
        if send_end {
            self.fan_out(active.broadcaster, &[ServiceCall::FlvEnd]);
        }
        Some(active)
    }

    async fn log_stopped(&self, active: &ActiveBroadcast, message: &'static str) {
        let pipeline = active.pipeline.lock().await;
        let stats = pipeline.remuxer.stats();

        tracing::info!(
            room = %self.room_id,
            connection = %active.broadcaster,
            stream = %active.stream,
            duration_secs = active.started_at.elapsed().as_secs(),
            tags = stats.tags_produced(),
            bytes = stats.bytes_produced,
            faults = stats.processing_faults,
            "{}",
            message
        );
    }

    /// Connections that receive fan-out right now
    fn viewers(&self, broadcaster: ConnectionId) -> Vec<Arc<dyn RoomConnection>> {
        self.roster
            .connections()
            .into_iter()
            .filter(|c| c.id() != broadcaster && c.is_service_capable())
            .collect()
    }

    fn fan_out(&self, broadcaster: ConnectionId, calls: &[ServiceCall]) {
        for viewer in self.viewers(broadcaster) {
            self.deliver(viewer.as_ref(), calls);
        }
    }

    /// Send `calls` in order; a failure skips the rest for this viewer
    fn deliver(&self, viewer: &dyn RoomConnection, calls: &[ServiceCall]) -> bool {
        for call in calls {
            if let Err(e) = viewer.invoke(call.clone()) {
                self.counters.delivery_failures.fetch_add(1, Ordering::Relaxed);
                tracing::warn!(
                    room = %self.room_id,
                    connection = %viewer.id(),
                    method = call.method(),
                    error = %e,
                    "Delivery to viewer failed"
                );
                return false;
            }
            self.counters.calls_delivered.fetch_add(1, Ordering::Relaxed);
        }
        true
    }
}
