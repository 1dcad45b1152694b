//! Connection adapter backed by a bounded tokio mpsc channel
//!
//! The host drains the receiving half and writes each call to the network.
//! A viewer that stops draining fills its queue and starts failing its own
//! deliveries with [`InvokeError::Backpressure`] instead of stalling the room.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::{ConnectionId, RoomConnection};
use crate::error::InvokeError;
use crate::protocol::ServiceCall;

/// A [`RoomConnection`] that queues calls into an mpsc channel
#[derive(Debug)]
pub struct ChannelConnection {
    id: ConnectionId,
    service_capable: bool,
    tx: mpsc::Sender<ServiceCall>,
}

impl ChannelConnection {
    /// Create a service-capable connection with `capacity` queued calls
    pub fn new(id: ConnectionId, capacity: usize) -> (Arc<Self>, mpsc::Receiver<ServiceCall>) {
        Self::with_capability(id, capacity, true)
    }

    /// Create a connection with explicit remote-call capability
    pub fn with_capability(
        id: ConnectionId,
        capacity: usize,
        service_capable: bool,
    ) -> (Arc<Self>, mpsc::Receiver<ServiceCall>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        let conn = Arc::new(Self {
            id,
            service_capable,
            tx,
        });
        (conn, rx)
    }
}

impl RoomConnection for ChannelConnection {
    fn id(&self) -> ConnectionId {
        self.id
    }

    fn is_service_capable(&self) -> bool {
        self.service_capable
    }

    fn invoke(&self, call: ServiceCall) -> Result<(), InvokeError> {
        self.tx.try_send(call).map_err(|e| match e {
            mpsc::error::TrySendError::Full(_) => InvokeError::Backpressure,
            mpsc::error::TrySendError::Closed(_) => InvokeError::Disconnected,
        })
    }
}
