//! Host runtime interfaces
//!
//! The relay does not own connections, rooms or ingest. The host supplies:
//! - a live roster of the connections in each room ([`RoomRoster`])
//! - a non-blocking remote-invoke primitive per connection ([`RoomConnection`])
//! - a handle on each incoming broadcast stream ([`BroadcastSource`])
//!
//! [`ChannelConnection`], [`SharedRoster`] and [`BroadcastHandle`] are
//! ready-made implementations backed by tokio primitives.

pub mod channel;
pub mod roster;
pub mod source;

use std::fmt;
use std::sync::Arc;

use crate::error::InvokeError;
use crate::protocol::ServiceCall;

pub use channel::ChannelConnection;
pub use roster::SharedRoster;
pub use source::BroadcastHandle;

/// Identity of a host connection
///
/// Only compared for equality; holding one never keeps the connection alive.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(pub u64);

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Identity of one incoming broadcast stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StreamId(pub u64);

impl fmt::Display for StreamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "stream-{}", self.0)
    }
}

/// A connection in a room, as seen by the relay
pub trait RoomConnection: Send + Sync {
    fn id(&self) -> ConnectionId;

    /// Whether this connection accepts application-level remote calls
    fn is_service_capable(&self) -> bool;

    /// Queue a remote call; must not block on network I/O
    fn invoke(&self, call: ServiceCall) -> Result<(), InvokeError>;
}

/// Live membership of one room
pub trait RoomRoster: Send + Sync {
    /// Snapshot of the connections currently in the room
    fn connections(&self) -> Vec<Arc<dyn RoomConnection>>;
}

/// An incoming broadcast stream
pub trait BroadcastSource: Send + Sync {
    fn id(&self) -> StreamId;

    /// Stop the stream at its source
    fn terminate(&self);
}
