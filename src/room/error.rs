//! Room error types

use crate::error::MediaError;
use crate::host::ConnectionId;

use super::RoomId;

/// Error type for room operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RoomError {
    /// No open room with this id
    RoomNotFound(RoomId),
    /// The room already has a broadcaster
    AlreadyBroadcasting { room: RoomId, current: ConnectionId },
    /// The remuxer for a new broadcast could not be built
    Remux(MediaError),
}

impl std::fmt::Display for RoomError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoomError::RoomNotFound(room) => write!(f, "Room not found: {}", room),
            RoomError::AlreadyBroadcasting { room, current } => {
                write!(f, "Room {} already has a broadcaster: {}", room, current)
            }
            RoomError::Remux(e) => write!(f, "Remuxer setup failed: {}", e),
        }
    }
}

impl std::error::Error for RoomError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            RoomError::Remux(e) => Some(e),
            _ => None,
        }
    }
}

impl From<MediaError> for RoomError {
    fn from(err: MediaError) -> Self {
        RoomError::Remux(err)
    }
}
