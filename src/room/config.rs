//! Room configuration
//!
//! Shared by every room a [`RoomRegistry`](super::RoomRegistry) opens.

use crate::remux::RemuxerConfig;

/// Configuration for room sessions
#[derive(Debug, Clone)]
pub struct RoomConfig {
    /// Configuration for the remuxer created per broadcast
    pub remuxer: RemuxerConfig,

    /// Send `flvEnd` to viewers when a room closes mid-broadcast
    ///
    /// When false the viewers are left to notice the room going away through
    /// the host's own connection teardown.
    pub end_on_close: bool,
}

impl Default for RoomConfig {
    fn default() -> Self {
        Self {
            remuxer: RemuxerConfig::default(),
            end_on_close: true,
        }
    }
}

impl RoomConfig {
    /// Create a new room config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the remuxer configuration
    pub fn remuxer(mut self, config: RemuxerConfig) -> Self {
        self.remuxer = config;
        self
    }

    /// Set the `server` metadata value
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        self.remuxer = self.remuxer.server_name(name);
        self
    }

    /// Set whether closing a room ends its broadcast for viewers
    pub fn end_on_close(mut self, enabled: bool) -> Self {
        self.end_on_close = enabled;
        self
    }
}
