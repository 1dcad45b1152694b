//! Remuxer configuration

/// Default `server` value written into the synthetic `onMetaData` tag
pub const DEFAULT_SERVER_NAME: &str = "flv-relay";

/// Smallest usable event capacity: one packet emits up to two events
pub const MIN_EVENT_CAPACITY: usize = 2;

/// Configuration for a [`StreamRemuxer`](super::StreamRemuxer)
#[derive(Debug, Clone)]
pub struct RemuxerConfig {
    /// Descriptive string written as `server` in the synthetic metadata
    pub server_name: String,

    /// Capacity of the event channel per remuxer
    ///
    /// A packet emits at most two events. Subscribers that drain after every
    /// packet never come close; slower subscribers see `Lagged`. Values
    /// below [`MIN_EVENT_CAPACITY`] are raised to it.
    pub event_capacity: usize,
}

impl Default for RemuxerConfig {
    fn default() -> Self {
        Self {
            server_name: DEFAULT_SERVER_NAME.to_string(),
            event_capacity: 64,
        }
    }
}

impl RemuxerConfig {
    /// Create a new remuxer config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the `server` metadata value
    ///
    /// Truncated to 255 bytes (on a character boundary).
    pub fn server_name(mut self, name: impl Into<String>) -> Self {
        let mut name = name.into();
        if name.len() > 255 {
            let mut end = 255;
            while !name.is_char_boundary(end) {
                end -= 1;
            }
            name.truncate(end);
        }
        self.server_name = name;
        self
    }

    /// Set the event channel capacity
    pub fn event_capacity(mut self, capacity: usize) -> Self {
        self.event_capacity = capacity.max(MIN_EVENT_CAPACITY);
        self
    }
}
