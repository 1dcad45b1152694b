//! FLV remuxing
//!
//! One [`StreamRemuxer`] runs per active broadcast. It converts packets to
//! FLV tags, detects codecs and maintains the [`BootstrapState`] that new
//! viewers are primed with.

pub mod bootstrap;
pub mod codec;
pub mod config;
pub mod remuxer;

pub use bootstrap::BootstrapState;
pub use codec::CodecState;
pub use config::RemuxerConfig;
pub use remuxer::{PacketOutcome, RemuxEvent, StreamRemuxer};
