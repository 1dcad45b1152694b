//! flv-relay: room-scoped live FLV relay
//!
//! This library remuxes the media packets of a live broadcast into a
//! byte-exact FLV tag stream and fans the bytes out to the other connections
//! in the broadcaster's room through remote calls:
//! - `flvHeader` / `flvMetaData` bootstrap a viewer's decoder
//! - `flvData` carries one tag
//! - `flvEnd` ends the broadcast
//!
//! Viewers joining mid-broadcast receive the FLV header, a synthetic
//! `onMetaData` tag and the codec init tags (AAC/AVC sequence headers) first.
//! The host runtime supplies connections, rosters and ingest through the
//! traits in [`host`].
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use bytes::Bytes;
//! use flv_relay::host::{BroadcastHandle, ChannelConnection, ConnectionId, SharedRoster, StreamId};
//! use flv_relay::media::MediaPacket;
//! use flv_relay::RoomRegistry;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let registry = RoomRegistry::new();
//!     let roster = Arc::new(SharedRoster::new());
//!     registry.open_room("lobby", roster.clone()).await;
//!
//!     let (viewer, mut calls) = ChannelConnection::new(ConnectionId(2), 256);
//!     roster.join(viewer);
//!
//!     let stream = BroadcastHandle::new(StreamId(1));
//!     registry.start_broadcast("lobby", ConnectionId(1), stream).await?;
//!
//!     let packet = MediaPacket::audio(0, Bytes::from_static(&[0xAF, 0x00, 0x12, 0x10]));
//!     registry.on_packet("lobby", StreamId(1), &packet).await;
//!
//!     while let Ok(call) = calls.try_recv() {
//!         println!("{} ({} bytes)", call.method(), call.payload_len());
//!     }
//!     Ok(())
//! }
//! ```

pub mod amf;
pub mod error;
pub mod host;
pub mod media;
pub mod protocol;
pub mod remux;
pub mod room;
pub mod stats;

// Re-export main types for convenience
pub use error::{Error, Result};
pub use host::{BroadcastSource, ConnectionId, RoomConnection, RoomRoster, StreamId};
pub use media::MediaPacket;
pub use protocol::ServiceCall;
pub use remux::{BootstrapState, RemuxEvent, RemuxerConfig, StreamRemuxer};
pub use room::{RoomConfig, RoomError, RoomRegistry, RoomSession};
pub use stats::{RemuxerStats, RoomStats};
