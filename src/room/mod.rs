//! Room-scoped broadcast relay
//!
//! Each open room has a [`RoomSession`] that accepts at most one broadcaster
//! and fans its remuxed stream out to everyone else in the room. The
//! [`RoomRegistry`] maps room ids to sessions.

pub mod config;
pub mod error;
pub mod registry;
pub mod session;

pub use config::RoomConfig;
pub use error::RoomError;
pub use registry::RoomRegistry;
pub use session::RoomSession;

/// Room identifier as used by the host
pub type RoomId = String;
