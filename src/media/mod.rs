//! Media handling
//!
//! This module provides:
//! - FLV tag and file header serialization
//! - Audio/video codec identification from tag bodies
//! - The packet type handed in by the host

pub mod flv;
pub mod packet;

pub use flv::{encode_tag, AudioFormat, FlvHeader, FlvTagType, VideoCodec};
pub use packet::MediaPacket;
