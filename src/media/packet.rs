//! Media packets delivered by the host's ingestion pipeline

use bytes::Bytes;

use super::flv::FlvTagType;

/// RTMP message type id for audio
pub const TYPE_AUDIO: u8 = 8;
/// RTMP message type id for video
pub const TYPE_VIDEO: u8 = 9;
/// RTMP message type id for AMF0 data (`@setDataFrame`, `onMetaData`)
pub const TYPE_DATA_AMF0: u8 = 18;

/// One decoded packet of a broadcast
///
/// `type_id` is kept raw so that message types the relay does not handle
/// (AMF3 data, shared objects, ...) can still be handed in and skipped.
#[derive(Debug, Clone)]
pub struct MediaPacket {
    /// RTMP message type id / FLV tag type
    pub type_id: u8,
    /// Timestamp in milliseconds
    pub timestamp: u32,
    /// Message body, i.e. the FLV tag body
    pub payload: Bytes,
}

impl MediaPacket {
    pub fn new(type_id: u8, timestamp: u32, payload: Bytes) -> Self {
        Self {
            type_id,
            timestamp,
            payload,
        }
    }

    pub fn audio(timestamp: u32, payload: Bytes) -> Self {
        Self::new(TYPE_AUDIO, timestamp, payload)
    }

    pub fn video(timestamp: u32, payload: Bytes) -> Self {
        Self::new(TYPE_VIDEO, timestamp, payload)
    }

    pub fn metadata(timestamp: u32, payload: Bytes) -> Self {
        Self::new(TYPE_DATA_AMF0, timestamp, payload)
    }

    /// Tag type this packet remuxes into, `None` for unhandled message types
    pub fn kind(&self) -> Option<FlvTagType> {
        FlvTagType::from_u8(self.type_id)
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_packet_kinds() {
        assert_eq!(MediaPacket::audio(0, Bytes::new()).kind(), Some(FlvTagType::Audio));
        assert_eq!(MediaPacket::video(0, Bytes::new()).kind(), Some(FlvTagType::Video));
        assert_eq!(MediaPacket::metadata(0, Bytes::new()).kind(), Some(FlvTagType::Script));
        // AMF3 data message
        assert_eq!(MediaPacket::new(15, 0, Bytes::from_static(&[0])).kind(), None);
    }

    #[test]
    fn test_empty_payload() {
        assert!(MediaPacket::audio(10, Bytes::new()).is_empty());
        assert!(!MediaPacket::audio(10, Bytes::from_static(&[0xAF])).is_empty());
    }
}
