//! Statistics for remuxers and rooms

use std::time::Duration;

use crate::host::{ConnectionId, StreamId};
use crate::media::flv::FlvTagType;

/// Per-broadcast remuxer counters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RemuxerStats {
    /// Packets handed to the remuxer
    pub packets_received: u64,
    /// Packets ignored (empty payload or unhandled message type)
    pub packets_skipped: u64,
    /// Packets dropped because a tag could not be built
    pub processing_faults: u64,
    /// Audio tags produced
    pub audio_tags: u64,
    /// Video tags produced
    pub video_tags: u64,
    /// Script data tags produced
    pub script_tags: u64,
    /// Total FLV bytes produced, including tag headers
    pub bytes_produced: u64,
    /// Times the bootstrap header and metadata were rebuilt
    pub bootstrap_rebuilds: u64,
    /// Seed tags currently held in the bootstrap
    pub seed_tags: usize,
}

impl RemuxerStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Total tags produced
    pub fn tags_produced(&self) -> u64 {
        self.audio_tags + self.video_tags + self.script_tags
    }

    pub(crate) fn record_tag(&mut self, tag_type: FlvTagType, len: usize) {
        match tag_type {
            FlvTagType::Audio => self.audio_tags += 1,
            FlvTagType::Video => self.video_tags += 1,
            FlvTagType::Script => self.script_tags += 1,
        }
        self.bytes_produced += len as u64;
    }

    /// Output bitrate in bits per second over `duration`
    pub fn bitrate(&self, duration: Duration) -> u64 {
        let secs = duration.as_secs();
        if secs > 0 {
            (self.bytes_produced * 8) / secs
        } else {
            0
        }
    }
}

/// Point-in-time view of one room
#[derive(Debug, Clone, Default)]
pub struct RoomStats {
    /// Room identifier
    pub room_id: String,
    /// Connection currently broadcasting, if any
    pub broadcaster: Option<ConnectionId>,
    /// Stream of the current broadcast
    pub stream: Option<StreamId>,
    /// Video codec id of the current broadcast
    pub video_codec_id: Option<u8>,
    /// Audio codec id of the current broadcast
    pub audio_codec_id: Option<u8>,
    /// How long the current broadcast has been running
    pub broadcast_duration: Duration,
    /// Broadcasts started in this room
    pub broadcasts_started: u64,
    /// Broadcast attempts rejected because the room was busy
    pub broadcasts_rejected: u64,
    /// Packets dropped because no matching broadcast was active
    pub packets_discarded: u64,
    /// Calls accepted by viewer connections
    pub calls_delivered: u64,
    /// Calls a viewer connection failed to accept
    pub delivery_failures: u64,
    /// Remuxer counters of the current broadcast
    pub remuxer: RemuxerStats,
}

impl RoomStats {
    pub fn is_active(&self) -> bool {
        self.broadcaster.is_some()
    }

    /// Output bitrate of the current broadcast in bits per second
    pub fn bitrate(&self) -> u64 {
        self.remuxer.bitrate(self.broadcast_duration)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_remuxer_stats_new() {
        let stats = RemuxerStats::new();
        assert_eq!(stats.packets_received, 0);
        assert_eq!(stats.tags_produced(), 0);
        assert_eq!(stats.bytes_produced, 0);
        assert_eq!(stats.seed_tags, 0);
    }

    #[test]
    fn test_record_tag() {
        let mut stats = RemuxerStats::new();
        stats.record_tag(FlvTagType::Audio, 20);
        stats.record_tag(FlvTagType::Video, 100);
        stats.record_tag(FlvTagType::Video, 50);
        stats.record_tag(FlvTagType::Script, 30);

        assert_eq!(stats.audio_tags, 1);
        assert_eq!(stats.video_tags, 2);
        assert_eq!(stats.script_tags, 1);
        assert_eq!(stats.tags_produced(), 4);
        assert_eq!(stats.bytes_produced, 200);
    }

    #[test]
    fn test_bitrate() {
        let mut stats = RemuxerStats::new();
        stats.bytes_produced = 1_000_000;

        // 1,000,000 bytes * 8 bits / 10 seconds = 800,000 bps
        assert_eq!(stats.bitrate(Duration::from_secs(10)), 800_000);
        assert_eq!(stats.bitrate(Duration::from_secs(0)), 0);
    }

    #[test]
    fn test_room_stats_default() {
        let stats = RoomStats::default();
        assert!(!stats.is_active());
        assert_eq!(stats.bitrate(), 0);
        assert_eq!(stats.calls_delivered, 0);
    }

    #[test]
    fn test_room_stats_active() {
        let stats = RoomStats {
            room_id: "lobby".into(),
            broadcaster: Some(ConnectionId(1)),
            stream: Some(StreamId(1)),
            broadcast_duration: Duration::from_secs(4),
            remuxer: RemuxerStats {
                bytes_produced: 500,
                ..Default::default()
            },
            ..Default::default()
        };
        assert!(stats.is_active());
        assert_eq!(stats.bitrate(), 1000);
    }
}
