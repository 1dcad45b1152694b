//! Per-broadcast remuxer
//!
//! Turns each [`MediaPacket`] of a broadcast into a serialized FLV tag,
//! identifies the audio and video codecs from the first tag of each kind and
//! keeps the [`BootstrapState`] a late-joining viewer needs. Results are
//! published as [`RemuxEvent`]s on a broadcast channel; the room fans them
//! out to its viewers.
//!
//! Processing is transactional per packet: the new tag and bootstrap are
//! computed first and committed only when every step succeeded, so a fault
//! leaves codecs and bootstrap untouched and emits nothing.

use std::sync::Arc;

use bytes::Bytes;
use chrono::Utc;
use tokio::sync::broadcast;

use crate::amf::amf0;
use crate::error::MediaError;
use crate::media::flv::{encode_tag, FlvTagType};
use crate::media::MediaPacket;
use crate::stats::RemuxerStats;

use super::bootstrap::BootstrapState;
use super::codec::{CodecDetection, CodecState};
use super::config::{RemuxerConfig, MIN_EVENT_CAPACITY};

/// Notification published by a [`StreamRemuxer`]
///
/// For a single packet `BootstrapChanged` always precedes its
/// `PacketProduced`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RemuxEvent {
    /// Codecs were identified; the header and metadata were rebuilt
    BootstrapChanged,
    /// One serialized tag, ready for viewers
    PacketProduced(Bytes),
}

/// What [`StreamRemuxer::on_packet`] did with a packet
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PacketOutcome {
    /// Empty payload or unhandled message type
    Skipped,
    /// A tag was produced
    Produced { bootstrap_changed: bool },
    /// The tag could not be built; state is unchanged
    Failed,
}

/// Result of remuxing one packet, not yet committed
struct Remuxed {
    tag: Bytes,
    detection: Option<CodecDetection>,
    bootstrap: Option<BootstrapState>,
}

/// Remuxing state machine for one broadcast
pub struct StreamRemuxer {
    config: RemuxerConfig,
    codecs: CodecState,
    bootstrap: Arc<BootstrapState>,
    events: broadcast::Sender<RemuxEvent>,
    stats: RemuxerStats,
}

impl StreamRemuxer {
    /// Create a remuxer with no codecs identified and no seeds
    pub fn new(config: RemuxerConfig) -> Result<Self, MediaError> {
        let codecs = CodecState::default();
        let bootstrap =
            BootstrapState::build(&codecs, &config.server_name, Utc::now(), Vec::new())?;
        // Also clamped here: the field can be set without the builder
        let (events, _) = broadcast::channel(config.event_capacity.max(MIN_EVENT_CAPACITY));

        Ok(Self {
            config,
            codecs,
            bootstrap: Arc::new(bootstrap),
            events,
            stats: RemuxerStats::new(),
        })
    }

    pub fn config(&self) -> &RemuxerConfig {
        &self.config
    }

    /// Subscribe to events emitted from now on
    pub fn subscribe(&self) -> broadcast::Receiver<RemuxEvent> {
        self.events.subscribe()
    }

    /// Snapshot of the current bootstrap
    pub fn current_bootstrap(&self) -> Arc<BootstrapState> {
        Arc::clone(&self.bootstrap)
    }

    pub fn codecs(&self) -> CodecState {
        self.codecs
    }

    pub fn stats(&self) -> &RemuxerStats {
        &self.stats
    }

    /// Process one packet of the broadcast
    pub fn on_packet(&mut self, packet: &MediaPacket) -> PacketOutcome {
        self.stats.packets_received += 1;

        let Some(tag_type) = packet.kind() else {
            tracing::trace!(type_id = packet.type_id, "Skipping unhandled message type");
            self.stats.packets_skipped += 1;
            return PacketOutcome::Skipped;
        };
        if packet.is_empty() {
            tracing::trace!(type_id = packet.type_id, "Skipping empty packet");
            self.stats.packets_skipped += 1;
            return PacketOutcome::Skipped;
        }

        match self.remux(tag_type, packet) {
            Ok(remuxed) => self.commit(tag_type, remuxed),
            Err(e) => {
                self.stats.processing_faults += 1;
                tracing::error!(
                    type_id = packet.type_id,
                    timestamp = packet.timestamp,
                    size = packet.payload.len(),
                    error = %e,
                    "Failed to remux packet"
                );
                PacketOutcome::Failed
            }
        }
    }

    fn remux(&self, tag_type: FlvTagType, packet: &MediaPacket) -> Result<Remuxed, MediaError> {
        let tag = encode_tag(tag_type, packet.timestamp, &packet.payload)?;

        if tag_type == FlvTagType::Script {
            self.log_metadata(&packet.payload);
            return Ok(Remuxed {
                bootstrap: Some(self.bootstrap.with_seed(tag.clone())),
                tag,
                detection: None,
            });
        }

        let detection = packet
            .payload
            .first()
            .and_then(|&b| self.codecs.detect(tag_type, b));

        let bootstrap = match &detection {
            Some(d) => {
                let mut seeds = self.bootstrap.seeds().to_vec();
                if d.needs_seed {
                    seeds.push(tag.clone());
                }
                Some(BootstrapState::build(
                    &self.codecs.with(d),
                    &self.config.server_name,
                    Utc::now(),
                    seeds,
                )?)
            }
            None => None,
        };

        Ok(Remuxed {
            tag,
            detection,
            bootstrap,
        })
    }

    fn commit(&mut self, tag_type: FlvTagType, remuxed: Remuxed) -> PacketOutcome {
        let Remuxed {
            tag,
            detection,
            bootstrap,
        } = remuxed;

        if let Some(bootstrap) = bootstrap {
            self.bootstrap = Arc::new(bootstrap);
        }

        let bootstrap_changed = detection.is_some();
        if let Some(d) = detection {
            self.codecs = self.codecs.with(&d);
            self.stats.bootstrap_rebuilds += 1;

            tracing::info!(
                kind = ?d.tag_type,
                codec_id = d.codec_id,
                codec = d.codec_name(),
                seeded = d.needs_seed,
                "Codec detected"
            );
        }

        self.stats.seed_tags = self.bootstrap.seeds().len();
        self.stats.record_tag(tag_type, tag.len());

        // No receivers is fine: nobody is watching yet
        if bootstrap_changed {
            let _ = self.events.send(RemuxEvent::BootstrapChanged);
        }
        let _ = self.events.send(RemuxEvent::PacketProduced(tag));

        PacketOutcome::Produced { bootstrap_changed }
    }

    fn log_metadata(&self, payload: &Bytes) {
        if !tracing::enabled!(tracing::Level::DEBUG) {
            return;
        }

        match amf0::decode_all(payload) {
            Ok(values) => {
                let names: Vec<&str> = values.iter().filter_map(|v| v.as_str()).collect();
                let keys = values
                    .iter()
                    .find(|v| v.properties().is_some())
                    .map(|v| v.keys())
                    .unwrap_or_default();
                tracing::debug!(names = ?names, keys = ?keys, "Broadcast metadata received");
            }
            Err(e) => {
                tracing::debug!(error = %e, "Broadcast metadata is not valid AMF0");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::amf::AmfValue;
    use crate::media::flv::MAX_TAG_BODY_SIZE;
    use crate::media::packet::TYPE_DATA_AMF0;

    const AAC_SEQUENCE_HEADER: &[u8] = &[0xAF, 0x00, 0x12, 0x10];
    const AAC_RAW: &[u8] = &[0xAF, 0x01, 0x21, 0x00, 0x49];
    const AVC_SEQUENCE_HEADER: &[u8] = &[0x17, 0x00, 0x00, 0x00, 0x00, 0x01, 0x64, 0x00, 0x1F];
    const AVC_KEYFRAME: &[u8] = &[0x17, 0x01, 0x00, 0x00, 0x00, 0x65, 0x88];
    const MP3_FRAME: &[u8] = &[0x2F, 0xFF, 0xFB, 0x90];

    fn remuxer() -> StreamRemuxer {
        StreamRemuxer::new(RemuxerConfig::default()).unwrap()
    }

    fn drain(rx: &mut broadcast::Receiver<RemuxEvent>) -> Vec<RemuxEvent> {
        let mut events = Vec::new();
        while let Ok(event) = rx.try_recv() {
            events.push(event);
        }
        events
    }

    fn metadata_of(state: &BootstrapState) -> Vec<AmfValue> {
        let tag = state.metadata();
        amf0::decode_all(&tag[11..tag.len() - 4]).unwrap()
    }

    fn produced(event: &RemuxEvent) -> &Bytes {
        match event {
            RemuxEvent::PacketProduced(tag) => tag,
            other => panic!("expected PacketProduced, got {:?}", other),
        }
    }

    #[test]
    fn test_initial_bootstrap() {
        let remuxer = remuxer();
        let bootstrap = remuxer.current_bootstrap();

        assert_eq!(bootstrap.header()[4], 0x00);
        assert!(bootstrap.seeds().is_empty());
        assert_eq!(remuxer.codecs(), CodecState::default());

        let values = metadata_of(&bootstrap);
        assert_eq!(values[0].as_str(), Some("onMetaData"));
        assert_eq!(values[1].get_string("server"), Some("flv-relay"));
        assert_eq!(values[1].get_number("novideocodec"), Some(0.0));
        assert_eq!(values[1].get_number("noaudiocodec"), Some(0.0));

        let date = values[1].get_string("creationdate").unwrap();
        assert!(chrono::NaiveDateTime::parse_from_str(date, "%a %b %d %H:%M:%S UTC %Y").is_ok());
    }

    #[test]
    fn test_first_aac_packet() {
        let mut remuxer = remuxer();
        let mut rx = remuxer.subscribe();

        let outcome = remuxer.on_packet(&MediaPacket::audio(
            0,
            Bytes::from_static(AAC_SEQUENCE_HEADER),
        ));
        assert_eq!(
            outcome,
            PacketOutcome::Produced {
                bootstrap_changed: true
            }
        );

        let events = drain(&mut rx);
        assert_eq!(events.len(), 2);
        assert_eq!(events[0], RemuxEvent::BootstrapChanged);
        let tag = produced(&events[1]);
        assert_eq!(tag.len(), 11 + AAC_SEQUENCE_HEADER.len() + 4);
        assert_eq!(tag[0], 8);

        let bootstrap = remuxer.current_bootstrap();
        assert_eq!(bootstrap.header()[4], 0x04);
        assert_eq!(bootstrap.seeds(), &[tag.clone()]);

        let values = metadata_of(&bootstrap);
        assert_eq!(values[1].get_number("audiocodecid"), Some(10.0));
        assert_eq!(values[1].get_number("novideocodec"), Some(0.0));
        assert_eq!(remuxer.codecs().audio_codec_id, Some(10));
    }

    #[test]
    fn test_avc_then_mp3() {
        let mut remuxer = remuxer();
        let mut rx = remuxer.subscribe();

        remuxer.on_packet(&MediaPacket::video(0, Bytes::from_static(AVC_SEQUENCE_HEADER)));
        let avc_events = drain(&mut rx);
        let avc_tag = produced(&avc_events[1]).clone();

        remuxer.on_packet(&MediaPacket::audio(10, Bytes::from_static(MP3_FRAME)));
        let mp3_events = drain(&mut rx);
        assert_eq!(mp3_events[0], RemuxEvent::BootstrapChanged);

        let bootstrap = remuxer.current_bootstrap();
        assert_eq!(bootstrap.header()[4], 0x05);
        // MP3 has no init tag, only the AVC record is seeded
        assert_eq!(bootstrap.seeds(), &[avc_tag]);

        let values = metadata_of(&bootstrap);
        assert_eq!(values[1].get_number("videocodecid"), Some(7.0));
        assert_eq!(values[1].get_number("audiocodecid"), Some(2.0));
    }

    #[test]
    fn test_codec_detected_once() {
        let mut remuxer = remuxer();
        remuxer.on_packet(&MediaPacket::audio(0, Bytes::from_static(AAC_SEQUENCE_HEADER)));
        let before = remuxer.current_bootstrap();

        let mut rx = remuxer.subscribe();
        let outcome = remuxer.on_packet(&MediaPacket::audio(23, Bytes::from_static(AAC_RAW)));
        assert_eq!(
            outcome,
            PacketOutcome::Produced {
                bootstrap_changed: false
            }
        );

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        assert!(matches!(events[0], RemuxEvent::PacketProduced(_)));
        assert!(Arc::ptr_eq(&before, &remuxer.current_bootstrap()));
        assert_eq!(remuxer.stats().bootstrap_rebuilds, 1);
    }

    #[test]
    fn test_live_tags_follow_seed() {
        let mut remuxer = remuxer();
        remuxer.on_packet(&MediaPacket::video(0, Bytes::from_static(AVC_SEQUENCE_HEADER)));
        remuxer.on_packet(&MediaPacket::video(40, Bytes::from_static(AVC_KEYFRAME)));

        assert_eq!(remuxer.current_bootstrap().seeds().len(), 1);
        assert_eq!(remuxer.stats().video_tags, 2);
    }

    #[test]
    fn test_metadata_packet_is_seeded_silently() {
        let mut remuxer = remuxer();
        let mut rx = remuxer.subscribe();

        let payload = amf0::encode_all(&[
            AmfValue::from("@setDataFrame"),
            AmfValue::from("onMetaData"),
            AmfValue::EcmaArray(vec![("width".into(), AmfValue::from(1280.0))]),
        ]);
        let outcome = remuxer.on_packet(&MediaPacket::metadata(5000, payload.clone()));
        assert_eq!(
            outcome,
            PacketOutcome::Produced {
                bootstrap_changed: false
            }
        );

        let events = drain(&mut rx);
        assert_eq!(events.len(), 1);
        let tag = produced(&events[0]);
        assert_eq!(tag[0], 18);
        assert_eq!(&tag[4..8], &[0, 0, 0, 0]);
        assert_eq!(&tag[11..tag.len() - 4], &payload[..]);

        let bootstrap = remuxer.current_bootstrap();
        assert_eq!(bootstrap.seeds(), &[tag.clone()]);
        assert_eq!(bootstrap.header()[4], 0x00);
        assert_eq!(remuxer.codecs(), CodecState::default());
    }

    #[test]
    fn test_undecodable_metadata_still_forwarded() {
        let mut remuxer = remuxer();
        let outcome = remuxer.on_packet(&MediaPacket::new(
            TYPE_DATA_AMF0,
            0,
            Bytes::from_static(&[0xEE, 0x01]),
        ));
        assert!(matches!(outcome, PacketOutcome::Produced { .. }));
        assert_eq!(remuxer.current_bootstrap().seeds().len(), 1);
    }

    #[test]
    fn test_skipped_packets() {
        let mut remuxer = remuxer();
        let mut rx = remuxer.subscribe();

        assert_eq!(
            remuxer.on_packet(&MediaPacket::video(0, Bytes::new())),
            PacketOutcome::Skipped
        );
        assert_eq!(
            remuxer.on_packet(&MediaPacket::new(20, 0, Bytes::from_static(&[0x02]))),
            PacketOutcome::Skipped
        );

        assert!(drain(&mut rx).is_empty());
        assert_eq!(remuxer.codecs(), CodecState::default());
        assert_eq!(remuxer.stats().packets_received, 2);
        assert_eq!(remuxer.stats().packets_skipped, 2);
    }

    #[test]
    fn test_fault_leaves_state_unchanged() {
        let mut remuxer = remuxer();
        let before = remuxer.current_bootstrap();
        let mut rx = remuxer.subscribe();

        let mut oversized = vec![0u8; MAX_TAG_BODY_SIZE + 1];
        oversized[0] = 0x17;
        let outcome = remuxer.on_packet(&MediaPacket::video(0, Bytes::from(oversized)));

        assert_eq!(outcome, PacketOutcome::Failed);
        assert!(drain(&mut rx).is_empty());
        assert_eq!(remuxer.codecs(), CodecState::default());
        assert!(Arc::ptr_eq(&before, &remuxer.current_bootstrap()));
        assert_eq!(remuxer.stats().processing_faults, 1);

        // The next valid packet is still detected as the first video tag
        remuxer.on_packet(&MediaPacket::video(0, Bytes::from_static(AVC_SEQUENCE_HEADER)));
        assert_eq!(drain(&mut rx)[0], RemuxEvent::BootstrapChanged);
        assert_eq!(remuxer.codecs().video_codec_id, Some(7));
    }

    #[test]
    fn test_undersized_event_capacity() {
        for capacity in [0, 1] {
            let config = RemuxerConfig {
                server_name: "flv-relay".to_string(),
                event_capacity: capacity,
            };
            let mut remuxer = StreamRemuxer::new(config).unwrap();
            let mut rx = remuxer.subscribe();

            remuxer.on_packet(&MediaPacket::audio(0, Bytes::from_static(AAC_SEQUENCE_HEADER)));

            let events = drain(&mut rx);
            assert_eq!(events.len(), 2);
            assert_eq!(events[0], RemuxEvent::BootstrapChanged);
            assert!(matches!(events[1], RemuxEvent::PacketProduced(_)));
        }
    }

    #[test]
    fn test_extended_timestamp() {
        let mut remuxer = remuxer();
        let mut rx = remuxer.subscribe();
        remuxer.on_packet(&MediaPacket::audio(0x1234_5678, Bytes::from_static(MP3_FRAME)));

        let events = drain(&mut rx);
        let tag = produced(&events[1]);
        assert_eq!(&tag[4..8], &[0x34, 0x56, 0x78, 0x12]);
    }

    #[test]
    fn test_stats() {
        let mut remuxer = remuxer();
        remuxer.on_packet(&MediaPacket::audio(0, Bytes::from_static(AAC_SEQUENCE_HEADER)));
        remuxer.on_packet(&MediaPacket::video(0, Bytes::from_static(AVC_SEQUENCE_HEADER)));
        remuxer.on_packet(&MediaPacket::audio(23, Bytes::from_static(AAC_RAW)));

        let stats = remuxer.stats();
        assert_eq!(stats.packets_received, 3);
        assert_eq!(stats.tags_produced(), 3);
        assert_eq!(stats.bootstrap_rebuilds, 2);
        assert_eq!(stats.seed_tags, 2);
        assert_eq!(
            stats.bytes_produced as usize,
            (AAC_SEQUENCE_HEADER.len() + AVC_SEQUENCE_HEADER.len() + AAC_RAW.len()) + 3 * 15
        );
    }
}
