//! Codec detection
//!
//! The first audio tag and the first video tag of a broadcast identify its
//! codecs. Each codec id is set once and never revisited, so later packets
//! cost a single `Option` check.

use crate::media::flv::{AudioFormat, FlvTagType, VideoCodec};


/// Codecs identified so far in a broadcast
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CodecState {
    pub video_codec_id: Option<u8>,
    pub audio_codec_id: Option<u8>,
}

/// A codec identified from a tag's first body byte
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CodecDetection {
    pub tag_type: FlvTagType,
    pub codec_id: u8,
    /// The triggering tag is the codec's init tag and must be replayed
    pub needs_seed: bool,
}

impl CodecDetection {
    /// Human-readable codec name for logs
    pub fn codec_name(&self) -> &'static str {
        match self.tag_type {
            FlvTagType::Audio => AudioFormat::from_id(self.codec_id)
                .map(|f| f.name())
                .unwrap_or("unknown"),
            FlvTagType::Video => VideoCodec::from_id(self.codec_id)
                .map(|c| c.name())
                .unwrap_or("unknown"),
            FlvTagType::Script => "script",
        }
    }
}

impl CodecState {
    pub fn has_audio(&self) -> bool {
        self.audio_codec_id.is_some()
    }

    pub fn has_video(&self) -> bool {
        self.video_codec_id.is_some()
    }

    /// Detect the codec of a tag whose kind has not been identified yet
    ///
    /// Returns `None` when the kind is already known or carries no codec.
    pub fn detect(&self, tag_type: FlvTagType, first_byte: u8) -> Option<CodecDetection> {
        match tag_type {
            FlvTagType::Audio if self.audio_codec_id.is_none() => {
                let codec_id = AudioFormat::id_from_byte(first_byte);
                Some(CodecDetection {
                    tag_type,
                    codec_id,
                    needs_seed: AudioFormat::from_id(codec_id)
                        .is_some_and(|f| f.needs_sequence_header()),
                })
            }
            FlvTagType::Video if self.video_codec_id.is_none() => {
                let codec_id = VideoCodec::id_from_byte(first_byte);
                Some(CodecDetection {
                    tag_type,
                    codec_id,
                    needs_seed: VideoCodec::from_id(codec_id)
                        .is_some_and(|c| c.needs_sequence_header()),
                })
            }
            _ => None,
        }
    }

    /// State after `detection`; an already-set id is never overwritten
    pub fn with(&self, detection: &CodecDetection) -> CodecState {
        let mut next = *self;
        match detection.tag_type {
            FlvTagType::Audio => {
                next.audio_codec_id.get_or_insert(detection.codec_id);
            }
            FlvTagType::Video => {
                next.video_codec_id.get_or_insert(detection.codec_id);
            }
            FlvTagType::Script => {}
        }
        next
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detect_aac() {
        let state = CodecState::default();
        let detection = state.detect(FlvTagType::Audio, 0xAF).unwrap();
        assert_eq!(detection.codec_id, 10);
        assert!(detection.needs_seed);
        assert_eq!(detection.codec_name(), "AAC");

        let next = state.with(&detection);
        assert_eq!(next.audio_codec_id, Some(10));
        assert_eq!(next.video_codec_id, None);
    }

    #[test]
    fn test_detect_avc() {
        let detection = CodecState::default().detect(FlvTagType::Video, 0x17).unwrap();
        assert_eq!(detection.codec_id, 7);
        assert!(detection.needs_seed);
        assert_eq!(detection.codec_name(), "AVC");
    }

    #[test]
    fn test_codecs_without_init_tag() {
        let mp3 = CodecState::default().detect(FlvTagType::Audio, 0x2F).unwrap();
        assert_eq!(mp3.codec_id, 2);
        assert!(!mp3.needs_seed);

        let vp6 = CodecState::default().detect(FlvTagType::Video, 0x14).unwrap();
        assert_eq!(vp6.codec_id, 4);
        assert!(!vp6.needs_seed);

        // Undefined ids are still recorded, just without a name
        let odd = CodecState::default().detect(FlvTagType::Audio, 0x9F).unwrap();
        assert_eq!(odd.codec_id, 9);
        assert_eq!(odd.codec_name(), "unknown");
    }

    #[test]
    fn test_detection_fires_once_per_kind() {
        let state = CodecState::default();
        let state = state.with(&state.detect(FlvTagType::Audio, 0xAF).unwrap());
        assert!(state.detect(FlvTagType::Audio, 0x2F).is_none());
        assert!(state.detect(FlvTagType::Video, 0x17).is_some());
        assert!(state.detect(FlvTagType::Script, 0x02).is_none());
    }

    #[test]
    fn test_with_never_overwrites() {
        let state = CodecState {
            video_codec_id: Some(7),
            audio_codec_id: None,
        };
        let late = CodecDetection {
            tag_type: FlvTagType::Video,
            codec_id: 2,
            needs_seed: false,
        };
        assert_eq!(state.with(&late).video_codec_id, Some(7));
    }
}
