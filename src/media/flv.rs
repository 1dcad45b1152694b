//! FLV tag and header serialization
//!
//! An RTMP audio/video/data message body is an FLV tag body; turning a packet
//! into FLV bytes means prefixing the tag header and appending the trailing
//! previous-tag-size.
//!
//! FLV Tag Structure:
//! ```text
//! +---------+-------------+-------------+--------+-------------+---------+------------------+
//! | Type(1) | DataSize(3) | TS lower(3) | TS ext | StreamID(3) | Data(N) | PrevTagSize(4)   |
//! |         |             |             | (1)    | always 0    |         | = 11 + N         |
//! +---------+-------------+-------------+--------+-------------+---------+------------------+
//! ```
//!
//! FLV File Header:
//! ```text
//! +-----+-----+-----+---------+-------+------------+-----------------+
//! | 'F' | 'L' | 'V' | Version | Flags | HeaderSize | PrevTagSize0    |
//! |     |     |     | 0x01    |       | 9 (4)      | 0 (4)           |
//! +-----+-----+-----+---------+-------+------------+-----------------+
//! ```
//!
//! RTMP Video Data:
//! ```text
//! +----------+----------+
//! | FrameType| CodecID  | CodecData...
//! | (4 bits) | (4 bits) |
//! +----------+----------+
//! ```
//!
//! RTMP Audio Data:
//! ```text
//! +-----------+----------+----------+----------+
//! |SoundFormat|SoundRate |SoundSize |SoundType | AudioData...
//! | (4 bits)  | (2 bits) | (1 bit)  | (1 bit)  |
//! +-----------+----------+----------+----------+
//! ```

use bytes::{BufMut, Bytes, BytesMut};

use crate::error::MediaError;

/// Size of an FLV tag header
pub const TAG_HEADER_SIZE: usize = 11;

/// Size of the FLV file header, without the first previous-tag-size
pub const FILE_HEADER_SIZE: usize = 9;

/// Largest body expressible in the 24-bit data size field
pub const MAX_TAG_BODY_SIZE: usize = 0x00FF_FFFF;

const FLV_SIGNATURE: [u8; 3] = *b"FLV";
const FLV_VERSION: u8 = 0x01;
const FLAG_AUDIO: u8 = 0x04;
const FLAG_VIDEO: u8 = 0x01;

/// FLV tag type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FlvTagType {
    Audio = 8,
    Video = 9,
    /// AMF0 script data (`onMetaData` and friends)
    Script = 18,
}

impl FlvTagType {
    /// Map an RTMP message type id / FLV tag type byte
    pub fn from_u8(b: u8) -> Option<Self> {
        match b {
            8 => Some(FlvTagType::Audio),
            9 => Some(FlvTagType::Video),
            18 => Some(FlvTagType::Script),
            _ => None,
        }
    }

    pub fn as_u8(self) -> u8 {
        self as u8
    }
}

/// Video codec ID (lower 4 bits of first byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VideoCodec {
    /// Sorenson H.263
    SorensonH263 = 2,
    /// Screen video
    ScreenVideo = 3,
    /// VP6
    Vp6 = 4,
    /// VP6 with alpha
    Vp6Alpha = 5,
    /// Screen video v2
    ScreenVideoV2 = 6,
    /// AVC (H.264)
    Avc = 7,
    /// HEVC (H.265) - enhanced RTMP extension
    Hevc = 12,
    /// AV1 - enhanced RTMP extension
    Av1 = 13,
}

impl VideoCodec {
    /// Codec id carried in the low nibble of a video tag's first byte
    pub fn id_from_byte(b: u8) -> u8 {
        b & 0x0F
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            2 => Some(VideoCodec::SorensonH263),
            3 => Some(VideoCodec::ScreenVideo),
            4 => Some(VideoCodec::Vp6),
            5 => Some(VideoCodec::Vp6Alpha),
            6 => Some(VideoCodec::ScreenVideoV2),
            7 => Some(VideoCodec::Avc),
            12 => Some(VideoCodec::Hevc),
            13 => Some(VideoCodec::Av1),
            _ => None,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        Self::from_id(Self::id_from_byte(b))
    }

    /// Whether decoders need an out-of-band init tag (decoder configuration record)
    pub fn needs_sequence_header(&self) -> bool {
        matches!(self, VideoCodec::Avc)
    }

    pub fn name(&self) -> &'static str {
        match self {
            VideoCodec::SorensonH263 => "Sorenson H.263",
            VideoCodec::ScreenVideo => "Screen Video",
            VideoCodec::Vp6 => "VP6",
            VideoCodec::Vp6Alpha => "VP6 Alpha",
            VideoCodec::ScreenVideoV2 => "Screen Video v2",
            VideoCodec::Avc => "AVC",
            VideoCodec::Hevc => "HEVC",
            VideoCodec::Av1 => "AV1",
        }
    }
}

/// Audio format (upper 4 bits of first byte)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AudioFormat {
    /// Linear PCM, platform endian
    LinearPcmPlatform = 0,
    /// ADPCM
    Adpcm = 1,
    /// MP3
    Mp3 = 2,
    /// Linear PCM, little endian
    LinearPcmLe = 3,
    /// Nellymoser 16kHz mono
    Nellymoser16kMono = 4,
    /// Nellymoser 8kHz mono
    Nellymoser8kMono = 5,
    /// Nellymoser
    Nellymoser = 6,
    /// G.711 A-law
    G711ALaw = 7,
    /// G.711 mu-law
    G711MuLaw = 8,
    /// AAC
    Aac = 10,
    /// Speex
    Speex = 11,
    /// MP3 8kHz
    Mp38k = 14,
    /// Device-specific sound
    DeviceSpecific = 15,
}

impl AudioFormat {
    /// Format id carried in the high nibble of an audio tag's first byte
    pub fn id_from_byte(b: u8) -> u8 {
        (b >> 4) & 0x0F
    }

    pub fn from_id(id: u8) -> Option<Self> {
        match id {
            0 => Some(AudioFormat::LinearPcmPlatform),
            1 => Some(AudioFormat::Adpcm),
            2 => Some(AudioFormat::Mp3),
            3 => Some(AudioFormat::LinearPcmLe),
            4 => Some(AudioFormat::Nellymoser16kMono),
            5 => Some(AudioFormat::Nellymoser8kMono),
            6 => Some(AudioFormat::Nellymoser),
            7 => Some(AudioFormat::G711ALaw),
            8 => Some(AudioFormat::G711MuLaw),
            10 => Some(AudioFormat::Aac),
            11 => Some(AudioFormat::Speex),
            14 => Some(AudioFormat::Mp38k),
            15 => Some(AudioFormat::DeviceSpecific),
            _ => None,
        }
    }

    pub fn from_byte(b: u8) -> Option<Self> {
        Self::from_id(Self::id_from_byte(b))
    }

    /// Whether decoders need an out-of-band init tag (AudioSpecificConfig)
    pub fn needs_sequence_header(&self) -> bool {
        matches!(self, AudioFormat::Aac)
    }

    pub fn name(&self) -> &'static str {
        match self {
            AudioFormat::LinearPcmPlatform => "Linear PCM",
            AudioFormat::Adpcm => "ADPCM",
            AudioFormat::Mp3 => "MP3",
            AudioFormat::LinearPcmLe => "Linear PCM LE",
            AudioFormat::Nellymoser16kMono => "Nellymoser 16kHz",
            AudioFormat::Nellymoser8kMono => "Nellymoser 8kHz",
            AudioFormat::Nellymoser => "Nellymoser",
            AudioFormat::G711ALaw => "G.711 A-law",
            AudioFormat::G711MuLaw => "G.711 mu-law",
            AudioFormat::Aac => "AAC",
            AudioFormat::Speex => "Speex",
            AudioFormat::Mp38k => "MP3 8kHz",
            AudioFormat::DeviceSpecific => "Device-specific",
        }
    }
}

/// FLV file header
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FlvHeader {
    pub has_audio: bool,
    pub has_video: bool,
}

impl FlvHeader {
    pub fn new(has_audio: bool, has_video: bool) -> Self {
        Self {
            has_audio,
            has_video,
        }
    }

    /// Type flags byte: bit 2 = audio, bit 0 = video
    pub fn flags(&self) -> u8 {
        let mut flags = 0;
        if self.has_audio {
            flags |= FLAG_AUDIO;
        }
        if self.has_video {
            flags |= FLAG_VIDEO;
        }
        flags
    }

    /// 9-byte header followed by the zero PreviousTagSize0 (13 bytes total)
    pub fn encode(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(FILE_HEADER_SIZE + 4);
        buf.put_slice(&FLV_SIGNATURE);
        buf.put_u8(FLV_VERSION);
        buf.put_u8(self.flags());
        buf.put_u32(FILE_HEADER_SIZE as u32);
        buf.put_u32(0);
        buf.freeze()
    }
}

/// Serialize one FLV tag
///
/// Script tags are written with a zero timestamp regardless of `timestamp`.
pub fn encode_tag(tag_type: FlvTagType, timestamp: u32, body: &[u8]) -> Result<Bytes, MediaError> {
    if body.is_empty() {
        return Err(MediaError::EmptyBody);
    }
    if body.len() > MAX_TAG_BODY_SIZE {
        return Err(MediaError::BodyTooLarge { size: body.len() });
    }

    let timestamp = match tag_type {
        FlvTagType::Script => 0,
        _ => timestamp,
    };
    let body_size = body.len() as u32;

    let mut buf = BytesMut::with_capacity(TAG_HEADER_SIZE + body.len() + 4);
    buf.put_u8(tag_type.as_u8());
    put_u24(&mut buf, body_size);
    // Lower 24 bits, then the extension byte carrying bits 24..31
    put_u24(&mut buf, timestamp & 0x00FF_FFFF);
    buf.put_u8((timestamp >> 24) as u8);
    // Stream ID (always 0 in FLV)
    put_u24(&mut buf, 0);
    buf.put_slice(body);
    buf.put_u32(TAG_HEADER_SIZE as u32 + body_size);
    Ok(buf.freeze())
}

fn put_u24(buf: &mut BytesMut, value: u32) {
    buf.put_u8((value >> 16) as u8);
    buf.put_u8((value >> 8) as u8);
    buf.put_u8(value as u8);
}
