//! Bootstrap state for late-joining viewers
//!
//! A viewer that connects mid-broadcast needs, in order: the FLV file
//! header, the synthetic `onMetaData` tag and every seed tag (codec init
//! tags and wire metadata). A [`BootstrapState`] is immutable; the remuxer
//! builds a new one and swaps it in wholesale, so a snapshot taken by a
//! connecting viewer is always internally consistent.

use bytes::Bytes;
use chrono::{DateTime, Utc};

use crate::amf::{amf0, AmfValue};
use crate::error::MediaError;
use crate::media::flv::{encode_tag, FlvHeader, FlvTagType};
use crate::protocol::ServiceCall;

use super::codec::CodecState;

/// Event name of the synthetic metadata tag
pub const METADATA_EVENT: &str = "onMetaData";

/// `creationdate` format, e.g. `Tue Mar 05 14:03:09 UTC 2024`
pub const CREATION_DATE_FORMAT: &str = "%a %b %d %H:%M:%S UTC %Y";

/// Header, metadata and seed tags for one broadcast state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootstrapState {
    header: Bytes,
    metadata: Bytes,
    seeds: Vec<Bytes>,
}

impl BootstrapState {
    /// Build the header and metadata for `codecs`, keeping `seeds` as given
    pub fn build(
        codecs: &CodecState,
        server_name: &str,
        created_at: DateTime<Utc>,
        seeds: Vec<Bytes>,
    ) -> Result<Self, MediaError> {
        let header = FlvHeader::new(codecs.has_audio(), codecs.has_video()).encode();
        let metadata = metadata_tag(codecs, server_name, created_at)?;

        Ok(Self {
            header,
            metadata,
            seeds,
        })
    }

    /// Copy of this state with one more seed tag
    pub(crate) fn with_seed(&self, tag: Bytes) -> Self {
        let mut seeds = Vec::with_capacity(self.seeds.len() + 1);
        seeds.extend(self.seeds.iter().cloned());
        seeds.push(tag);

        Self {
            header: self.header.clone(),
            metadata: self.metadata.clone(),
            seeds,
        }
    }

    /// The 13-byte FLV file header
    pub fn header(&self) -> &Bytes {
        &self.header
    }

    /// The synthetic metadata tag
    pub fn metadata(&self) -> &Bytes {
        &self.metadata
    }

    /// Seed tags in arrival order
    pub fn seeds(&self) -> &[Bytes] {
        &self.seeds
    }

    /// Calls that bring a new viewer up to date, in delivery order
    pub fn calls(&self) -> Vec<ServiceCall> {
        let mut calls = Vec::with_capacity(2 + self.seeds.len());
        calls.push(ServiceCall::FlvHeader(self.header.clone()));
        calls.push(ServiceCall::FlvMetaData(self.metadata.clone()));
        calls.extend(self.seeds.iter().cloned().map(ServiceCall::FlvMetaData));
        calls
    }

    /// Total bytes a new viewer receives
    pub fn byte_len(&self) -> usize {
        self.header.len() + self.metadata.len() + self.seeds.iter().map(Bytes::len).sum::<usize>()
    }
}

/// AMF0 values of the synthetic metadata: event name and property array
pub fn metadata_values(
    codecs: &CodecState,
    server_name: &str,
    created_at: DateTime<Utc>,
) -> Vec<AmfValue> {
    let mut props = vec![
        ("server".to_string(), AmfValue::from(server_name)),
        (
            "creationdate".to_string(),
            AmfValue::String(created_at.format(CREATION_DATE_FORMAT).to_string()),
        ),
    ];

    match codecs.video_codec_id {
        Some(id) => props.push(("videocodecid".to_string(), AmfValue::from(id))),
        None => props.push(("novideocodec".to_string(), AmfValue::Number(0.0))),
    }
    match codecs.audio_codec_id {
        Some(id) => props.push(("audiocodecid".to_string(), AmfValue::from(id))),
        None => props.push(("noaudiocodec".to_string(), AmfValue::Number(0.0))),
    }

    vec![AmfValue::from(METADATA_EVENT), AmfValue::EcmaArray(props)]
}

/// Serialized script tag carrying the synthetic metadata
pub fn metadata_tag(
    codecs: &CodecState,
    server_name: &str,
    created_at: DateTime<Utc>,
) -> Result<Bytes, MediaError> {
    let body = amf0::encode_all(&metadata_values(codecs, server_name, created_at));
    encode_tag(FlvTagType::Script, 0, &body)
}
