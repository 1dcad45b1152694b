//! Outbound remote calls issued to viewer connections
//!
//! A viewer appends the byte arguments of these calls, in order, to a local
//! decode buffer. Per viewer the sequence is:
//!
//! ```text
//! flvHeader, flvMetaData x (1 + seeds)      <- repeated on every bootstrap change
//! flvData*                                  <- interleaved
//! flvEnd                                    <- at most once per broadcast
//! ```

use bytes::Bytes;

/// Method name of the container header call
pub const METHOD_FLV_HEADER: &str = "flvHeader";
/// Method name of the metadata / seed tag call
pub const METHOD_FLV_METADATA: &str = "flvMetaData";
/// Method name of the live tag call
pub const METHOD_FLV_DATA: &str = "flvData";
/// Method name of the end-of-broadcast call
pub const METHOD_FLV_END: &str = "flvEnd";

/// A remote call to a viewer
///
/// Cloning is cheap: arguments are reference-counted `Bytes`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServiceCall {
    /// 13-byte FLV file header (9-byte header + zero previous-tag-size)
    FlvHeader(Bytes),
    /// The synthetic metadata tag or one seed tag
    FlvMetaData(Bytes),
    /// One live tag
    FlvData(Bytes),
    /// The broadcast has ended
    FlvEnd,
}

impl ServiceCall {
    /// Remote method name
    pub fn method(&self) -> &'static str {
        match self {
            ServiceCall::FlvHeader(_) => METHOD_FLV_HEADER,
            ServiceCall::FlvMetaData(_) => METHOD_FLV_METADATA,
            ServiceCall::FlvData(_) => METHOD_FLV_DATA,
            ServiceCall::FlvEnd => METHOD_FLV_END,
        }
    }

    /// Call arguments; every call carries at most one byte array
    pub fn args(&self) -> Vec<Bytes> {
        match self {
            ServiceCall::FlvHeader(b) | ServiceCall::FlvMetaData(b) | ServiceCall::FlvData(b) => {
                vec![b.clone()]
            }
            ServiceCall::FlvEnd => Vec::new(),
        }
    }

    /// The byte payload, if any
    pub fn payload(&self) -> Option<&Bytes> {
        match self {
            ServiceCall::FlvHeader(b) | ServiceCall::FlvMetaData(b) | ServiceCall::FlvData(b) => {
                Some(b)
            }
            ServiceCall::FlvEnd => None,
        }
    }

    /// Number of payload bytes carried
    pub fn payload_len(&self) -> usize {
        self.payload().map(Bytes::len).unwrap_or(0)
    }
}
