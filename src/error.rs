//! Unified error types for flv-relay

use std::fmt;

use crate::room::RoomError;

/// Result type alias using the library's Error type
pub type Result<T> = std::result::Result<T, Error>;

/// Unified error type for all relay operations
#[derive(Debug)]
pub enum Error {
    /// AMF encoding/decoding error
    Amf(AmfError),
    /// FLV tag construction error
    Media(MediaError),
    /// Delivery to a viewer connection failed
    Invoke(InvokeError),
    /// Room lifecycle error
    Room(RoomError),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Amf(e) => write!(f, "AMF error: {}", e),
            Error::Media(e) => write!(f, "Media error: {}", e),
            Error::Invoke(e) => write!(f, "Invoke error: {}", e),
            Error::Room(e) => write!(f, "Room error: {}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Amf(e) => Some(e),
            Error::Media(e) => Some(e),
            Error::Invoke(e) => Some(e),
            Error::Room(e) => Some(e),
        }
    }
}

impl From<AmfError> for Error {
    fn from(err: AmfError) -> Self {
        Error::Amf(err)
    }
}

impl From<MediaError> for Error {
    fn from(err: MediaError) -> Self {
        Error::Media(err)
    }
}

impl From<InvokeError> for Error {
    fn from(err: InvokeError) -> Self {
        Error::Invoke(err)
    }
}

impl From<RoomError> for Error {
    fn from(err: RoomError) -> Self {
        Error::Room(err)
    }
}

/// AMF encoding/decoding errors
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AmfError {
    UnknownMarker(u8),
    UnexpectedEof,
    InvalidUtf8,
    NestingTooDeep,
    InvalidObjectEnd,
}

impl fmt::Display for AmfError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AmfError::UnknownMarker(m) => write!(f, "Unknown AMF marker: 0x{:02x}", m),
            AmfError::UnexpectedEof => write!(f, "Unexpected end of AMF data"),
            AmfError::InvalidUtf8 => write!(f, "Invalid UTF-8 in AMF string"),
            AmfError::NestingTooDeep => write!(f, "AMF nesting too deep"),
            AmfError::InvalidObjectEnd => write!(f, "Invalid object end marker"),
        }
    }
}

impl std::error::Error for AmfError {}

/// Errors raised while turning a media payload into FLV bytes
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MediaError {
    /// Tag body is empty; FLV has no representation for it
    EmptyBody,
    /// Tag body does not fit the 24-bit data size field
    BodyTooLarge { size: usize },
}

impl fmt::Display for MediaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaError::EmptyBody => write!(f, "FLV tag body is empty"),
            MediaError::BodyTooLarge { size } => {
                write!(
                    f,
                    "FLV tag body too large: {} bytes (max {})",
                    size,
                    crate::media::flv::MAX_TAG_BODY_SIZE
                )
            }
        }
    }
}

impl std::error::Error for MediaError {}

/// Failure to deliver a remote call to one viewer connection
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InvokeError {
    /// The connection's outbound queue is full
    Backpressure,
    /// The connection is gone
    Disconnected,
    /// The host refused the call
    Rejected(String),
}

impl fmt::Display for InvokeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvokeError::Backpressure => write!(f, "Connection outbound queue is full"),
            InvokeError::Disconnected => write!(f, "Connection is disconnected"),
            InvokeError::Rejected(reason) => write!(f, "Call rejected: {}", reason),
        }
    }
}

impl std::error::Error for InvokeError {}
