//! AMF (Action Message Format) implementation
//!
//! FLV script-data tags carry AMF0: the relay writes its own `onMetaData`
//! body with the encoder and inspects broadcaster metadata with the decoder.

pub mod amf0;
pub mod value;

pub use amf0::{Amf0Decoder, Amf0Encoder};
pub use value::{AmfProperties, AmfValue};
