//! AMF0 encoder and decoder
//!
//! Only the AMF0 subset that appears in FLV script data is supported:
//!
//! ```text
//! 0x00 - Number (IEEE 754 double)
//! 0x01 - Boolean
//! 0x02 - String (UTF-8, 16-bit length prefix)
//! 0x03 - Object (key-value pairs until 0x000009)
//! 0x05 - Null
//! 0x06 - Undefined
//! 0x08 - ECMA Array (32-bit count hint + key-value pairs until 0x000009)
//! 0x09 - Object End
//! 0x0A - Strict Array (32-bit count + values)
//! 0x0B - Date (double + 16-bit timezone)
//! 0x0C - Long String (UTF-8, 32-bit length prefix)
//! ```

use bytes::{Buf, BufMut, Bytes, BytesMut};

use super::value::{AmfProperties, AmfValue};
use crate::error::AmfError;

const MARKER_NUMBER: u8 = 0x00;
const MARKER_BOOLEAN: u8 = 0x01;
const MARKER_STRING: u8 = 0x02;
const MARKER_OBJECT: u8 = 0x03;
const MARKER_NULL: u8 = 0x05;
const MARKER_UNDEFINED: u8 = 0x06;
const MARKER_ECMA_ARRAY: u8 = 0x08;
const MARKER_OBJECT_END: u8 = 0x09;
const MARKER_STRICT_ARRAY: u8 = 0x0A;
const MARKER_DATE: u8 = 0x0B;
const MARKER_LONG_STRING: u8 = 0x0C;
const MARKER_UNSUPPORTED: u8 = 0x0D;

/// Maximum nesting depth for objects/arrays (prevent stack overflow)
const MAX_NESTING_DEPTH: usize = 64;

/// AMF0 decoder
///
/// Lenient by default: encoders in the wild drop the object end marker and
/// emit markers outside the subset above. Lenient mode maps unknown markers to
/// `Undefined` and treats a missing end marker as the end of the object.
pub struct Amf0Decoder {
    lenient: bool,
    depth: usize,
}

impl Amf0Decoder {
    /// Create a new lenient decoder
    pub fn new() -> Self {
        Self::with_lenient(true)
    }

    /// Create decoder with explicit lenient mode setting
    pub fn with_lenient(lenient: bool) -> Self {
        Self { lenient, depth: 0 }
    }

    /// Decode a single AMF0 value from the buffer
    pub fn decode(&mut self, buf: &mut Bytes) -> Result<AmfValue, AmfError> {
        if buf.is_empty() {
            return Err(AmfError::UnexpectedEof);
        }

        self.depth += 1;
        if self.depth > MAX_NESTING_DEPTH {
            self.depth -= 1;
            return Err(AmfError::NestingTooDeep);
        }

        let marker = buf.get_u8();
        let result = self.decode_value(marker, buf);
        self.depth -= 1;
        result
    }

    /// Decode all values from buffer until exhausted
    pub fn decode_all(&mut self, buf: &mut Bytes) -> Result<Vec<AmfValue>, AmfError> {
        let mut values = Vec::new();
        while buf.has_remaining() {
            values.push(self.decode(buf)?);
        }
        Ok(values)
    }

    fn decode_value(&mut self, marker: u8, buf: &mut Bytes) -> Result<AmfValue, AmfError> {
        match marker {
            MARKER_NUMBER => {
                ensure(buf, 8)?;
                Ok(AmfValue::Number(buf.get_f64()))
            }
            MARKER_BOOLEAN => {
                ensure(buf, 1)?;
                Ok(AmfValue::Boolean(buf.get_u8() != 0))
            }
            MARKER_STRING => Ok(AmfValue::String(read_utf8(buf)?)),
            MARKER_LONG_STRING => Ok(AmfValue::String(read_utf8_long(buf)?)),
            MARKER_OBJECT => Ok(AmfValue::Object(self.decode_properties(buf)?)),
            MARKER_ECMA_ARRAY => {
                ensure(buf, 4)?;
                // Count is only a hint; the end marker terminates the array
                let _count = buf.get_u32();
                Ok(AmfValue::EcmaArray(self.decode_properties(buf)?))
            }
            MARKER_STRICT_ARRAY => {
                ensure(buf, 4)?;
                let count = buf.get_u32() as usize;
                let mut elements = Vec::with_capacity(count.min(1024));
                for _ in 0..count {
                    elements.push(self.decode(buf)?);
                }
                Ok(AmfValue::StrictArray(elements))
            }
            MARKER_DATE => {
                ensure(buf, 10)?;
                let timestamp = buf.get_f64();
                let _timezone = buf.get_i16();
                Ok(AmfValue::Date(timestamp))
            }
            MARKER_NULL => Ok(AmfValue::Null),
            MARKER_UNDEFINED | MARKER_UNSUPPORTED => Ok(AmfValue::Undefined),
            _ if self.lenient => Ok(AmfValue::Undefined),
            _ => Err(AmfError::UnknownMarker(marker)),
        }
    }

    /// Key/value pairs up to (and including) the `0x00 0x00 0x09` terminator
    fn decode_properties(&mut self, buf: &mut Bytes) -> Result<AmfProperties, AmfError> {
        let mut properties = Vec::new();

        loop {
            if self.lenient && buf.is_empty() {
                break;
            }
            let key = read_utf8(buf)?;

            if key.is_empty() {
                if buf.is_empty() {
                    if self.lenient {
                        break;
                    }
                    return Err(AmfError::UnexpectedEof);
                }
                let end_marker = buf.get_u8();
                if end_marker == MARKER_OBJECT_END || self.lenient {
                    break;
                }
                return Err(AmfError::InvalidObjectEnd);
            }

            let value = self.decode(buf)?;
            properties.push((key, value));
        }

        Ok(properties)
    }
}

impl Default for Amf0Decoder {
    fn default() -> Self {
        Self::new()
    }
}

fn ensure(buf: &Bytes, len: usize) -> Result<(), AmfError> {
    if buf.remaining() < len {
        Err(AmfError::UnexpectedEof)
    } else {
        Ok(())
    }
}

/// Read UTF-8 string with 16-bit length prefix
fn read_utf8(buf: &mut Bytes) -> Result<String, AmfError> {
    ensure(buf, 2)?;
    let len = buf.get_u16() as usize;
    ensure(buf, len)?;
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)
}

/// Read UTF-8 string with 32-bit length prefix
fn read_utf8_long(buf: &mut Bytes) -> Result<String, AmfError> {
    ensure(buf, 4)?;
    let len = buf.get_u32() as usize;
    ensure(buf, len)?;
    let bytes = buf.split_to(len);
    String::from_utf8(bytes.to_vec()).map_err(|_| AmfError::InvalidUtf8)
}

/// AMF0 encoder
pub struct Amf0Encoder {
    buf: BytesMut,
}

impl Amf0Encoder {
    /// Create a new encoder
    pub fn new() -> Self {
        Self::with_capacity(256)
    }

    /// Create encoder with specific capacity
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            buf: BytesMut::with_capacity(capacity),
        }
    }

    /// Get the encoded bytes and reset encoder
    pub fn finish(&mut self) -> Bytes {
        self.buf.split().freeze()
    }

    /// Get current encoded length
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    /// Check if encoder is empty
    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Encode a single AMF0 value
    pub fn encode(&mut self, value: &AmfValue) {
        match value {
            AmfValue::Null => self.buf.put_u8(MARKER_NULL),
            AmfValue::Undefined => self.buf.put_u8(MARKER_UNDEFINED),
            AmfValue::Boolean(b) => {
                self.buf.put_u8(MARKER_BOOLEAN);
                self.buf.put_u8(u8::from(*b));
            }
            AmfValue::Number(n) => {
                self.buf.put_u8(MARKER_NUMBER);
                self.buf.put_f64(*n);
            }
            AmfValue::String(s) => {
                if s.len() > 0xFFFF {
                    self.buf.put_u8(MARKER_LONG_STRING);
                    self.buf.put_u32(s.len() as u32);
                } else {
                    self.buf.put_u8(MARKER_STRING);
                    self.buf.put_u16(s.len() as u16);
                }
                self.buf.put_slice(s.as_bytes());
            }
            AmfValue::Object(props) => {
                self.buf.put_u8(MARKER_OBJECT);
                self.encode_properties(props);
            }
            AmfValue::EcmaArray(props) => {
                self.buf.put_u8(MARKER_ECMA_ARRAY);
                self.buf.put_u32(props.len() as u32);
                self.encode_properties(props);
            }
            AmfValue::StrictArray(elements) => {
                self.buf.put_u8(MARKER_STRICT_ARRAY);
                self.buf.put_u32(elements.len() as u32);
                for elem in elements {
                    self.encode(elem);
                }
            }
            AmfValue::Date(timestamp) => {
                self.buf.put_u8(MARKER_DATE);
                self.buf.put_f64(*timestamp);
                self.buf.put_i16(0);
            }
        }
    }

    /// Encode multiple values back to back
    pub fn encode_all(&mut self, values: &[AmfValue]) {
        for value in values {
            self.encode(value);
        }
    }

    fn encode_properties(&mut self, props: &[(String, AmfValue)]) {
        for (key, val) in props {
            self.write_utf8(key);
            self.encode(val);
        }
        self.buf.put_u16(0);
        self.buf.put_u8(MARKER_OBJECT_END);
    }

    /// Write UTF-8 string with 16-bit length prefix (no type marker)
    fn write_utf8(&mut self, s: &str) {
        let mut len = s.len().min(0xFFFF);
        while !s.is_char_boundary(len) {
            len -= 1;
        }
        self.buf.put_u16(len as u16);
        self.buf.put_slice(&s.as_bytes()[..len]);
    }
}

impl Default for Amf0Encoder {
    fn default() -> Self {
        Self::new()
    }
}

/// Encode multiple values into one buffer
pub fn encode_all(values: &[AmfValue]) -> Bytes {
    let mut encoder = Amf0Encoder::new();
    encoder.encode_all(values);
    encoder.finish()
}

/// Decode every value in `data` with a lenient decoder
pub fn decode_all(data: &[u8]) -> Result<Vec<AmfValue>, AmfError> {
    let mut decoder = Amf0Decoder::new();
    let mut buf = Bytes::copy_from_slice(data);
    decoder.decode_all(&mut buf)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ecma_array_wire_layout() {
        let value = AmfValue::EcmaArray(vec![("a".to_string(), AmfValue::Number(1.0))]);
        let encoded = encode_all(&[value]);

        let mut expected = vec![MARKER_ECMA_ARRAY, 0, 0, 0, 1, 0, 1, b'a', MARKER_NUMBER];
        expected.extend_from_slice(&1.0f64.to_be_bytes());
        expected.extend_from_slice(&[0, 0, MARKER_OBJECT_END]);
        assert_eq!(&encoded[..], &expected[..]);
    }

    #[test]
    fn test_script_data_message() {
        let values = vec![
            AmfValue::String("onMetaData".into()),
            AmfValue::EcmaArray(vec![
                ("width".to_string(), AmfValue::Number(1280.0)),
                ("encoder".to_string(), AmfValue::String("obs-output".into())),
                ("stereo".to_string(), AmfValue::Boolean(true)),
            ]),
        ];

        let decoded = decode_all(&encode_all(&values)).unwrap();
        assert_eq!(decoded, values);
        assert_eq!(decoded[1].keys(), vec!["width", "encoder", "stereo"]);
    }

    #[test]
    fn test_nested_values() {
        let values = vec![AmfValue::Object(vec![
            (
                "list".to_string(),
                AmfValue::StrictArray(vec![AmfValue::Null, AmfValue::Undefined]),
            ),
            ("when".to_string(), AmfValue::Date(1_700_000_000_000.0)),
        ])];
        assert_eq!(decode_all(&encode_all(&values)).unwrap(), values);
    }

    #[test]
    fn test_long_string() {
        let long = "x".repeat(70_000);
        let encoded = encode_all(&[AmfValue::String(long.clone())]);
        assert_eq!(encoded[0], MARKER_LONG_STRING);
        assert_eq!(decode_all(&encoded).unwrap(), vec![AmfValue::String(long)]);
    }

    #[test]
    fn test_truncated_input() {
        assert_eq!(decode_all(&[MARKER_NUMBER, 0x40]), Err(AmfError::UnexpectedEof));
        assert_eq!(decode_all(&[MARKER_STRING, 0x00, 0x05, b'a']), Err(AmfError::UnexpectedEof));
    }

    #[test]
    fn test_lenient_missing_object_end() {
        // OBS-style ECMA array without the trailing 0x000009
        let data = [MARKER_ECMA_ARRAY, 0, 0, 0, 1, 0, 1, b'k', MARKER_BOOLEAN, 1];
        let decoded = decode_all(&data).unwrap();
        assert_eq!(decoded[0].get("k"), Some(&AmfValue::Boolean(true)));

        let mut strict = Amf0Decoder::with_lenient(false);
        let mut buf = Bytes::copy_from_slice(&data);
        assert_eq!(strict.decode(&mut buf), Err(AmfError::UnexpectedEof));
    }

    #[test]
    fn test_unknown_marker() {
        assert_eq!(decode_all(&[0x7F]).unwrap(), vec![AmfValue::Undefined]);

        let mut strict = Amf0Decoder::with_lenient(false);
        let mut buf = Bytes::from_static(&[0x7F]);
        assert_eq!(strict.decode(&mut buf), Err(AmfError::UnknownMarker(0x7F)));
    }

    #[test]
    fn test_nesting_limit() {
        let mut data = vec![MARKER_STRICT_ARRAY, 0, 0, 0, 1].repeat(MAX_NESTING_DEPTH + 1);
        data.push(MARKER_NULL);
        assert_eq!(decode_all(&data), Err(AmfError::NestingTooDeep));
    }

    #[test]
    fn test_encoder_reuse() {
        let mut encoder = Amf0Encoder::with_capacity(16);
        assert!(encoder.is_empty());
        encoder.encode(&AmfValue::Null);
        assert_eq!(encoder.len(), 1);
        assert_eq!(&encoder.finish()[..], &[MARKER_NULL]);
        assert!(encoder.is_empty());
    }
}
