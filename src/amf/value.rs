//! AMF value types
//!
//! Object-like values keep their properties in insertion order. The relay
//! synthesizes `onMetaData` bodies that must be byte-for-byte reproducible,
//! so a hash map's iteration order is not an option here.

/// Ordered key/value pairs of an AMF object or ECMA array
pub type AmfProperties = Vec<(String, AmfValue)>;

/// AMF0 value representation
#[derive(Debug, Clone, PartialEq)]
pub enum AmfValue {
    /// Null value (0x05)
    Null,

    /// Undefined value (0x06)
    Undefined,

    /// Boolean value (0x01)
    Boolean(bool),

    /// IEEE 754 double-precision floating point (0x00)
    Number(f64),

    /// UTF-8 string (0x02, or 0x0C when longer than 65535 bytes)
    String(String),

    /// Anonymous object (0x03)
    Object(AmfProperties),

    /// ECMA array (0x08), the container used by `onMetaData`
    EcmaArray(AmfProperties),

    /// Strict array (0x0A)
    StrictArray(Vec<AmfValue>),

    /// Date as milliseconds since Unix epoch (0x0B)
    Date(f64),
}

impl AmfValue {
    /// Try to get this value as a string reference
    pub fn as_str(&self) -> Option<&str> {
        match self {
            AmfValue::String(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a number
    pub fn as_number(&self) -> Option<f64> {
        match self {
            AmfValue::Number(n) => Some(*n),
            _ => None,
        }
    }

    /// Try to get this value as a boolean
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            AmfValue::Boolean(b) => Some(*b),
            _ => None,
        }
    }

    /// Properties of an object or ECMA array, in wire order
    pub fn properties(&self) -> Option<&[(String, AmfValue)]> {
        match self {
            AmfValue::Object(props) | AmfValue::EcmaArray(props) => Some(props),
            _ => None,
        }
    }

    /// Property names of an object or ECMA array, in wire order
    pub fn keys(&self) -> Vec<&str> {
        self.properties()
            .map(|props| props.iter().map(|(k, _)| k.as_str()).collect())
            .unwrap_or_default()
    }

    /// Get a property from an object value
    pub fn get(&self, key: &str) -> Option<&AmfValue> {
        self.properties()?
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v)
    }

    /// Get a string property from an object value
    pub fn get_string(&self, key: &str) -> Option<&str> {
        self.get(key)?.as_str()
    }

    /// Get a number property from an object value
    pub fn get_number(&self, key: &str) -> Option<f64> {
        self.get(key)?.as_number()
    }
}

impl Default for AmfValue {
    fn default() -> Self {
        AmfValue::Null
    }
}

impl From<bool> for AmfValue {
    fn from(v: bool) -> Self {
        AmfValue::Boolean(v)
    }
}

impl From<f64> for AmfValue {
    fn from(v: f64) -> Self {
        AmfValue::Number(v)
    }
}

impl From<u8> for AmfValue {
    fn from(v: u8) -> Self {
        AmfValue::Number(v as f64)
    }
}

impl From<u32> for AmfValue {
    fn from(v: u32) -> Self {
        AmfValue::Number(v as f64)
    }
}

impl From<String> for AmfValue {
    fn from(v: String) -> Self {
        AmfValue::String(v)
    }
}

impl From<&str> for AmfValue {
    fn from(v: &str) -> Self {
        AmfValue::String(v.to_string())
    }
}
