//! Wire value codec.
//!
//! Converts between native [`WireValue`]s and the JSON wire representation
//! used by the protocol. Primitives pass through unchanged; element handles
//! use a reserved single-key map encoding so they can round-trip across the
//! boundary.
//!
//! # Encoding rules
//!
//! | Native | Wire |
//! |--------|------|
//! | `Null`/`Bool`/`Str` | unchanged |
//! | `Int` | JSON number |
//! | `Float` (integral) | JSON number without fractional noise |
//! | `Float` (non-finite) | error, not representable in JSON |
//! | `Element` | `{"ELEMENT": "<id>"}` |
//! | `Array`/`Map` | element-/key-wise |
//!
//! Decoding recovers the same structure, with one documented exception:
//! a JSON number that round-trips exactly through an integer parse decodes
//! as [`WireValue::Int`] even if it was sent as a float.

// ============================================================================
// Imports
// ============================================================================

use std::collections::BTreeMap;
use std::fmt;

use serde_json::{Map, Number, Value};

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Reserved element-handle marker key (Firefox extension scheme).
pub const ELEMENT_KEY: &str = "ELEMENT";

/// Reserved element-handle marker key (page-script scheme).
pub const WEB_ELEMENT_KEY: &str = "WebElement";

// ============================================================================
// ElementRef
// ============================================================================

/// An opaque reference to a remote DOM element.
///
/// The id is server-assigned; the handle is only meaningful to the driver
/// instance that produced it.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ElementRef {
    /// Server-assigned element id.
    id: String,
}

impl ElementRef {
    /// Creates a handle from a server-assigned id.
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }

    /// Creates a handle from a raw wire id.
    ///
    /// Some transports report a slash-delimited path (`"0/1/1"`) whose
    /// final segment is the actual id.
    #[must_use]
    pub fn from_wire_id(raw: &str) -> Self {
        let id = raw.rsplit('/').next().unwrap_or(raw);
        Self::new(id)
    }

    /// Returns the element id.
    #[inline]
    #[must_use]
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Returns the wire encoding: a single-key marker map.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        let mut map = Map::with_capacity(1);
        map.insert(ELEMENT_KEY.to_string(), Value::String(self.id.clone()));
        Value::Object(map)
    }
}

impl fmt::Display for ElementRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.id)
    }
}

// ============================================================================
// WireValue
// ============================================================================

/// Recursive tagged union over every value the protocol can carry.
///
/// Integer and floating numbers are distinguished; decode resolves the
/// distinction by probing whether the number round-trips exactly as an
/// integer.
#[derive(Debug, Clone, PartialEq)]
pub enum WireValue {
    /// JSON null.
    Null,
    /// Boolean.
    Bool(bool),
    /// Integer number.
    Int(i64),
    /// Floating-point number.
    Float(f64),
    /// String.
    Str(String),
    /// Remote DOM element handle.
    Element(ElementRef),
    /// Ordered sequence.
    Array(Vec<WireValue>),
    /// String-keyed map. Key order is not semantically significant.
    Map(BTreeMap<String, WireValue>),
}

// ============================================================================
// WireValue - Codec
// ============================================================================

impl WireValue {
    /// Encodes this value into its JSON wire representation.
    ///
    /// Encoding is total for every representable value. The one native
    /// value with no JSON form is a non-finite float.
    ///
    /// # Errors
    ///
    /// Returns [`Error::UnsupportedValueType`] for NaN or infinite floats.
    pub fn encode(&self) -> Result<Value> {
        match self {
            Self::Null => Ok(Value::Null),
            Self::Bool(b) => Ok(Value::Bool(*b)),
            Self::Int(i) => Ok(Value::Number(Number::from(*i))),
            Self::Float(f) => encode_float(*f),
            Self::Str(s) => Ok(Value::String(s.clone())),
            Self::Element(handle) => Ok(handle.to_wire()),
            Self::Array(items) => {
                let mut out = Vec::with_capacity(items.len());
                for item in items {
                    out.push(item.encode()?);
                }
                Ok(Value::Array(out))
            }
            Self::Map(entries) => {
                let mut out = Map::with_capacity(entries.len());
                for (key, value) in entries {
                    out.insert(key.clone(), value.encode()?);
                }
                Ok(Value::Object(out))
            }
        }
    }

    /// Decodes a JSON wire value.
    ///
    /// A map with exactly one key equal to a reserved element marker
    /// decodes as an element handle; the check is an exact single-key
    /// match, never a substring heuristic, so ordinary single-key user
    /// maps are not misread.
    #[must_use]
    pub fn decode(json: &Value) -> Self {
        match json {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(*b),
            Value::Number(n) => decode_number(n),
            Value::String(s) => Self::Str(s.clone()),
            Value::Array(items) => Self::Array(items.iter().map(Self::decode).collect()),
            Value::Object(entries) => {
                if let Some(id) = element_marker_id(entries) {
                    return Self::Element(ElementRef::new(id));
                }
                Self::Map(
                    entries
                        .iter()
                        .map(|(k, v)| (k.clone(), Self::decode(v)))
                        .collect(),
                )
            }
        }
    }
}

// ============================================================================
// WireValue - Accessors
// ============================================================================

impl WireValue {
    /// Returns `true` if this is null.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Returns the string content, if this is a string.
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s),
            _ => None,
        }
    }

    /// Returns the integer content, if this is an integer.
    #[inline]
    #[must_use]
    pub fn as_int(&self) -> Option<i64> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Returns the boolean content, if this is a boolean.
    #[inline]
    #[must_use]
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Self::Bool(b) => Some(*b),
            _ => None,
        }
    }

    /// Returns the element handle, if this is an element.
    #[inline]
    #[must_use]
    pub fn as_element(&self) -> Option<&ElementRef> {
        match self {
            Self::Element(handle) => Some(handle),
            _ => None,
        }
    }

    /// Returns the items, if this is an array.
    #[inline]
    #[must_use]
    pub fn as_array(&self) -> Option<&[WireValue]> {
        match self {
            Self::Array(items) => Some(items),
            _ => None,
        }
    }
}

impl From<&str> for WireValue {
    #[inline]
    fn from(s: &str) -> Self {
        Self::Str(s.to_string())
    }
}

impl From<i64> for WireValue {
    #[inline]
    fn from(i: i64) -> Self {
        Self::Int(i)
    }
}

impl From<bool> for WireValue {
    #[inline]
    fn from(b: bool) -> Self {
        Self::Bool(b)
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Encodes a float, emitting integral values without fractional noise.
fn encode_float(f: f64) -> Result<Value> {
    if !f.is_finite() {
        return Err(Error::unsupported_value_type(format!("non-finite f64 ({f})")));
    }
    if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 {
        return Ok(Value::Number(Number::from(f as i64)));
    }
    // Finite non-integral floats always have a JSON representation.
    Number::from_f64(f)
        .map(Value::Number)
        .ok_or_else(|| Error::unsupported_value_type(format!("f64 ({f})")))
}

/// Decodes a JSON number, probing for an exact integer round-trip.
fn decode_number(n: &Number) -> WireValue {
    if let Some(i) = n.as_i64() {
        return WireValue::Int(i);
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            WireValue::Int(f as i64)
        }
        Some(f) => WireValue::Float(f),
        None => WireValue::Float(f64::NAN),
    }
}

/// Returns the element id if the object is an element-handle encoding.
///
/// Exact single-key match against the reserved markers.
fn element_marker_id(entries: &Map<String, Value>) -> Option<&str> {
    if entries.len() != 1 {
        return None;
    }
    let (key, value) = entries.iter().next()?;
    if key == ELEMENT_KEY || key == WEB_ELEMENT_KEY {
        value.as_str()
    } else {
        None
    }
}

// ============================================================================
// Tests
// ============================================================================
