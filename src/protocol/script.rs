//! Script argument and result envelopes.
//!
//! "Execute script" commands carry their arguments and results in a
//! `{type, value}` envelope distinct from the generic wire codec:
//!
//! - each top-level argument is wrapped as
//!   `{"type": STRING|NUMBER|BOOLEAN|ELEMENT|ARRAY, "value": ...}` in a
//!   shallow pre-pass before the codec sees it;
//! - the result envelope's `type` is `NULL`, `ELEMENT`, `ARRAY`, or
//!   omitted for plain scalars.
//!
//! A script result that is an array of elements is exposed both as a
//! sequence and, via [`ScriptValue::as_element_list`], as a homogeneous
//! element-handle list.

// ============================================================================
// Imports
// ============================================================================

use serde_json::{Value, json};

use crate::error::{Error, Result};

use super::wire::{ElementRef, WireValue};

// ============================================================================
// Argument wrapping
// ============================================================================

/// Wraps one top-level script argument in its `{type, value}` envelope.
///
/// This is a shallow pre-pass: array entries are wrapped element-wise,
/// but values nested inside maps go through the generic codec untouched.
///
/// # Errors
///
/// Returns [`Error::UnsupportedValueType`] for arguments with no envelope
/// type (maps, non-finite floats).
pub fn wrap_argument(arg: &WireValue) -> Result<Value> {
    match arg {
        WireValue::Null => Ok(Value::Null),
        WireValue::Str(s) => Ok(envelope("STRING", Value::String(s.clone()))),
        WireValue::Int(_) | WireValue::Float(_) => Ok(envelope("NUMBER", arg.encode()?)),
        WireValue::Bool(b) => Ok(envelope("BOOLEAN", Value::Bool(*b))),
        WireValue::Element(handle) => {
            Ok(envelope("ELEMENT", Value::String(handle.id().to_string())))
        }
        WireValue::Array(items) => {
            let mut wrapped = Vec::with_capacity(items.len());
            for item in items {
                wrapped.push(wrap_argument(item)?);
            }
            Ok(envelope("ARRAY", Value::Array(wrapped)))
        }
        WireValue::Map(_) => Err(Error::unsupported_value_type("map script argument")),
    }
}

fn envelope(kind: &str, value: Value) -> Value {
    json!({ "type": kind, "value": value })
}

// ============================================================================
// ScriptValue
// ============================================================================

/// Decoded script return value.
///
/// An array result whose entries are all element handles is still a
/// [`ScriptValue::Sequence`]; the homogeneous element-list view is a
/// derived convenience, not a separate variant.
#[derive(Debug, Clone, PartialEq)]
pub enum ScriptValue {
    /// A plain scalar (including null).
    Scalar(WireValue),
    /// A remote element handle.
    Element(ElementRef),
    /// An ordered sequence of script values.
    Sequence(Vec<ScriptValue>),
}

impl ScriptValue {
    /// Decodes a script result envelope.
    ///
    /// The envelope's `type` is `NULL`, `ELEMENT`, `ARRAY`, or omitted
    /// for plain scalars. An `ELEMENT` value may be a slash-delimited
    /// path whose final segment is the id.
    #[must_use]
    pub fn decode(raw: &Value) -> Self {
        let Some(obj) = raw.as_object() else {
            return Self::Scalar(WireValue::decode(raw));
        };

        let value = obj.get("value").unwrap_or(&Value::Null);
        match obj.get("type").and_then(Value::as_str) {
            Some("NULL") => Self::Scalar(WireValue::Null),
            Some("ELEMENT") => Self::decode_element(value),
            Some("ARRAY") => Self::decode_sequence(value),
            // Explicitly-typed scalar envelope (STRING/NUMBER/BOOLEAN).
            Some(_) => Self::Scalar(WireValue::decode(value)),
            // No envelope at all: plain scalar decode of the raw payload.
            None => Self::Scalar(WireValue::decode(raw)),
        }
    }

    fn decode_element(value: &Value) -> Self {
        match value.as_str() {
            Some(raw_id) => Self::Element(ElementRef::from_wire_id(raw_id)),
            None => Self::Scalar(WireValue::decode(value)),
        }
    }

    fn decode_sequence(value: &Value) -> Self {
        match value.as_array() {
            Some(items) => Self::Sequence(items.iter().map(Self::decode).collect()),
            None => Self::Scalar(WireValue::decode(value)),
        }
    }

    /// Returns the homogeneous element-handle view of a sequence.
    ///
    /// `Some` only when this is a sequence and *every* entry is an
    /// element handle.
    #[must_use]
    pub fn as_element_list(&self) -> Option<Vec<ElementRef>> {
        let Self::Sequence(items) = self else {
            return None;
        };
        items
            .iter()
            .map(|item| match item {
                Self::Element(handle) => Some(handle.clone()),
                _ => None,
            })
            .collect()
    }

    /// Returns the scalar wire value, if this is a scalar.
    #[inline]
    #[must_use]
    pub fn as_scalar(&self) -> Option<&WireValue> {
        match self {
            Self::Scalar(value) => Some(value),
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

    /// Returns `true` if this is a null scalar.
    #[inline]
    #[must_use]
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Scalar(WireValue::Null))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    #[test]
    fn test_wrap_string_argument() {
        let wrapped = wrap_argument(&WireValue::from("hello")).expect("wrap");
        assert_eq!(wrapped, json!({"type": "STRING", "value": "hello"}));
    }

    #[test]
    fn test_wrap_number_arguments() {
        let wrapped = wrap_argument(&WireValue::Int(7)).expect("wrap");
        assert_eq!(wrapped, json!({"type": "NUMBER", "value": 7}));

        let wrapped = wrap_argument(&WireValue::Float(1.5)).expect("wrap");
        assert_eq!(wrapped, json!({"type": "NUMBER", "value": 1.5}));
    }

    #[test]
    fn test_wrap_boolean_argument() {
        let wrapped = wrap_argument(&WireValue::Bool(true)).expect("wrap");
        assert_eq!(wrapped, json!({"type": "BOOLEAN", "value": true}));
    }

    #[test]
    fn test_wrap_element_argument() {
        let wrapped =
            wrap_argument(&WireValue::Element(ElementRef::new("e9"))).expect("wrap");
        assert_eq!(wrapped, json!({"type": "ELEMENT", "value": "e9"}));
    }

    #[test]
    fn test_wrap_array_argument_is_elementwise() {
        let arg = WireValue::Array(vec![WireValue::Int(1), WireValue::from("a")]);
        let wrapped = wrap_argument(&arg).expect("wrap");
        assert_eq!(
            wrapped,
            json!({"type": "ARRAY", "value": [
                {"type": "NUMBER", "value": 1},
                {"type": "STRING", "value": "a"},
            ]})
        );
    }

    #[test]
    fn test_wrap_null_argument_passes_through() {
        let wrapped = wrap_argument(&WireValue::Null).expect("wrap");
        assert_eq!(wrapped, Value::Null);
    }

    #[test]
    fn test_wrap_map_argument_is_unsupported() {
        let arg = WireValue::Map(Default::default());
        let err = wrap_argument(&arg).unwrap_err();
        assert!(matches!(err, Error::UnsupportedValueType { .. }));
    }

    #[test]
    fn test_decode_number_result() {
        let result = ScriptValue::decode(&json!({"type": "NUMBER", "value": 2}));
        assert_eq!(result.as_scalar().and_then(WireValue::as_int), Some(2));
    }

    #[test]
    fn test_decode_null_result() {
        let result = ScriptValue::decode(&json!({"type": "NULL", "value": null}));
        assert!(result.is_null());
    }

    #[test]
    fn test_decode_element_result_with_slash_path() {
        let result = ScriptValue::decode(&json!({"type": "ELEMENT", "value": "0/1/1"}));
        assert_eq!(result.as_element().map(ElementRef::id), Some("1"));
    }

    #[test]
    fn test_decode_bare_scalar_result() {
        let result = ScriptValue::decode(&json!("title"));
        assert_eq!(result.as_scalar().and_then(WireValue::as_str), Some("title"));
    }

    #[test]
    fn test_decode_homogeneous_element_array() {
        let result = ScriptValue::decode(&json!({
            "type": "ARRAY",
            "value": [
                {"type": "ELEMENT", "value": "0/1"},
                {"type": "ELEMENT", "value": "0/2"},
            ],
        }));

        let handles = result.as_element_list().expect("all entries are elements");
        assert_eq!(handles.len(), 2);
        assert_eq!(handles[0].id(), "1");
        assert_eq!(handles[1].id(), "2");
    }

    #[test]
    fn test_mixed_array_is_not_an_element_list() {
        let result = ScriptValue::decode(&json!({
            "type": "ARRAY",
            "value": [
                {"type": "ELEMENT", "value": "0/1"},
                {"type": "NUMBER", "value": 3},
            ],
        }));

        assert!(result.as_element_list().is_none());
        assert!(matches!(result, ScriptValue::Sequence(ref items) if items.len() == 2));
    }

    #[test]
    fn test_nested_array_result() {
        let result = ScriptValue::decode(&json!({
            "type": "ARRAY",
            "value": [
                {"type": "ARRAY", "value": [{"type": "NUMBER", "value": 1}]},
            ],
        }));

        let ScriptValue::Sequence(items) = result else {
            panic!("expected sequence");
        };
        assert!(matches!(items[0], ScriptValue::Sequence(_)));
    }
}
