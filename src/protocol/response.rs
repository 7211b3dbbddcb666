//! Inbound response message type and error classification.
//!
//! A [`Response`] is one decoded reply from the remote end. Error
//! classification happens exactly once, in [`Response::raise_if_error`],
//! immediately after every round trip; nothing downstream re-inspects
//! the raw error payload shape.
//!
//! # Format
//!
//! ```json
//! {
//!   "context": "driver42 frame1",
//!   "commandName": "findElement",
//!   "response": { ... },
//!   "isError": false
//! }
//! ```

// ============================================================================
// Imports
// ============================================================================

use serde_json::Value;
use tracing::trace;

use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};

use super::wire::WireValue;

// ============================================================================
// Constants
// ============================================================================

/// Legacy plain-string error prefix for obsolete element references.
///
/// Some transports report this condition as unstructured message text
/// rather than a `{name, message}` payload. Known fragility: the match
/// breaks if the remote's message wording changes.
const OBSOLETE_ELEMENT_PREFIX: &str = "element is obsolete";

/// Legacy plain-string error prefix for hidden elements.
const NOT_VISIBLE_PREFIX: &str = "Element is not currently visible";

/// Error text carried by the synthetic response a transport fabricates
/// when the page unloads with commands still in flight.
pub(crate) const PAGE_UNLOAD_MESSAGE: &str = "page unloaded during script execution";

// ============================================================================
// Response
// ============================================================================

/// One decoded inbound reply.
///
/// Created by decoding one wire payload, consumed immediately by the
/// bridge (context adopted, error-or-value branch taken), then discarded.
#[derive(Debug, Clone)]
pub struct Response {
    /// Context returned by the remote end.
    context: Context,

    /// Name of the command this reply answers.
    command_name: String,

    /// Raw response payload.
    value: Value,

    /// Whether the payload is an error.
    is_error: bool,
}

impl Response {
    /// Decodes one raw wire payload.
    ///
    /// Missing fields decode leniently: an absent context normalizes to
    /// the sentinel, an absent `isError` means success.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Connection`] if the payload is not a JSON object.
    pub fn decode(raw: &Value) -> Result<Self> {
        let obj = raw
            .as_object()
            .ok_or_else(|| Error::connection(format!("malformed response payload: {raw}")))?;

        let context = Context::new(
            obj.get("context")
                .and_then(Value::as_str)
                .unwrap_or_default(),
        );
        let command_name = obj
            .get("commandName")
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string();
        let value = obj.get("response").cloned().unwrap_or(Value::Null);
        let is_error = obj.get("isError").and_then(Value::as_bool).unwrap_or(false);

        trace!(command = %command_name, is_error, "Decoded response");

        Ok(Self {
            context,
            command_name,
            value,
            is_error,
        })
    }

    /// Returns the context returned by the remote end.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the answered command's name.
    #[inline]
    #[must_use]
    pub fn command_name(&self) -> &str {
        &self.command_name
    }

    /// Returns the raw response payload.
    ///
    /// Reading a successful value out of an error response is a caller
    /// bug; the type does not police it.
    #[inline]
    #[must_use]
    pub fn value(&self) -> &Value {
        &self.value
    }

    /// Returns the payload decoded through the wire codec.
    ///
    /// Element-reference maps become handles automatically.
    #[inline]
    #[must_use]
    pub fn wire_value(&self) -> WireValue {
        WireValue::decode(&self.value)
    }

    /// Returns `true` if the payload is an error.
    #[inline]
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.is_error
    }
}

// ============================================================================
// Response - Error classification
// ============================================================================

impl Response {
    /// Converts an error payload into a typed error.
    ///
    /// No-op on success. Classification order:
    ///
    /// 1. legacy message-prefix shims (obsolete element, hidden element,
    ///    page unload) — these win regardless of `kind`;
    /// 2. structured `{name, message}` payload, formatted
    ///    `"<name>: <message>"` and mapped through the caller's [`ErrorKind`];
    /// 3. plain-string payload, mapped through `kind` unchanged;
    /// 4. anything else degrades to a generic [`Error::WebDriver`] carrying
    ///    the raw value's string form. This last-resort path cannot fail.
    ///
    /// # Errors
    ///
    /// Returns the classified error when the response is an error.
    pub fn raise_if_error(&self, kind: ErrorKind) -> Result<()> {
        if !self.is_error {
            return Ok(());
        }

        if let Some(err) = self.classify_legacy_text() {
            return Err(err);
        }

        Err(self.classify_payload(kind))
    }

    /// Legacy compatibility shim: two hard-coded English message prefixes
    /// checked before structured-payload parsing.
    fn classify_legacy_text(&self) -> Option<Error> {
        let text = self.error_text()?;

        if text.starts_with(OBSOLETE_ELEMENT_PREFIX) {
            return Some(Error::stale_element(text));
        }
        if text.starts_with(NOT_VISIBLE_PREFIX) {
            return Some(Error::element_not_visible(text));
        }
        if text == PAGE_UNLOAD_MESSAGE {
            return Some(Error::PageUnloaded);
        }
        None
    }

    /// Classifies a structured or plain-string error payload.
    fn classify_payload(&self, kind: ErrorKind) -> Error {
        if let Some(obj) = self.value.as_object()
            && let Some(message) = obj.get("message").and_then(Value::as_str)
        {
            let name = obj
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or("unknown");
            return kind.into_error(format!("{name}: {message}"));
        }

        if let Some(text) = self.value.as_str() {
            return kind.into_error(text);
        }

        // Unusable payload shape: unconditional generic fallback.
        Error::web_driver(self.value.to_string())
    }

    /// Returns the raw error message text, from either a plain string
    /// payload or a structured payload's `message` field.
    fn error_text(&self) -> Option<&str> {
        self.value
            .as_str()
            .or_else(|| self.value.get("message").and_then(Value::as_str))
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;

    fn decode(raw: Value) -> Response {
        Response::decode(&raw).expect("decode")
    }

    #[test]
    fn test_decode_success_response() {
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "getTitle",
            "response": "Example",
            "isError": false,
        }));

        assert_eq!(response.context().raw(), "abc 1");
        assert_eq!(response.command_name(), "getTitle");
        assert_eq!(response.value(), &json!("Example"));
        assert!(!response.is_error());
        assert!(response.raise_if_error(ErrorKind::Generic).is_ok());
    }

    #[test]
    fn test_decode_missing_context_normalizes() {
        let response = decode(json!({"commandName": "x", "response": null}));
        assert_eq!(response.context().raw(), "0 ?");
        assert!(!response.is_error());
    }

    #[test]
    fn test_decode_rejects_non_object() {
        let err = Response::decode(&json!("nope")).unwrap_err();
        assert!(matches!(err, Error::Connection { .. }));
    }

    #[test]
    fn test_wire_value_reconstructs_handles() {
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "findElement",
            "response": {"ELEMENT": "e3"},
            "isError": false,
        }));

        let value = response.wire_value();
        assert_eq!(value.as_element().map(|e| e.id()), Some("e3"));
    }

    #[test]
    fn test_obsolete_element_beats_expected_kind() {
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "click",
            "response": "element is obsolete: it left the DOM",
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::NoSuchElement).unwrap_err();
        assert!(matches!(err, Error::StaleElementReference { .. }));
    }

    #[test]
    fn test_not_visible_prefix_classifies() {
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "click",
            "response": "Element is not currently visible and may not be clicked",
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::Generic).unwrap_err();
        assert!(matches!(err, Error::ElementNotVisible { .. }));
    }

    #[test]
    fn test_unload_sentinel_classifies_as_page_unloaded() {
        let response = decode(json!({
            "context": "",
            "commandName": "executeScript",
            "response": PAGE_UNLOAD_MESSAGE,
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::Generic).unwrap_err();
        assert!(matches!(err, Error::PageUnloaded));
    }

    #[test]
    fn test_structured_payload_uses_expected_kind() {
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "findElement",
            "response": {"name": "NoSuchElementError", "message": "no match"},
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::NoSuchElement).unwrap_err();
        assert!(matches!(err, Error::NoSuchElement { .. }));
        assert!(err.to_string().contains("NoSuchElementError: no match"));
    }

    #[test]
    fn test_structured_payload_name_defaults_to_unknown() {
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "goto",
            "response": {"message": "boom"},
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::Generic).unwrap_err();
        assert_eq!(err.to_string(), "WebDriver error: unknown: boom");
    }

    #[test]
    fn test_plain_string_payload_uses_expected_kind() {
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "switchToFrame",
            "response": "no frame at index 3",
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::NoSuchFrame).unwrap_err();
        assert!(matches!(err, Error::NoSuchFrame { .. }));
    }

    #[test]
    fn test_malformed_payload_falls_back_to_generic() {
        // A structured payload without a message, raised with any kind,
        // still produces an error carrying the raw value's string form.
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "x",
            "response": {"name": "Foo", "code": 7},
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::NoSuchElement).unwrap_err();
        assert!(matches!(err, Error::WebDriver { .. }));
        assert!(err.to_string().contains("Foo"));
    }

    #[test]
    fn test_numeric_payload_falls_back_to_generic() {
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "x",
            "response": 42,
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::Generic).unwrap_err();
        assert!(matches!(err, Error::WebDriver { .. }));
        assert!(err.to_string().contains("42"));
    }

    #[test]
    fn test_fallback_keeps_message_text() {
        // Structured payload with message "bar": some error always
        // surfaces containing "bar", never a secondary failure.
        let response = decode(json!({
            "context": "abc 1",
            "commandName": "x",
            "response": {"name": "Foo", "message": "bar"},
            "isError": true,
        }));

        let err = response.raise_if_error(ErrorKind::InvalidOperation).unwrap_err();
        assert!(err.to_string().contains("bar"));
    }
}
