//! Outbound command message type.
//!
//! A [`Command`] is one request from the local end to the remote end:
//! the current session [`Context`], an optional target element id, the
//! command name, and opaque parameters. Commands are immutable value
//! objects created per invocation and discarded after the round trip.
//!
//! # Format
//!
//! ```json
//! {
//!   "context": "driver42 frame1",
//!   "elementId": "e7",
//!   "commandName": "click",
//!   "parameters": null
//! }
//! ```
//!
//! `elementId` is omitted entirely when absent, never emitted as null.

// ============================================================================
// Imports
// ============================================================================

use serde::Serialize;
use serde_json::Value;

use crate::context::Context;

// ============================================================================
// Command
// ============================================================================

/// One outbound request.
///
/// The context is carried by value: each command holds an independent
/// snapshot of the bridge's context at build time.
#[derive(Debug, Clone, Serialize)]
pub struct Command {
    /// Session context at the time the command was built.
    context: Context,

    /// Target element id, for element-scoped commands.
    #[serde(rename = "elementId", skip_serializing_if = "Option::is_none")]
    element_id: Option<String>,

    /// Command name, e.g. `findElement`.
    #[serde(rename = "commandName")]
    name: String,

    /// Opaque parameters (object, array, or null).
    parameters: Value,
}

impl Command {
    /// Creates a session-scoped command.
    #[inline]
    #[must_use]
    pub fn new(context: Context, name: impl Into<String>, parameters: Value) -> Self {
        Self {
            context,
            element_id: None,
            name: name.into(),
            parameters,
        }
    }

    /// Creates an element-scoped command.
    #[inline]
    #[must_use]
    pub fn with_element(
        context: Context,
        element_id: impl Into<String>,
        name: impl Into<String>,
        parameters: Value,
    ) -> Self {
        Self {
            context,
            element_id: Some(element_id.into()),
            name: name.into(),
            parameters,
        }
    }

    /// Returns the carried context snapshot.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }

    /// Returns the target element id, if any.
    #[inline]
    #[must_use]
    pub fn element_id(&self) -> Option<&str> {
        self.element_id.as_deref()
    }

    /// Returns the command name.
    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parameters.
    #[inline]
    #[must_use]
    pub fn parameters(&self) -> &Value {
        &self.parameters
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
    fn test_session_command_serialization() {
        let cmd = Command::new(
            Context::new("abc 1"),
            "getCurrentUrl",
            Value::Null,
        );
        let json = serde_json::to_value(&cmd).expect("serialize");

        assert_eq!(
            json,
            json!({
                "context": "abc 1",
                "commandName": "getCurrentUrl",
                "parameters": null,
            })
        );
    }

    #[test]
    fn test_element_id_omitted_when_absent() {
        let cmd = Command::new(Context::empty(), "getTitle", Value::Null);
        let json = serde_json::to_string(&cmd).expect("serialize");
        assert!(!json.contains("elementId"));
    }

    #[test]
    fn test_element_command_serialization() {
        let cmd = Command::with_element(
            Context::new("abc 1"),
            "e7",
            "click",
            Value::Null,
        );
        let json = serde_json::to_value(&cmd).expect("serialize");

        assert_eq!(json["elementId"], "e7");
        assert_eq!(json["commandName"], "click");
    }

    #[test]
    fn test_accessors() {
        let cmd = Command::with_element(
            Context::new("abc 1"),
            "e7",
            "getAttribute",
            json!({"name": "href"}),
        );

        assert_eq!(cmd.context().raw(), "abc 1");
        assert_eq!(cmd.element_id(), Some("e7"));
        assert_eq!(cmd.name(), "getAttribute");
        assert_eq!(cmd.parameters()["name"], "href");
    }
}
