//! Error types for the WebDriver bridge.
//!
//! This module defines all error types used throughout the crate.
//!
//! # Usage
//!
//! All fallible operations return [`Result<T>`] which uses [`Error`]:
//!
//! ```ignore
//! use webdriver_bridge::{Result, Error};
//!
//! async fn example(bridge: &mut Bridge) -> Result<()> {
//!     let element = bridge.find_element(By::Id, "submit").await?;
//!     bridge.click(&element).await?;
//!     Ok(())
//! }
//! ```
//!
//! # Error Categories
//!
//! | Category | Variants |
//! |----------|----------|
//! | Protocol | [`Error::WebDriver`], [`Error::StaleElementReference`], [`Error::ElementNotVisible`] |
//! | Lookup | [`Error::NoSuchElement`], [`Error::NoSuchFrame`], [`Error::NoSuchWindow`] |
//! | Codec | [`Error::UnsupportedValueType`], [`Error::CookieParse`] |
//! | Connection | [`Error::Connection`], [`Error::ConnectionTimeout`], [`Error::ConnectionClosed`] |
//! | External | [`Error::Io`], [`Error::Json`], [`Error::WebSocket`] |
//!
//! # Expected error kinds
//!
//! Different commands have a different natural failure identity even though
//! the wire payload shape is identical: a failed find should surface as
//! [`Error::NoSuchElement`], a failed navigation as a plain
//! [`Error::WebDriver`]. Callers of `Bridge::execute` pass an [`ErrorKind`]
//! tag naming that identity; the response decoder maps tag + formatted
//! message to the concrete variant.

// ============================================================================
// Imports
// ============================================================================

use std::io::Error as IoError;
use std::result::Result as StdResult;

use thiserror::Error;
use tokio::sync::oneshot::error::RecvError;
use tokio_tungstenite::tungstenite::Error as WsError;
use uuid::Uuid;

// ============================================================================
// Result Alias
// ============================================================================

/// Result type alias using crate [`enum@Error`].
///
/// All fallible operations in this crate return this type.
pub type Result<T> = StdResult<T, Error>;

// ============================================================================
// Error Enum
// ============================================================================

/// Main error type for the crate.
///
/// Each variant includes relevant context for debugging.
#[derive(Error, Debug)]
pub enum Error {
    // ========================================================================
    // Protocol Errors
    // ========================================================================
    /// Generic WebDriver failure reported by the remote end.
    ///
    /// Also the unconditional fallback when an error payload cannot be
    /// interpreted in any more specific way.
    #[error("WebDriver error: {message}")]
    WebDriver {
        /// Formatted `"<name>: <message>"` from the error payload.
        message: String,
    },

    /// Element reference is obsolete (no longer attached to the DOM).
    #[error("Stale element reference: {message}")]
    StaleElementReference {
        /// Error message from the remote end.
        message: String,
    },

    /// Element exists but is not currently visible.
    #[error("Element not visible: {message}")]
    ElementNotVisible {
        /// Error message from the remote end.
        message: String,
    },

    /// No window matched a switch-to-window request.
    #[error("No such window: {message}")]
    NoSuchWindow {
        /// Name or message describing the missing window.
        message: String,
    },

    /// No frame matched a switch-to-frame request.
    #[error("No such frame: {message}")]
    NoSuchFrame {
        /// Index or name describing the missing frame.
        message: String,
    },

    /// No element matched a find request.
    #[error("No such element: {message}")]
    NoSuchElement {
        /// Locator describing the missing element.
        message: String,
    },

    /// The remote end rejected the operation as invalid in its current state.
    #[error("Invalid operation: {message}")]
    InvalidOperation {
        /// Error message from the remote end.
        message: String,
    },

    // ========================================================================
    // Codec Errors
    // ========================================================================
    /// The codec encountered a native value it cannot serialize.
    #[error("Unsupported value type: {type_name}")]
    UnsupportedValueType {
        /// Runtime type name of the offending value.
        type_name: String,
    },

    /// A cookie attribute batch could not be parsed.
    ///
    /// Cookie parse failures are always wrapped here rather than leaking
    /// a raw parse error.
    #[error("Cookie parse error: {message}")]
    CookieParse {
        /// Description of the malformed attribute string.
        message: String,
    },

    // ========================================================================
    // Configuration Errors
    // ========================================================================
    /// Configuration error.
    #[error("Configuration error: {message}")]
    Config {
        /// Description of the configuration error.
        message: String,
    },

    /// URL failed validation before navigation.
    #[error("Invalid URL: {0}")]
    InvalidUrl(#[from] url::ParseError),

    // ========================================================================
    // Connection Errors
    // ========================================================================
    /// Transport connection failed.
    #[error("Connection failed: {message}")]
    Connection {
        /// Description of the connection error.
        message: String,
    },

    /// Connection timeout waiting for the remote end.
    #[error("Connection timeout after {timeout_ms}ms")]
    ConnectionTimeout {
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// Connection closed unexpectedly.
    #[error("Connection closed")]
    ConnectionClosed,

    /// Command request timeout.
    #[error("Request {request_id} timed out after {timeout_ms}ms")]
    RequestTimeout {
        /// Correlation id of the request that timed out.
        request_id: Uuid,
        /// Milliseconds waited before timeout.
        timeout_ms: u64,
    },

    /// The page unloaded while a command was still in flight.
    #[error("page unloaded during script execution")]
    PageUnloaded,

    // ========================================================================
    // External Errors
    // ========================================================================
    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] IoError),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// WebSocket error.
    #[error("WebSocket error: {0}")]
    WebSocket(#[from] WsError),

    /// Channel receive error.
    #[error("Channel closed")]
    ChannelClosed(#[from] RecvError),
}

// ============================================================================
// Error Constructors
// ============================================================================

impl Error {
    /// Creates a generic WebDriver error.
    #[inline]
    pub fn web_driver(message: impl Into<String>) -> Self {
        Self::WebDriver {
            message: message.into(),
        }
    }

    /// Creates a stale element reference error.
    #[inline]
    pub fn stale_element(message: impl Into<String>) -> Self {
        Self::StaleElementReference {
            message: message.into(),
        }
    }

    /// Creates an element not visible error.
    #[inline]
    pub fn element_not_visible(message: impl Into<String>) -> Self {
        Self::ElementNotVisible {
            message: message.into(),
        }
    }

    /// Creates a no such window error.
    #[inline]
    pub fn no_such_window(message: impl Into<String>) -> Self {
        Self::NoSuchWindow {
            message: message.into(),
        }
    }

    /// Creates an unsupported value type error.
    #[inline]
    pub fn unsupported_value_type(type_name: impl Into<String>) -> Self {
        Self::UnsupportedValueType {
            type_name: type_name.into(),
        }
    }

    /// Creates a cookie parse error.
    #[inline]
    pub fn cookie_parse(message: impl Into<String>) -> Self {
        Self::CookieParse {
            message: message.into(),
        }
    }

    /// Creates a configuration error.
    #[inline]
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
        }
    }

    /// Creates a connection error.
    #[inline]
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection {
            message: message.into(),
        }
    }

    /// Creates a connection timeout error.
    #[inline]
    pub fn connection_timeout(timeout_ms: u64) -> Self {
        Self::ConnectionTimeout { timeout_ms }
    }

    /// Creates a request timeout error.
    #[inline]
    pub fn request_timeout(request_id: Uuid, timeout_ms: u64) -> Self {
        Self::RequestTimeout {
            request_id,
            timeout_ms,
        }
    }
}

// ============================================================================
// Error Predicates
// ============================================================================

impl Error {
    /// Returns `true` if this is a timeout error.
    #[inline]
    #[must_use]
    pub fn is_timeout(&self) -> bool {
        matches!(
            self,
            Self::ConnectionTimeout { .. } | Self::RequestTimeout { .. }
        )
    }

    /// Returns `true` if this is a connection-level error.
    ///
    /// Connection errors come from the transport, not the protocol; they
    /// are never re-typed by the bridge.
    #[inline]
    #[must_use]
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection { .. }
                | Self::ConnectionTimeout { .. }
                | Self::ConnectionClosed
                | Self::RequestTimeout { .. }
                | Self::WebSocket(_)
        )
    }

    /// Returns `true` if this error came from a wire error payload.
    #[inline]
    #[must_use]
    pub fn is_protocol_error(&self) -> bool {
        matches!(
            self,
            Self::WebDriver { .. }
                | Self::StaleElementReference { .. }
                | Self::ElementNotVisible { .. }
                | Self::NoSuchWindow { .. }
                | Self::NoSuchFrame { .. }
                | Self::NoSuchElement { .. }
                | Self::InvalidOperation { .. }
        )
    }
}

// ============================================================================
// ErrorKind
// ============================================================================

/// The failure identity a command's caller considers idiomatic.
///
/// Passed to `Bridge::execute` per command and consumed by
/// `Response::raise_if_error` when a structured error payload arrives.
/// This replaces per-error-code dispatch inside the response decoder:
/// the call site knows whether a failure is a missing element, a missing
/// frame, or just a driver error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// Generic driver failure ([`Error::WebDriver`]).
    Generic,
    /// Element lookup failure ([`Error::NoSuchElement`]).
    NoSuchElement,
    /// Frame switch failure ([`Error::NoSuchFrame`]).
    NoSuchFrame,
    /// Window switch failure ([`Error::NoSuchWindow`]).
    NoSuchWindow,
    /// Operation invalid in the current state ([`Error::InvalidOperation`]).
    InvalidOperation,
}

impl ErrorKind {
    /// Maps this kind plus a formatted message to the concrete error variant.
    #[inline]
    #[must_use]
    pub fn into_error(self, message: impl Into<String>) -> Error {
        let message = message.into();
        match self {
            Self::Generic => Error::WebDriver { message },
            Self::NoSuchElement => Error::NoSuchElement { message },
            Self::NoSuchFrame => Error::NoSuchFrame { message },
            Self::NoSuchWindow => Error::NoSuchWindow { message },
            Self::InvalidOperation => Error::InvalidOperation { message },
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use std::io::ErrorKind as IoErrorKind;

    #[test]
    fn test_error_display() {
        let err = Error::web_driver("NoSuchElementError: not found");
        assert_eq!(
            err.to_string(),
            "WebDriver error: NoSuchElementError: not found"
        );
    }

    #[test]
    fn test_config_error() {
        let err = Error::config("missing host");
        assert_eq!(err.to_string(), "Configuration error: missing host");
    }

    #[test]
    fn test_kind_maps_to_variant() {
        assert!(matches!(
            ErrorKind::NoSuchElement.into_error("x"),
            Error::NoSuchElement { .. }
        ));
        assert!(matches!(
            ErrorKind::NoSuchFrame.into_error("x"),
            Error::NoSuchFrame { .. }
        ));
        assert!(matches!(
            ErrorKind::NoSuchWindow.into_error("x"),
            Error::NoSuchWindow { .. }
        ));
        assert!(matches!(
            ErrorKind::InvalidOperation.into_error("x"),
            Error::InvalidOperation { .. }
        ));
        assert!(matches!(
            ErrorKind::Generic.into_error("x"),
            Error::WebDriver { .. }
        ));
    }

    #[test]
    fn test_kind_preserves_message() {
        let err = ErrorKind::NoSuchElement.into_error("id=submit");
        assert_eq!(err.to_string(), "No such element: id=submit");
    }

    #[test]
    fn test_is_timeout() {
        let timeout_err = Error::ConnectionTimeout { timeout_ms: 5000 };
        let other_err = Error::connection("test");

        assert!(timeout_err.is_timeout());
        assert!(!other_err.is_timeout());
    }

    #[test]
    fn test_is_connection_error() {
        let conn_err = Error::connection("test");
        let closed_err = Error::ConnectionClosed;
        let other_err = Error::web_driver("test");

        assert!(conn_err.is_connection_error());
        assert!(closed_err.is_connection_error());
        assert!(!other_err.is_connection_error());
    }

    #[test]
    fn test_is_protocol_error() {
        assert!(Error::stale_element("gone").is_protocol_error());
        assert!(Error::no_such_window("main").is_protocol_error());
        assert!(!Error::ConnectionClosed.is_protocol_error());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = IoError::new(IoErrorKind::NotFound, "refused");
        let err: Error = io_err.into();
        assert!(matches!(err, Error::Io(_)));
    }

    #[test]
    fn test_from_json_error() {
        let json_err = serde_json::from_str::<String>("invalid").unwrap_err();
        let err: Error = json_err.into();
        assert!(matches!(err, Error::Json(_)));
    }
}
