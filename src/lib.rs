//! WebDriver bridge - wire-protocol client for extension-hosted remote ends.
//!
//! This library implements the command/response side of a WebDriver-style
//! automation protocol: a local [`Bridge`] serializes named commands,
//! ships them to a remote end living inside the browser, and decodes the
//! responses into typed values and errors.
//!
//! # Architecture
//!
//! The protocol follows a strict client-server model:
//!
//! - **Local end (Rust)**: builds commands, tracks the session context
//! - **Remote end (extension)**: executes commands in the browser
//!
//! Key design principles:
//!
//! - One [`Bridge`] per session; commands execute one at a time
//! - Every response carries the context of the *next* command, which the
//!   bridge adopts unconditionally (frame and window switches included)
//! - Element handles cross the wire as reserved single-key maps or
//!   slash-path id strings; [`ElementRef`] normalizes both
//! - Script arguments and results use typed `{type, value}` envelopes
//!
//! # Quick Start
//!
//! ```no_run
//! use webdriver_bridge::{Bridge, By, ConnectOptions, Result};
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     // Connect to the remote end, preferring the extension channel.
//!     let mut bridge = Bridge::connect(ConnectOptions::new().port(7055)).await?;
//!     bridge.new_session().await?;
//!
//!     // Navigate and interact
//!     bridge.goto("https://example.com").await?;
//!     let heading = bridge.find_element(By::CssSelector, "h1").await?;
//!     println!("Heading: {}", bridge.text(&heading).await?);
//!
//!     bridge.quit().await?;
//!     Ok(())
//! }
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | [`bridge`] | [`Bridge`] orchestrator, cookies, typed operations |
//! | [`context`] | Session/window/frame [`Context`] token |
//! | [`error`] | Error types and [`Result`] alias |
//! | [`protocol`] | Wire value codec and command/response shapes |
//! | [`transport`] | Channel implementations and selection |

// ============================================================================
// Modules
// ============================================================================

/// Command/response bridge and typed operations.
///
/// [`Bridge`] is the entry point for everything: navigation, elements,
/// windows and frames, cookies, and script execution.
pub mod bridge;

/// Session context token.
///
/// Opaque to callers; the bridge adopts it from every response.
pub mod context;

/// Error types and result aliases.
///
/// All fallible operations return [`Result<T>`] which uses [`Error`].
pub mod error;

/// Wire protocol message types.
///
/// Command/response shapes, the wire value codec, and script envelopes.
pub mod protocol;

/// Transport layer.
///
/// WebSocket extension channel, plain socket channel, and the strategy
/// that picks between them.
pub mod transport;

// ============================================================================
// Re-exports
// ============================================================================

// Bridge types
pub use bridge::{Bridge, By, Cookie};

// Context
pub use context::Context;

// Error types
pub use error::{Error, ErrorKind, Result};

// Protocol types
pub use protocol::{ElementRef, ScriptValue, WireValue};

// Transport types
pub use transport::{ConnectOptions, Transport};
