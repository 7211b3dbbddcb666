//! Wire protocol message and value types.
//!
//! This module defines the message format exchanged between the local
//! end (Rust) and the remote end (browser extension).
//!
//! # Protocol Overview
//!
//! | Message Type | Direction | Purpose |
//! |--------------|-----------|---------|
//! | [`Command`] | Local → Remote | Named command with context and parameters |
//! | [`Response`] | Remote → Local | Value or error payload with new context |
//!
//! Values embedded in commands and responses go through the
//! [`WireValue`] codec; script arguments and results additionally use
//! the `{type, value}` envelopes in [`script`].
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `command` | Outbound command message |
//! | `response` | Inbound response message and error classification |
//! | `script` | Script argument/result envelopes |
//! | `wire` | Wire value codec and element handles |

// ============================================================================
// Submodules
// ============================================================================

/// Outbound command message type.
pub mod command;

/// Inbound response message type and error classification.
pub mod response;

/// Script argument and result envelopes.
pub mod script;

/// Wire value codec.
pub mod wire;

// ============================================================================
// Re-exports
// ============================================================================

pub use command::Command;
pub use response::Response;
pub use script::{ScriptValue, wrap_argument};
pub use wire::{ELEMENT_KEY, ElementRef, WEB_ELEMENT_KEY, WireValue};
