//! Command/response bridge and the typed operations built on it.
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `core` | The [`Bridge`] orchestrator and typed operations |
//! | `cookies` | [`Cookie`] type and wire-format parsing |

// ============================================================================
// Submodules
// ============================================================================

/// Bridge orchestrator.
pub mod core;

/// Cookie handling.
pub mod cookies;

// ============================================================================
// Re-exports
// ============================================================================

pub use self::core::{Bridge, By};
pub use cookies::Cookie;
