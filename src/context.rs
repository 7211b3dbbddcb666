//! Session context threaded through every command and response.
//!
//! A [`Context`] names *where* a command executes: an opaque driver/session
//! identifier plus a hierarchical window/frame qualifier, e.g.
//! `"driver42 frame1"`. The remote end returns a (possibly different)
//! context with every response, and the bridge adopts it wholesale; that
//! is how frame and window navigation state propagates without an
//! explicit "current frame" variable.
//!
//! Contexts are replaced, never mutated.

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde::de::{Deserialize, Deserializer};
use serde::Serialize;

// ============================================================================
// Constants
// ============================================================================

/// Sentinel context used before a session is established.
///
/// An upstream empty context normalizes to this so that a context is
/// never truly empty.
const SENTINEL: &str = "0 ?";

// ============================================================================
// Context
// ============================================================================

/// Session/frame/window qualifier carried by every command and response.
///
/// # Example
///
/// ```
/// use webdriver_bridge::Context;
///
/// let ctx = Context::new("abc 123");
/// assert_eq!(ctx.driver_id(), "abc");
/// assert_eq!(ctx.raw(), "abc 123");
///
/// // Empty input normalizes to the sentinel.
/// assert_eq!(Context::new("").raw(), "0 ?");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct Context(String);

// Deserialization funnels through `Context::new` so an empty wire string
// still normalizes to the sentinel.
impl<'de> Deserialize<'de> for Context {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::new(raw))
    }
}

impl Context {
    /// Creates a context from the remote end's raw qualifier string.
    ///
    /// Empty input normalizes to the sentinel `"0 ?"`.
    #[must_use]
    pub fn new(raw: impl Into<String>) -> Self {
        let raw = raw.into();
        if raw.is_empty() {
            Self::empty()
        } else {
            Self(raw)
        }
    }

    /// Creates the sentinel empty context.
    #[inline]
    #[must_use]
    pub fn empty() -> Self {
        Self(SENTINEL.to_string())
    }

    /// Returns the driver/session id: the substring before the first space.
    #[inline]
    #[must_use]
    pub fn driver_id(&self) -> &str {
        match self.0.split_once(' ') {
            Some((id, _)) => id,
            None => &self.0,
        }
    }

    /// Returns the full qualifier string.
    #[inline]
    #[must_use]
    pub fn raw(&self) -> &str {
        &self.0
    }
}

impl Default for Context {
    #[inline]
    fn default() -> Self {
        Self::empty()
    }
}

impl fmt::Display for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Context {
    #[inline]
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_normalizes_to_sentinel() {
        assert_eq!(Context::new("").raw(), "0 ?");
        assert_eq!(Context::empty().raw(), "0 ?");
        assert_eq!(Context::default().raw(), "0 ?");
    }

    #[test]
    fn test_driver_id_splits_on_first_space() {
        let ctx = Context::new("abc 123");
        assert_eq!(ctx.driver_id(), "abc");
    }

    #[test]
    fn test_driver_id_with_nested_qualifier() {
        let ctx = Context::new("driver42 frame1 sub2");
        assert_eq!(ctx.driver_id(), "driver42");
        assert_eq!(ctx.raw(), "driver42 frame1 sub2");
    }

    #[test]
    fn test_driver_id_without_qualifier() {
        let ctx = Context::new("lonely");
        assert_eq!(ctx.driver_id(), "lonely");
    }

    #[test]
    fn test_sentinel_driver_id() {
        assert_eq!(Context::empty().driver_id(), "0");
    }

    #[test]
    fn test_serde_transparent() {
        let ctx = Context::new("abc 123");
        let json = serde_json::to_string(&ctx).expect("serialize");
        assert_eq!(json, "\"abc 123\"");

        let back: Context = serde_json::from_str(&json).expect("parse");
        assert_eq!(back, ctx);
    }

    #[test]
    fn test_deserialize_empty_normalizes() {
        let ctx: Context = serde_json::from_str("\"\"").expect("parse");
        assert_eq!(ctx.raw(), "0 ?");
    }
}
