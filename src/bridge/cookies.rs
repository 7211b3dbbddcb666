//! Cookie type and wire-format parsing.
//!
//! The remote end reports a cookie batch as one semicolon-delimited
//! attribute string per cookie, not nested JSON:
//!
//! ```text
//! name=value; path=/; domain=.example.com; secure
//! ```
//!
//! The `name=value` identity pair always comes first. Parsing splits
//! attributes on the *first* `=` only, since values may themselves
//! contain `=`. Parse failures are wrapped into a driver error; a raw
//! parse failure never escapes this module.

// ============================================================================
// Imports
// ============================================================================

use std::result::Result as StdResult;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use serde::ser::Serializer;
use serde::Serialize;

use crate::error::{Error, Result};

// ============================================================================
// Constants
// ============================================================================

/// Seconds between 0001-01-01 and the Unix epoch.
const TICKS_EPOCH_OFFSET_SECS: u64 = 62_135_596_800;

/// 100-nanosecond ticks per second.
const TICKS_PER_SEC: u64 = 10_000_000;

/// Expiry values at or above this are tick counts, below are Unix
/// seconds. Tick counts for any modern date are 17+ digits; Unix second
/// counts are 10.
const TICKS_THRESHOLD: u64 = 1_000_000_000_000;

// ============================================================================
// Cookie
// ============================================================================

/// Browser cookie with standard properties.
///
/// # Example
///
/// ```
/// use webdriver_bridge::Cookie;
///
/// let cookie = Cookie::new("session", "abc123")
///     .with_domain("example.com")
///     .with_path("/")
///     .with_secure(true);
/// assert_eq!(cookie.name, "session");
/// ```
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Cookie {
    /// Cookie name.
    pub name: String,
    /// Cookie value.
    pub value: String,
    /// Domain, without a leading dot.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub domain: Option<String>,
    /// Path.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Secure flag.
    pub secure: bool,
    /// Absolute expiry; `None` for session cookies.
    #[serde(
        rename = "expiry",
        skip_serializing_if = "Option::is_none",
        serialize_with = "serialize_expiry"
    )]
    pub expiry: Option<SystemTime>,
}

impl Cookie {
    /// Creates a new cookie with name and value.
    #[inline]
    #[must_use]
    pub fn new(name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: None,
            path: None,
            secure: false,
            expiry: None,
        }
    }

    /// Sets the domain.
    #[inline]
    #[must_use]
    pub fn with_domain(mut self, domain: impl Into<String>) -> Self {
        self.domain = Some(domain.into());
        self
    }

    /// Sets the path.
    #[inline]
    #[must_use]
    pub fn with_path(mut self, path: impl Into<String>) -> Self {
        self.path = Some(path.into());
        self
    }

    /// Sets the secure flag.
    #[inline]
    #[must_use]
    pub fn with_secure(mut self, secure: bool) -> Self {
        self.secure = secure;
        self
    }

    /// Sets the absolute expiry.
    #[inline]
    #[must_use]
    pub fn with_expiry(mut self, expiry: SystemTime) -> Self {
        self.expiry = Some(expiry);
        self
    }
}

// ============================================================================
// Wire parsing
// ============================================================================

/// Parses one semicolon-delimited cookie attribute string.
///
/// Rules:
///
/// - attributes split on the first `=` only;
/// - the first `name=value` pair is the cookie's identity, recorded once;
/// - a bare `secure` token sets the secure flag;
/// - a `domain` starting with `.` has the leading segment stripped
///   (`.example.com` becomes `example.com`);
/// - `expires` of `"0"` or empty means no expiry, otherwise the number is
///   100-nanosecond ticks or Unix seconds depending on magnitude.
///
/// # Errors
///
/// Returns [`Error::CookieParse`] for a segment with no identity pair or
/// an unparseable `expires` number. Never a raw parse error.
pub(crate) fn parse_cookie(segment: &str) -> Result<Cookie> {
    let mut cookie: Option<Cookie> = None;

    for token in segment.split(';') {
        let token = token.trim();
        if token.is_empty() {
            continue;
        }

        let Some((key, value)) = token.split_once('=') else {
            if token == "secure" {
                if let Some(ref mut c) = cookie {
                    c.secure = true;
                }
            }
            continue;
        };

        match &mut cookie {
            // First pair is the identity, recorded exactly once.
            None => cookie = Some(Cookie::new(key, value)),
            Some(c) => match key {
                "path" => c.path = Some(value.to_string()),
                "domain" => c.domain = Some(strip_leading_dot(value).to_string()),
                "expires" => c.expiry = parse_expiry(value)?,
                "secure" => c.secure = value.eq_ignore_ascii_case("true"),
                // Unknown attributes are ignored.
                _ => {}
            },
        }
    }

    cookie.ok_or_else(|| {
        Error::cookie_parse(format!("no name=value pair in cookie segment: {segment:?}"))
    })
}

/// Strips a wire domain's leading dot: `.example.com` → `example.com`.
///
/// Everything up to and including the first dot goes; for the wire
/// encodings seen in practice that first dot is the leading one.
fn strip_leading_dot(domain: &str) -> &str {
    match domain.strip_prefix('.') {
        Some(rest) => rest,
        None => domain,
    }
}

/// Serializes an expiry as whole Unix seconds.
fn serialize_expiry<S>(expiry: &Option<SystemTime>, serializer: S) -> StdResult<S::Ok, S::Error>
where
    S: Serializer,
{
    let secs = expiry
        .and_then(|t| t.duration_since(UNIX_EPOCH).ok())
        .map_or(0, |d| d.as_secs());
    serializer.serialize_u64(secs)
}

/// Parses an `expires` attribute into an absolute timestamp.
///
/// `"0"` and empty mean no expiry.
fn parse_expiry(raw: &str) -> Result<Option<SystemTime>> {
    if raw.is_empty() || raw == "0" {
        return Ok(None);
    }

    let number: u64 = raw
        .parse()
        .map_err(|_| Error::cookie_parse(format!("bad expires value: {raw:?}")))?;

    let unix_secs = if number >= TICKS_THRESHOLD {
        (number / TICKS_PER_SEC).saturating_sub(TICKS_EPOCH_OFFSET_SECS)
    } else {
        number
    };

    Ok(Some(UNIX_EPOCH + Duration::from_secs(unix_secs)))
}

/// Parses a whole batch: one attribute string per line.
///
/// Blank lines are skipped; any bad line fails the whole batch.
pub(crate) fn parse_cookie_batch(raw: &str) -> Result<Vec<Cookie>> {
    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(parse_cookie)
        .collect()
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_basic_cookie_parses() {
        let cookie =
            parse_cookie("foo=bar; path=/; domain=.example.com; secure").expect("parse");

        assert_eq!(cookie.name, "foo");
        assert_eq!(cookie.value, "bar");
        assert_eq!(cookie.path.as_deref(), Some("/"));
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert!(cookie.secure);
        assert!(cookie.expiry.is_none());
    }

    #[test]
    fn test_value_splits_on_first_equals_only() {
        let cookie = parse_cookie("a=b=c; path=/").expect("parse");
        assert_eq!(cookie.name, "a");
        assert_eq!(cookie.value, "b=c");
        assert_eq!(cookie.path.as_deref(), Some("/"));
    }

    #[test]
    fn test_expires_zero_means_no_expiry() {
        let cookie = parse_cookie("a=b; expires=0").expect("parse");
        assert!(cookie.expiry.is_none());

        let cookie = parse_cookie("a=b; expires=").expect("parse");
        assert!(cookie.expiry.is_none());
    }

    #[test]
    fn test_expires_unix_seconds() {
        let cookie = parse_cookie("a=b; expires=1700000000").expect("parse");
        assert_eq!(
            cookie.expiry,
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn test_expires_ticks() {
        // 2023-11-14T22:13:20Z as 100ns ticks since 0001-01-01.
        let ticks = (1_700_000_000 + TICKS_EPOCH_OFFSET_SECS) * TICKS_PER_SEC;
        let cookie = parse_cookie(&format!("a=b; expires={ticks}")).expect("parse");
        assert_eq!(
            cookie.expiry,
            Some(UNIX_EPOCH + Duration::from_secs(1_700_000_000))
        );
    }

    #[test]
    fn test_bad_expires_wraps_into_cookie_parse() {
        let err = parse_cookie("a=b; expires=soon").unwrap_err();
        assert!(matches!(err, Error::CookieParse { .. }));
    }

    #[test]
    fn test_domain_without_dot_kept_verbatim() {
        let cookie = parse_cookie("a=b; domain=example.com").expect("parse");
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
    }

    #[test]
    fn test_missing_identity_fails() {
        let err = parse_cookie("secure").unwrap_err();
        assert!(matches!(err, Error::CookieParse { .. }));
    }

    #[test]
    fn test_bare_secure_before_identity_is_ignored() {
        // The identity pair always comes first on the wire; a stray
        // leading token cannot set flags on a cookie that does not
        // exist yet.
        let cookie = parse_cookie("a=b; secure").expect("parse");
        assert!(cookie.secure);
    }

    #[test]
    fn test_batch_parses_one_cookie_per_line() {
        let raw = "a=1; path=/\nb=2; domain=.example.org\n\n";
        let cookies = parse_cookie_batch(raw).expect("parse");

        assert_eq!(cookies.len(), 2);
        assert_eq!(cookies[0].name, "a");
        assert_eq!(cookies[1].domain.as_deref(), Some("example.org"));
    }

    #[test]
    fn test_builder() {
        let expiry = UNIX_EPOCH + Duration::from_secs(1_700_000_000);
        let cookie = Cookie::new("session", "abc123")
            .with_domain("example.com")
            .with_path("/")
            .with_secure(true)
            .with_expiry(expiry);

        assert_eq!(cookie.name, "session");
        assert_eq!(cookie.value, "abc123");
        assert_eq!(cookie.domain.as_deref(), Some("example.com"));
        assert!(cookie.secure);
        assert_eq!(cookie.expiry, Some(expiry));
    }
}
