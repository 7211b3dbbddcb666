//! The command/response bridge.
//!
//! [`Bridge`] is the stateful orchestrator: it owns the session
//! [`Context`] and the transport, serializes [`Command`]s, decodes
//! [`Response`]s, adopts the returned context, and unwraps or raises
//! based on the error flag. Navigation, element, cookie, window/frame,
//! and script operations are all typed delegations to the generic
//! [`Bridge::execute`].
//!
//! # Context state machine
//!
//! The bridge starts with the sentinel empty context. The first
//! successful round trip (session establishment) installs the real
//! session context; after that, every response's returned context
//! replaces the held one unconditionally. Window and frame switching
//! are ordinary commands whose *response* context is the new current
//! context; there is no separate "current frame" variable.
//!
//! # Example
//!
//! ```no_run
//! use webdriver_bridge::{Bridge, By, ConnectOptions, Result};
//!
//! # async fn example() -> Result<()> {
//! let mut bridge = Bridge::connect(ConnectOptions::new().port(7055)).await?;
//! bridge.new_session().await?;
//!
//! bridge.goto("https://example.com").await?;
//! let element = bridge.find_element(By::CssSelector, "h1").await?;
//! let heading = bridge.text(&element).await?;
//! println!("{heading}");
//! # Ok(())
//! # }
//! ```

// ============================================================================
// Imports
// ============================================================================

use std::fmt;

use serde_json::{Value, json};
use tracing::{debug, trace};
use url::Url;

use crate::context::Context;
use crate::error::{Error, ErrorKind, Result};
use crate::protocol::{Command, ElementRef, Response, ScriptValue, WireValue, wrap_argument};
use crate::transport::{ConnectOptions, Transport};

use super::cookies::{Cookie, parse_cookie_batch};

// ============================================================================
// Constants
// ============================================================================

/// Platform line separator applied to string results.
const LINE_SEPARATOR: &str = if cfg!(windows) { "\r\n" } else { "\n" };

/// Response value signalling a failed window switch.
const NO_WINDOW_FOUND: &str = "No window found";

// ============================================================================
// By
// ============================================================================

/// Element locator strategy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum By {
    /// `id` attribute.
    Id,
    /// `name` attribute.
    Name,
    /// Link text.
    LinkText,
    /// Class name.
    ClassName,
    /// CSS selector.
    CssSelector,
    /// XPath expression.
    XPath,
}

impl By {
    /// Returns the wire strategy name.
    #[must_use]
    pub fn strategy(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::LinkText => "link text",
            Self::ClassName => "class name",
            Self::CssSelector => "css selector",
            Self::XPath => "xpath",
        }
    }
}

// ============================================================================
// Bridge
// ============================================================================

/// Stateful command/response bridge over a selected transport.
///
/// One bridge per logical session; there is no cross-session shared
/// state. Methods take `&mut self`, so commands are strictly
/// one-at-a-time and the context field has no concurrent writer.
pub struct Bridge {
    /// Authoritative current context, replaced after every round trip.
    context: Context,

    /// Selected channel to the remote end.
    transport: Box<dyn Transport>,
}

impl fmt::Debug for Bridge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Bridge")
            .field("context", &self.context)
            .finish_non_exhaustive()
    }
}

// ============================================================================
// Bridge - Construction
// ============================================================================

impl Bridge {
    /// Connects a transport per `options` and wraps it in a bridge.
    ///
    /// The bridge starts with the sentinel context; call
    /// [`new_session`](Self::new_session) to establish the session.
    ///
    /// # Errors
    ///
    /// Propagates transport connection failures.
    pub async fn connect(options: ConnectOptions) -> Result<Self> {
        let transport = options.connect().await?;
        Ok(Self::from_transport(transport))
    }

    /// Wraps an already-connected transport.
    ///
    /// This is the seam for custom executors and tests.
    #[must_use]
    pub fn from_transport(transport: Box<dyn Transport>) -> Self {
        Self {
            context: Context::empty(),
            transport,
        }
    }

    /// Returns the current context.
    #[inline]
    #[must_use]
    pub fn context(&self) -> &Context {
        &self.context
    }
}

// ============================================================================
// Bridge - Generic execution
// ============================================================================

impl Bridge {
    /// Executes one named command against the current context.
    ///
    /// Sequence: build command → transport send → decode response →
    /// adopt its context → classify errors via `kind` → return the
    /// decoded value, normalizing line endings in string results.
    ///
    /// # Errors
    ///
    /// - transport failures, propagated untouched
    /// - the classified protocol error when the response is an error
    pub async fn execute(
        &mut self,
        kind: ErrorKind,
        name: &str,
        parameters: Value,
    ) -> Result<WireValue> {
        let response = self.round_trip(name, None, parameters).await?;
        self.context = response.context().clone();
        response.raise_if_error(kind)?;
        Ok(normalize_value(response.wire_value()))
    }

    /// Executes one element-scoped command.
    pub async fn execute_on(
        &mut self,
        kind: ErrorKind,
        element: &ElementRef,
        name: &str,
        parameters: Value,
    ) -> Result<WireValue> {
        let response = self
            .round_trip(name, Some(element.id()), parameters)
            .await?;
        self.context = response.context().clone();
        response.raise_if_error(kind)?;
        Ok(normalize_value(response.wire_value()))
    }

    /// One raw round trip without context adoption or classification.
    async fn round_trip(
        &self,
        name: &str,
        element_id: Option<&str>,
        parameters: Value,
    ) -> Result<Response> {
        if name.is_empty() {
            return Err(Error::config("command name must not be empty"));
        }

        let command = match element_id {
            Some(id) => Command::with_element(self.context.clone(), id, name, parameters),
            None => Command::new(self.context.clone(), name, parameters),
        };

        debug!(command = name, context = %self.context, "Executing command");
        let payload = self.transport.send(&command).await?;
        let response = Response::decode(&payload)?;
        trace!(command = name, new_context = %response.context(), "Round trip complete");

        Ok(response)
    }

    /// Executes and unwraps a string-valued command.
    async fn execute_string(&mut self, kind: ErrorKind, name: &str) -> Result<String> {
        let value = self.execute(kind, name, Value::Null).await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::web_driver(format!("{name} returned a non-string value")))
    }
}

// ============================================================================
// Bridge - Session
// ============================================================================

impl Bridge {
    /// Establishes the session.
    ///
    /// The handshake response carries the real session context, which
    /// replaces the sentinel through the ordinary adoption path.
    pub async fn new_session(&mut self) -> Result<()> {
        self.execute(ErrorKind::Generic, "newSession", Value::Null)
            .await?;
        debug!(context = %self.context, "Session established");
        Ok(())
    }

    /// Ends the session and tears down the transport.
    ///
    /// Errors from the quit command itself are ignored; the remote end
    /// may already be gone.
    pub async fn quit(&mut self) -> Result<()> {
        if let Err(e) = self.execute(ErrorKind::Generic, "quit", Value::Null).await {
            debug!(error = %e, "Quit command failed, tearing down anyway");
        }
        self.transport.quit().await
    }
}

// ============================================================================
// Bridge - Navigation
// ============================================================================

impl Bridge {
    /// Navigates to a URL.
    ///
    /// Navigation errors reported by the remote end are swallowed: an
    /// invalid page must not abort the calling script. Transport
    /// failures still propagate.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidUrl`] if `url` does not parse.
    pub async fn goto(&mut self, url: &str) -> Result<()> {
        let url = Url::parse(url)?;

        match self
            .execute(ErrorKind::Generic, "get", json!({ "url": url.as_str() }))
            .await
        {
            Ok(_) => Ok(()),
            Err(e) if e.is_protocol_error() => {
                debug!(error = %e, "Navigation error swallowed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }

    /// Returns the current URL.
    pub async fn current_url(&mut self) -> Result<String> {
        self.execute_string(ErrorKind::Generic, "getCurrentUrl")
            .await
    }

    /// Returns the page title.
    pub async fn title(&mut self) -> Result<String> {
        self.execute_string(ErrorKind::Generic, "getTitle").await
    }

    /// Returns the page source.
    pub async fn page_source(&mut self) -> Result<String> {
        self.execute_string(ErrorKind::Generic, "getPageSource")
            .await
    }

    /// Navigates back in history.
    pub async fn back(&mut self) -> Result<()> {
        self.execute(ErrorKind::Generic, "goBack", Value::Null)
            .await?;
        Ok(())
    }

    /// Navigates forward in history.
    pub async fn forward(&mut self) -> Result<()> {
        self.execute(ErrorKind::Generic, "goForward", Value::Null)
            .await?;
        Ok(())
    }

    /// Reloads the current page.
    pub async fn refresh(&mut self) -> Result<()> {
        self.execute(ErrorKind::Generic, "refresh", Value::Null)
            .await?;
        Ok(())
    }
}

// ============================================================================
// Bridge - Elements
// ============================================================================

impl Bridge {
    /// Finds the first element matching a locator.
    ///
    /// # Errors
    ///
    /// Returns [`Error::NoSuchElement`] when nothing matches.
    pub async fn find_element(&mut self, by: By, value: &str) -> Result<ElementRef> {
        let result = self
            .execute(
                ErrorKind::NoSuchElement,
                "findElement",
                json!({ "using": by.strategy(), "value": value }),
            )
            .await?;
        element_from_value(&result)
    }

    /// Finds all elements matching a locator.
    ///
    /// An empty result is an empty vector, not an error.
    pub async fn find_elements(&mut self, by: By, value: &str) -> Result<Vec<ElementRef>> {
        let result = self
            .execute(
                ErrorKind::NoSuchElement,
                "findElements",
                json!({ "using": by.strategy(), "value": value }),
            )
            .await?;

        match result {
            WireValue::Array(items) => items.iter().map(element_from_value).collect(),
            WireValue::Null => Ok(Vec::new()),
            other => Err(Error::web_driver(format!(
                "findElements returned an unexpected shape: {other:?}"
            ))),
        }
    }

    /// Clicks an element.
    pub async fn click(&mut self, element: &ElementRef) -> Result<()> {
        self.execute_on(ErrorKind::Generic, element, "click", Value::Null)
            .await?;
        Ok(())
    }

    /// Types text into an element.
    pub async fn send_keys(&mut self, element: &ElementRef, text: &str) -> Result<()> {
        self.execute_on(
            ErrorKind::Generic,
            element,
            "sendKeys",
            json!({ "value": text }),
        )
        .await?;
        Ok(())
    }

    /// Clears an editable element.
    pub async fn clear(&mut self, element: &ElementRef) -> Result<()> {
        self.execute_on(ErrorKind::Generic, element, "clear", Value::Null)
            .await?;
        Ok(())
    }

    /// Returns an element's visible text, line endings normalized.
    pub async fn text(&mut self, element: &ElementRef) -> Result<String> {
        let value = self
            .execute_on(ErrorKind::Generic, element, "getText", Value::Null)
            .await?;
        value
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| Error::web_driver("getText returned a non-string value"))
    }

    /// Returns an attribute value, `None` when the attribute is absent.
    pub async fn attribute(
        &mut self,
        element: &ElementRef,
        name: &str,
    ) -> Result<Option<String>> {
        let value = self
            .execute_on(
                ErrorKind::Generic,
                element,
                "getAttribute",
                json!({ "name": name }),
            )
            .await?;
        Ok(value.as_str().map(str::to_string))
    }
}

// ============================================================================
// Bridge - Windows and frames
// ============================================================================

impl Bridge {
    /// Switches to a named window.
    ///
    /// A response whose value signals "no window found" raises
    /// [`Error::NoSuchWindow`] and does *not* update the held context.
    pub async fn switch_to_window(&mut self, name: &str) -> Result<()> {
        let response = self
            .round_trip("switchToWindow", None, json!({ "name": name }))
            .await?;

        let no_window = !response.is_error()
            && (response.value().is_null() || response.value().as_str() == Some(NO_WINDOW_FOUND));
        if no_window {
            return Err(Error::no_such_window(name));
        }

        self.context = response.context().clone();
        response.raise_if_error(ErrorKind::NoSuchWindow)
    }

    /// Switches to a frame by zero-based index.
    pub async fn switch_to_frame_index(&mut self, index: u64) -> Result<()> {
        self.execute(
            ErrorKind::NoSuchFrame,
            "switchToFrame",
            json!({ "index": index }),
        )
        .await?;
        Ok(())
    }

    /// Switches to a frame by name.
    pub async fn switch_to_frame_name(&mut self, name: &str) -> Result<()> {
        self.execute(
            ErrorKind::NoSuchFrame,
            "switchToFrame",
            json!({ "name": name }),
        )
        .await?;
        Ok(())
    }

    /// Switches back to the top-level document.
    pub async fn switch_to_default_content(&mut self) -> Result<()> {
        self.execute(ErrorKind::Generic, "switchToDefaultContent", Value::Null)
            .await?;
        Ok(())
    }

    /// Closes the current window.
    ///
    /// A generic driver error or a dropped channel means the window was
    /// already gone, which is fine.
    pub async fn close_window(&mut self) -> Result<()> {
        match self.execute(ErrorKind::Generic, "close", Value::Null).await {
            Ok(_) => Ok(()),
            Err(Error::WebDriver { .. }) | Err(Error::ConnectionClosed) => {
                debug!("Window already closed");
                Ok(())
            }
            Err(e) => Err(e),
        }
    }
}

// ============================================================================
// Bridge - Cookies
// ============================================================================

impl Bridge {
    /// Adds a cookie to the current page.
    pub async fn add_cookie(&mut self, cookie: Cookie) -> Result<()> {
        self.execute(
            ErrorKind::Generic,
            "addCookie",
            json!({ "cookie": cookie }),
        )
        .await?;
        Ok(())
    }

    /// Returns all cookies visible to the current page.
    ///
    /// The wire format is one semicolon-delimited attribute string per
    /// cookie; parse failures surface as driver errors, never as raw
    /// parse exceptions.
    pub async fn cookies(&mut self) -> Result<Vec<Cookie>> {
        let value = self
            .execute(ErrorKind::Generic, "getCookie", Value::Null)
            .await?;

        match value {
            WireValue::Str(batch) => parse_cookie_batch(&batch),
            WireValue::Null => Ok(Vec::new()),
            other => Err(Error::cookie_parse(format!(
                "unexpected cookie payload shape: {other:?}"
            ))),
        }
    }

    /// Deletes a cookie by name.
    pub async fn delete_cookie(&mut self, name: &str) -> Result<()> {
        self.execute(
            ErrorKind::Generic,
            "deleteCookie",
            json!({ "name": name }),
        )
        .await?;
        Ok(())
    }
}

// ============================================================================
// Bridge - Script execution
// ============================================================================

impl Bridge {
    /// Executes JavaScript in the current context.
    ///
    /// Embedded quotes in the source are escaped because the transport
    /// frames the script as a quoted string; each argument is wrapped
    /// in its `{type, value}` envelope, and the result is decoded per
    /// the script-result envelope.
    pub async fn execute_script(
        &mut self,
        script: &str,
        args: &[WireValue],
    ) -> Result<ScriptValue> {
        let escaped = script.replace('"', "\\\"");

        let mut wrapped = Vec::with_capacity(args.len());
        for arg in args {
            wrapped.push(wrap_argument(arg)?);
        }

        let response = self
            .round_trip(
                "executeScript",
                None,
                json!({ "script": escaped, "args": wrapped }),
            )
            .await?;
        self.context = response.context().clone();
        response.raise_if_error(ErrorKind::Generic)?;

        Ok(ScriptValue::decode(response.value()))
    }
}

// ============================================================================
// Helpers
// ============================================================================

/// Collapses `\r\n` to `\n`, then expands `\n` to the platform line
/// separator, so string results read the same regardless of the remote
/// OS.
fn normalize_line_endings(text: &str) -> String {
    let unified = text.replace("\r\n", "\n");
    if LINE_SEPARATOR == "\n" {
        unified
    } else {
        unified.replace('\n', LINE_SEPARATOR)
    }
}

/// Applies line-ending normalization to a string result.
fn normalize_value(value: WireValue) -> WireValue {
    match value {
        WireValue::Str(s) => WireValue::Str(normalize_line_endings(&s)),
        other => other,
    }
}

/// Reads an element handle out of a decoded response value.
///
/// Some transports answer finds with the reserved-key map, others with
/// a bare id string.
fn element_from_value(value: &WireValue) -> Result<ElementRef> {
    match value {
        WireValue::Element(handle) => Ok(handle.clone()),
        WireValue::Str(raw_id) => Ok(ElementRef::from_wire_id(raw_id)),
        other => Err(Error::web_driver(format!(
            "expected an element reference, got {other:?}"
        ))),
    }
}

// ============================================================================
// Tests
// ============================================================================
