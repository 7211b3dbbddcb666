//! Transport layer and channel selection.
//!
//! The bridge talks to the remote end through exactly one call shape:
//! send a [`Command`](crate::protocol::Command), get back the raw inbound
//! payload. Everything else here is plumbing for the two channel
//! implementations and the strategy that picks between them.
//!
//! ```text
//! ┌─────────────────┐                              ┌─────────────────┐
//! │  Bridge (Rust)  │        extension channel     │  Extension      │
//! │                 │◄────────────────────────────►│  (Remote end)   │
//! │  Box<dyn        │      ws://host:port          │                 │
//! │   Transport>    │◄────────────────────────────►│  Socket server  │
//! │                 │        plain socket          │                 │
//! └─────────────────┘                              └─────────────────┘
//! ```
//!
//! # Modules
//!
//! | Module | Description |
//! |--------|-------------|
//! | `extension` | WebSocket extension channel with id correlation |
//! | `socket` | Newline-delimited JSON over raw TCP |
//!
//! Timeouts are enforced here, in the transport, not redundantly by the
//! bridge.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use tracing::debug;

use crate::error::{Error, Result};
use crate::protocol::Command;

// ============================================================================
// Submodules
// ============================================================================

/// WebSocket extension channel.
pub mod extension;

/// Plain socket channel.
pub mod socket;

// ============================================================================
// Re-exports
// ============================================================================

pub use extension::ExtensionConnection;
pub use socket::SocketConnection;

// ============================================================================
// Constants
// ============================================================================

/// Default remote host.
const DEFAULT_HOST: &str = "127.0.0.1";

/// Default extension port.
const DEFAULT_PORT: u16 = 7055;

/// Default timeout for establishing a connection.
const DEFAULT_CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Default timeout for one command round trip.
const DEFAULT_COMMAND_TIMEOUT: Duration = Duration::from_secs(30);

// ============================================================================
// Transport
// ============================================================================

/// Contract between the bridge and a channel implementation.
///
/// One call shape: send a command, receive the raw inbound payload.
/// Transport-level failures (connection refused, timeout) propagate
/// as-is; this layer never retries.
#[async_trait::async_trait]
pub trait Transport: Send + Sync + std::fmt::Debug {
    /// Transmits one command and returns the raw response payload.
    async fn send(&self, command: &Command) -> Result<Value>;

    /// Tears the channel down. Idempotent.
    async fn quit(&self) -> Result<()>;
}

// ============================================================================
// ConnectOptions
// ============================================================================

/// Connection configuration for [`connect`].
///
/// # Example
///
/// ```no_run
/// use webdriver_bridge::transport::ConnectOptions;
///
/// # async fn example() -> webdriver_bridge::Result<()> {
/// let transport = ConnectOptions::new()
///     .host("127.0.0.1")
///     .port(7055)
///     .connect()
///     .await?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct ConnectOptions {
    /// Remote host.
    host: String,
    /// Remote port.
    port: u16,
    /// Timeout for establishing the connection.
    connect_timeout: Duration,
    /// Timeout for one command round trip.
    command_timeout: Duration,
}

impl Default for ConnectOptions {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            connect_timeout: DEFAULT_CONNECT_TIMEOUT,
            command_timeout: DEFAULT_COMMAND_TIMEOUT,
        }
    }
}

impl ConnectOptions {
    /// Creates options with defaults (`127.0.0.1:7055`, 30s timeouts).
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the remote host.
    #[inline]
    #[must_use]
    pub fn host(mut self, host: impl Into<String>) -> Self {
        self.host = host.into();
        self
    }

    /// Sets the remote port.
    #[inline]
    #[must_use]
    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    /// Sets the connection-establishment timeout.
    #[inline]
    #[must_use]
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the per-command round-trip timeout.
    #[inline]
    #[must_use]
    pub fn command_timeout(mut self, timeout: Duration) -> Self {
        self.command_timeout = timeout;
        self
    }

    /// Validates the options and connects, selecting a channel.
    ///
    /// # Errors
    ///
    /// - [`Error::Config`] if the host is empty
    /// - [`Error::Connection`] / [`Error::ConnectionTimeout`] if neither
    ///   channel accepts
    pub async fn connect(self) -> Result<Box<dyn Transport>> {
        if self.host.is_empty() {
            return Err(Error::config(
                "remote host is required. Use .host() to set it.",
            ));
        }
        connect(&self).await
    }
}

// ============================================================================
// Channel selection
// ============================================================================

/// Selects and connects a channel for the given options.
///
/// The WebSocket extension channel is preferred; when its handshake is
/// rejected the plain socket channel is tried on the same endpoint.
/// Both failures surface the socket channel's error, since that is the
/// lower-level diagnosis.
pub async fn connect(options: &ConnectOptions) -> Result<Box<dyn Transport>> {
    match ExtensionConnection::connect(
        &options.host,
        options.port,
        options.connect_timeout,
        options.command_timeout,
    )
    .await
    {
        Ok(transport) => {
            debug!(host = %options.host, port = options.port, "Using extension channel");
            Ok(Box::new(transport))
        }
        Err(e) => {
            debug!(error = %e, "Extension channel unavailable, trying plain socket");
            let transport = SocketConnection::connect(
                &options.host,
                options.port,
                options.connect_timeout,
                options.command_timeout,
            )
            .await?;
            Ok(Box::new(transport))
        }
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_options() {
        let options = ConnectOptions::new();
        assert_eq!(options.host, "127.0.0.1");
        assert_eq!(options.port, 7055);
        assert_eq!(options.connect_timeout.as_secs(), 30);
        assert_eq!(options.command_timeout.as_secs(), 30);
    }

    #[test]
    fn test_builder_setters() {
        let options = ConnectOptions::new()
            .host("10.0.0.2")
            .port(4444)
            .connect_timeout(Duration::from_secs(5))
            .command_timeout(Duration::from_secs(10));

        assert_eq!(options.host, "10.0.0.2");
        assert_eq!(options.port, 4444);
        assert_eq!(options.connect_timeout.as_secs(), 5);
        assert_eq!(options.command_timeout.as_secs(), 10);
    }

    #[tokio::test]
    async fn test_connect_rejects_empty_host() {
        let result = ConnectOptions::new().host("").connect().await;
        let err = result.unwrap_err();
        assert!(matches!(err, Error::Config { .. }));
    }

    #[test]
    fn test_options_are_clone() {
        let options = ConnectOptions::new().port(9000);
        let cloned = options.clone();
        assert_eq!(cloned.port, 9000);
    }
}
