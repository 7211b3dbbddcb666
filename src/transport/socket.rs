//! Plain socket channel.
//!
//! The legacy extension transport: newline-delimited JSON over a raw
//! TCP connection. One command is written, one response line is read;
//! there is no pipelining, so no correlation ids are needed.

// ============================================================================
// Imports
// ============================================================================

use std::time::Duration;

use serde_json::Value;
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufStream};
use tokio::net::TcpStream;
use tokio::sync::Mutex;
use tokio::time::timeout;
use tracing::{debug, trace};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::Command;

use super::Transport;

// ============================================================================
// SocketConnection
// ============================================================================

/// Newline-delimited JSON channel over TCP.
///
/// The stream lives behind an async mutex: one command in flight at a
/// time, matching the protocol's strictly synchronous model.
#[derive(Debug)]
pub struct SocketConnection {
    /// Buffered stream; `None` after `quit`.
    stream: Mutex<Option<BufStream<TcpStream>>>,
    /// Per-command response timeout.
    command_timeout: Duration,
}

impl SocketConnection {
    /// Connects to the extension socket at `host:port`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the endpoint does not accept
    ///   within `connect_timeout`
    /// - [`Error::Connection`] if the connection is refused
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self> {
        debug!(host, port, "Connecting plain socket channel");

        let stream = timeout(connect_timeout, TcpStream::connect((host, port)))
            .await
            .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))?
            .map_err(|e| Error::connection(e.to_string()))?;

        stream.set_nodelay(true)?;

        Ok(Self {
            stream: Mutex::new(Some(BufStream::new(stream))),
            command_timeout,
        })
    }
}

// ============================================================================
// SocketConnection - Transport
// ============================================================================

#[async_trait::async_trait]
impl Transport for SocketConnection {
    async fn send(&self, command: &Command) -> Result<Value> {
        let mut guard = self.stream.lock().await;
        let stream = guard.as_mut().ok_or(Error::ConnectionClosed)?;

        let mut frame = serde_json::to_string(command)?;
        frame.push('\n');
        stream.write_all(frame.as_bytes()).await?;
        stream.flush().await?;
        trace!(command = command.name(), "Command written");

        let mut line = String::new();
        let read = timeout(self.command_timeout, stream.read_line(&mut line))
            .await
            .map_err(|_| {
                Error::request_timeout(Uuid::nil(), self.command_timeout.as_millis() as u64)
            })??;

        if read == 0 {
            return Err(Error::ConnectionClosed);
        }

        Ok(serde_json::from_str(&line)?)
    }

    async fn quit(&self) -> Result<()> {
        let mut guard = self.stream.lock().await;
        if let Some(mut stream) = guard.take() {
            let _ = stream.shutdown().await;
            debug!("Plain socket channel closed");
        }
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt as _};
    use tokio::net::TcpListener;

    use crate::context::Context;

    /// One-shot echo peer: reads a command line, answers a canned response.
    async fn spawn_peer(response: Value) -> u16 {
        let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
        let port = listener.local_addr().expect("addr").port();

        tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.expect("accept");
            let mut buf = [0u8; 4096];
            let n = socket.read(&mut buf).await.expect("read");
            assert!(n > 0);

            let mut reply = response.to_string();
            reply.push('\n');
            socket.write_all(reply.as_bytes()).await.expect("write");
        });

        port
    }

    #[tokio::test]
    async fn test_send_round_trip() {
        let port = spawn_peer(json!({
            "context": "abc 1",
            "commandName": "getTitle",
            "response": "Example",
            "isError": false,
        }))
        .await;

        let transport = SocketConnection::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await
        .expect("connect");

        let command = Command::new(Context::empty(), "getTitle", Value::Null);
        let payload = transport.send(&command).await.expect("send");
        assert_eq!(payload["response"], "Example");
    }

    #[tokio::test]
    async fn test_send_after_quit_fails() {
        let port = spawn_peer(json!({})).await;

        let transport = SocketConnection::connect(
            "127.0.0.1",
            port,
            Duration::from_secs(5),
            Duration::from_secs(5),
        )
        .await
        .expect("connect");

        transport.quit().await.expect("quit");

        let command = Command::new(Context::empty(), "getTitle", Value::Null);
        let err = transport.send(&command).await.unwrap_err();
        assert!(matches!(err, Error::ConnectionClosed));
    }

    #[tokio::test]
    async fn test_connect_refused() {
        // Port 1 is essentially never listening.
        let result = SocketConnection::connect(
            "127.0.0.1",
            1,
            Duration::from_secs(2),
            Duration::from_secs(2),
        )
        .await;
        assert!(result.is_err());
    }
}
