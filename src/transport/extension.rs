//! WebSocket extension channel.
//!
//! Connects to the browser extension's message endpoint and correlates
//! outbound commands with inbound responses by a generated per-command
//! id. The surrounding environment on the remote side is a
//! single-threaded message loop, so each id resolves exactly once.
//!
//! # Event Loop
//!
//! The connection spawns a tokio task that handles:
//!
//! - Outgoing commands from the bridge
//! - Incoming response frames, matched by correlation id
//! - Page-unload notices, which fail every still-pending command with a
//!   synthetic error response instead of leaving it hanging

// ============================================================================
// Imports
// ============================================================================

use std::sync::Arc;
use std::time::Duration;

use futures_util::stream::SplitSink;
use futures_util::{SinkExt, StreamExt};
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::time::timeout;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, trace, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::protocol::Command;
use crate::protocol::response::PAGE_UNLOAD_MESSAGE;

use super::Transport;

// ============================================================================
// Constants
// ============================================================================

/// Maximum pending commands before rejecting new ones.
const MAX_PENDING_COMMANDS: usize = 100;

// ============================================================================
// Types
// ============================================================================

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// One pending command awaiting its correlated response.
#[derive(Debug)]
struct Pending {
    /// Name of the in-flight command, used in synthetic responses.
    command_name: String,
    /// Resolver, consumed exactly once.
    reply_tx: oneshot::Sender<Result<Value>>,
}

/// Map of correlation ids to pending commands.
type PendingMap = FxHashMap<Uuid, Pending>;

/// Internal commands for the event loop.
enum LoopCommand {
    /// Send a framed command and register its resolver.
    Send {
        id: Uuid,
        frame: String,
        pending: Pending,
    },
    /// Remove a timed-out pending entry.
    RemovePending(Uuid),
    /// Shutdown the connection.
    Shutdown,
}

// ============================================================================
// ExtensionConnection
// ============================================================================

/// WebSocket connection to the browser extension.
///
/// Satisfies the [`Transport`] contract: accepts a [`Command`], returns
/// the raw inbound payload, and can be torn down with `quit`.
#[derive(Debug)]
pub struct ExtensionConnection {
    /// Channel into the event loop.
    command_tx: mpsc::UnboundedSender<LoopCommand>,
    /// Pending map, shared with the event loop.
    pending: Arc<Mutex<PendingMap>>,
    /// Per-command response timeout.
    command_timeout: Duration,
}

impl ExtensionConnection {
    /// Connects to the extension endpoint at `ws://host:port/`.
    ///
    /// # Errors
    ///
    /// - [`Error::ConnectionTimeout`] if the endpoint does not accept
    ///   within `connect_timeout`
    /// - [`Error::Connection`] on handshake failure
    pub async fn connect(
        host: &str,
        port: u16,
        connect_timeout: Duration,
        command_timeout: Duration,
    ) -> Result<Self> {
        let url = format!("ws://{host}:{port}/");
        debug!(url = %url, "Connecting extension channel");

        let (ws_stream, _) = timeout(connect_timeout, connect_async(&url))
            .await
            .map_err(|_| Error::connection_timeout(connect_timeout.as_millis() as u64))?
            .map_err(|e| Error::connection(e.to_string()))?;

        let (command_tx, command_rx) = mpsc::unbounded_channel();
        let pending = Arc::new(Mutex::new(PendingMap::default()));

        tokio::spawn(Self::run_event_loop(
            ws_stream,
            command_rx,
            Arc::clone(&pending),
        ));

        Ok(Self {
            command_tx,
            pending,
            command_timeout,
        })
    }

    /// Returns the number of pending commands.
    #[inline]
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.lock().len()
    }

    /// Event loop that handles WebSocket I/O.
    async fn run_event_loop(
        ws_stream: WsStream,
        mut command_rx: mpsc::UnboundedReceiver<LoopCommand>,
        pending: Arc<Mutex<PendingMap>>,
    ) {
        let (mut ws_write, mut ws_read) = ws_stream.split();

        loop {
            tokio::select! {
                message = ws_read.next() => {
                    match message {
                        Some(Ok(Message::Text(text))) => {
                            Self::handle_incoming_frame(&text, &pending);
                        }

                        Some(Ok(Message::Close(_))) => {
                            debug!("Extension channel closed by remote");
                            break;
                        }

                        Some(Err(e)) => {
                            warn!(error = %e, "Extension channel error");
                            break;
                        }

                        None => {
                            debug!("Extension channel stream ended");
                            break;
                        }

                        // Ignore Binary, Ping, Pong
                        _ => {}
                    }
                }

                command = command_rx.recv() => {
                    match command {
                        Some(LoopCommand::Send { id, frame, pending: entry }) => {
                            Self::handle_send(id, frame, entry, &mut ws_write, &pending).await;
                        }

                        Some(LoopCommand::RemovePending(id)) => {
                            pending.lock().remove(&id);
                            debug!(?id, "Removed timed-out command");
                        }

                        Some(LoopCommand::Shutdown) => {
                            debug!("Extension channel shutdown requested");
                            let _ = ws_write.close().await;
                            break;
                        }

                        None => {
                            debug!("Command channel closed");
                            break;
                        }
                    }
                }
            }
        }

        Self::fail_pending(&pending);
        debug!("Extension channel event loop terminated");
    }

    /// Handles one incoming text frame: a correlated response or a
    /// page-unload notice.
    fn handle_incoming_frame(text: &str, pending: &Arc<Mutex<PendingMap>>) {
        let frame: Value = match serde_json::from_str(text) {
            Ok(v) => v,
            Err(e) => {
                warn!(error = %e, "Unparseable frame from extension");
                return;
            }
        };

        if frame.get("unload").is_some() {
            Self::resolve_unloaded(pending);
            return;
        }

        let Some(id) = frame.get("id").and_then(Value::as_str) else {
            warn!("Frame without correlation id");
            return;
        };
        let Ok(id) = Uuid::parse_str(id) else {
            warn!(id, "Frame with malformed correlation id");
            return;
        };

        // Remove before resolving so the id resolves exactly once.
        let entry = pending.lock().remove(&id);
        match entry {
            Some(entry) => {
                let payload = frame.get("response").cloned().unwrap_or(Value::Null);
                let _ = entry.reply_tx.send(Ok(payload));
                trace!(%id, "Response resolved");
            }
            None => warn!(%id, "Response for unknown command"),
        }
    }

    /// Sends a framed command after registering its resolver.
    async fn handle_send(
        id: Uuid,
        frame: String,
        entry: Pending,
        ws_write: &mut SplitSink<WsStream, Message>,
        pending: &Arc<Mutex<PendingMap>>,
    ) {
        pending.lock().insert(id, entry);

        if let Err(e) = ws_write.send(Message::Text(frame.into())).await {
            if let Some(entry) = pending.lock().remove(&id) {
                let _ = entry.reply_tx.send(Err(Error::connection(e.to_string())));
            }
            return;
        }

        trace!(%id, "Command sent");
    }

    /// Resolves every pending command with the synthetic unload response.
    ///
    /// Entries are drained before resolution so nothing double-resolves.
    fn resolve_unloaded(pending: &Arc<Mutex<PendingMap>>) {
        let orphaned: Vec<_> = {
            let mut map = pending.lock();
            map.drain().collect()
        };
        let count = orphaned.len();

        for (_, entry) in orphaned {
            let synthetic = json!({
                "context": "",
                "commandName": entry.command_name,
                "response": PAGE_UNLOAD_MESSAGE,
                "isError": true,
            });
            let _ = entry.reply_tx.send(Ok(synthetic));
        }

        if count > 0 {
            debug!(count, "Resolved pending commands after page unload");
        }
    }

    /// Fails all pending commands with a connection-closed error.
    fn fail_pending(pending: &Arc<Mutex<PendingMap>>) {
        let orphaned: Vec<_> = pending.lock().drain().collect();
        let count = orphaned.len();

        for (_, entry) in orphaned {
            let _ = entry.reply_tx.send(Err(Error::ConnectionClosed));
        }

        if count > 0 {
            debug!(count, "Failed pending commands on shutdown");
        }
    }
}

// ============================================================================
// ExtensionConnection - Transport
// ============================================================================

#[async_trait::async_trait]
impl Transport for ExtensionConnection {
    async fn send(&self, command: &Command) -> Result<Value> {
        let id = Uuid::new_v4();

        {
            let pending = self.pending.lock();
            if pending.len() >= MAX_PENDING_COMMANDS {
                warn!(
                    pending = pending.len(),
                    max = MAX_PENDING_COMMANDS,
                    "Too many pending commands"
                );
                return Err(Error::connection(format!(
                    "too many pending commands: {}/{}",
                    pending.len(),
                    MAX_PENDING_COMMANDS
                )));
            }
        }

        let frame = serde_json::to_string(&json!({
            "id": id,
            "command": command,
        }))?;

        let (reply_tx, reply_rx) = oneshot::channel();
        self.command_tx
            .send(LoopCommand::Send {
                id,
                frame,
                pending: Pending {
                    command_name: command.name().to_string(),
                    reply_tx,
                },
            })
            .map_err(|_| Error::ConnectionClosed)?;

        match timeout(self.command_timeout, reply_rx).await {
            Ok(Ok(result)) => result,
            Ok(Err(e)) => Err(Error::ChannelClosed(e)),
            Err(_) => {
                // Timeout: clean up the pending entry.
                let _ = self.command_tx.send(LoopCommand::RemovePending(id));
                Err(Error::request_timeout(
                    id,
                    self.command_timeout.as_millis() as u64,
                ))
            }
        }
    }

    async fn quit(&self) -> Result<()> {
        let _ = self.command_tx.send(LoopCommand::Shutdown);
        Ok(())
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn pending_map_with(id: Uuid, name: &str) -> (Arc<Mutex<PendingMap>>, oneshot::Receiver<Result<Value>>) {
        let (reply_tx, reply_rx) = oneshot::channel();
        let map = Arc::new(Mutex::new(PendingMap::default()));
        map.lock().insert(
            id,
            Pending {
                command_name: name.to_string(),
                reply_tx,
            },
        );
        (map, reply_rx)
    }

    #[test]
    fn test_response_frame_resolves_pending() {
        let id = Uuid::new_v4();
        let (map, mut reply_rx) = pending_map_with(id, "getTitle");

        let frame = json!({
            "id": id,
            "response": {"context": "abc 1", "commandName": "getTitle",
                         "response": "Example", "isError": false},
        })
        .to_string();
        ExtensionConnection::handle_incoming_frame(&frame, &map);

        let payload = reply_rx.try_recv().expect("resolved").expect("ok");
        assert_eq!(payload["response"], "Example");
        assert!(map.lock().is_empty());
    }

    #[test]
    fn test_unknown_id_is_ignored() {
        let id = Uuid::new_v4();
        let (map, mut reply_rx) = pending_map_with(id, "getTitle");

        let frame = json!({"id": Uuid::new_v4(), "response": null}).to_string();
        ExtensionConnection::handle_incoming_frame(&frame, &map);

        assert!(reply_rx.try_recv().is_err());
        assert_eq!(map.lock().len(), 1);
    }

    #[test]
    fn test_unload_resolves_all_pending_exactly_once() {
        let id = Uuid::new_v4();
        let (map, mut reply_rx) = pending_map_with(id, "executeScript");

        let frame = json!({"unload": true}).to_string();
        ExtensionConnection::handle_incoming_frame(&frame, &map);

        let payload = reply_rx.try_recv().expect("resolved").expect("ok");
        assert_eq!(payload["isError"], true);
        assert_eq!(payload["response"], PAGE_UNLOAD_MESSAGE);
        assert_eq!(payload["commandName"], "executeScript");
        assert!(map.lock().is_empty());

        // A second unload notice has nothing left to resolve.
        ExtensionConnection::handle_incoming_frame(&frame, &map);
        assert!(map.lock().is_empty());
    }

    #[test]
    fn test_unparseable_frame_is_ignored() {
        let id = Uuid::new_v4();
        let (map, _reply_rx) = pending_map_with(id, "getTitle");

        ExtensionConnection::handle_incoming_frame("not json", &map);
        assert_eq!(map.lock().len(), 1);
    }

    #[test]
    fn test_fail_pending_sends_connection_closed() {
        let id = Uuid::new_v4();
        let (map, mut reply_rx) = pending_map_with(id, "getTitle");

        ExtensionConnection::fail_pending(&map);

        let result = reply_rx.try_recv().expect("resolved");
        assert!(matches!(result, Err(Error::ConnectionClosed)));
    }
}
