//! WebSocket connector wiring the session to tokio-tungstenite.
//!
//! The session is synchronous and lives on the TUI thread. Each connection
//! runs in its own tokio task and talks to the TUI loop only through
//! channels:
//!
//! ```text
//! TUI (main thread)  ←── NetEvent ────  connection task
//!     WsHandle       ─── NetCommand →
//! ```
//!
//! The main thread drains [`NetEvent`]s on each tick of the poll-based event
//! loop and hands them to the session, which drops events from connections
//! it no longer holds.

use std::time::Duration;

use futures_util::{SinkExt, StreamExt};
use tokio::sync::mpsc;
use tokio_tungstenite::connect_async;
use tokio_tungstenite::tungstenite::Message;
use url::Url;

use wsprobe_core::transport::{ConnectionId, Connector, Transport, TransportError, TransportEvent};

/// Commands sent from a [`WsHandle`] to its connection task.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NetCommand {
    /// Send a text frame.
    Send(String),
    /// Close the connection.
    Close,
}

/// An event from a connection task, tagged with its connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NetEvent {
    /// Connection the event belongs to.
    pub connection: ConnectionId,
    /// What happened.
    pub event: TransportEvent,
}

/// Configuration for the networking layer.
#[derive(Debug, Clone)]
pub struct NetConfig {
    /// Give up on the handshake after this long. `None` waits indefinitely.
    pub connect_timeout: Option<Duration>,
    /// Capacity of the command and event channels.
    pub channel_capacity: usize,
}

/// Default channel capacity for commands and events.
const DEFAULT_CHANNEL_CAPACITY: usize = 256;

impl Default for NetConfig {
    fn default() -> Self {
        Self {
            connect_timeout: None,
            channel_capacity: DEFAULT_CHANNEL_CAPACITY,
        }
    }
}

/// Check that `address` is a `ws://` or `wss://` URL.
///
/// # Errors
///
/// Returns [`TransportError::InvalidAddress`] describing the problem.
pub fn parse_address(address: &str) -> Result<Url, TransportError> {
    let url = Url::parse(address)
        .map_err(|e| TransportError::InvalidAddress(format!("Invalid websocket address: {e}")))?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(TransportError::InvalidAddress(format!(
            "Invalid websocket address: unsupported scheme '{other}' (expected ws or wss)"
        ))),
    }
}

/// Opens WebSocket connections on the current tokio runtime.
#[derive(Debug, Clone)]
pub struct WsConnector {
    config: NetConfig,
    events: mpsc::Sender<NetEvent>,
}

impl WsConnector {
    /// Create a connector and the receiver its connections report to.
    #[must_use]
    pub fn new(config: NetConfig) -> (Self, mpsc::Receiver<NetEvent>) {
        let (events, rx) = mpsc::channel(config.channel_capacity.max(1));
        (Self { config, events }, rx)
    }
}

impl Connector for WsConnector {
    type Handle = WsHandle;

    fn open(&mut self, address: &str, id: ConnectionId) -> Result<WsHandle, TransportError> {
        let url = parse_address(address)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| TransportError::Unavailable(e.to_string()))?;

        let (commands, command_rx) = mpsc::channel(self.config.channel_capacity.max(1));
        runtime.spawn(run_connection(
            url,
            id,
            self.config.connect_timeout,
            command_rx,
            self.events.clone(),
        ));

        Ok(WsHandle { id, commands })
    }
}

/// Handle to one connection task.
#[derive(Debug)]
pub struct WsHandle {
    id: ConnectionId,
    commands: mpsc::Sender<NetCommand>,
}

impl WsHandle {
}

impl Transport for WsHandle {
    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        match self.commands.try_send(NetCommand::Send(text.to_string())) {
            Ok(()) => Ok(()),
            Err(mpsc::error::TrySendError::Full(_)) => Err(TransportError::Busy),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(TransportError::ConnectionClosed),
        }
    }

    fn close(&mut self) {
        if self.commands.try_send(NetCommand::Close).is_err() {
            tracing::debug!(id = %self.id, "connection task already gone");
        }
    }
}

/// Wait up to `limit` for connection `id` to report that it has closed.
///
/// Events for other connections are discarded. Returns whether the close
/// arrived in time.
pub async fn wait_for_close(
    events: &mut mpsc::Receiver<NetEvent>,
    id: ConnectionId,
    limit: Duration,
) -> bool {
    let closed = async {
        while let Some(NetEvent { connection, event }) = events.recv().await {
            if connection == id && matches!(event, TransportEvent::Closed { .. }) {
                return true;
            }
        }
        false
    };
    tokio::time::timeout(limit, closed).await.unwrap_or(false)
}

/// Background task owning one WebSocket.
///
/// Reports `Opened` once the handshake completes, every text frame as a
/// `Message`, and finishes with exactly one `Closed` (preceded by `Error`
/// when the socket failed). Binary frames are logged and skipped.
async fn run_connection(
    url: Url,
    id: ConnectionId,
    connect_timeout: Option<Duration>,
    mut commands: mpsc::Receiver<NetCommand>,
    events: mpsc::Sender<NetEvent>,
) {
    let emit = |event: TransportEvent| {
        let events = events.clone();
        async move {
            if events.send(NetEvent { connection: id, event }).await.is_err() {
                tracing::debug!(%id, "event receiver dropped");
            }
        }
    };

    let handshake = connect_async(url.as_str());
    let connected = match connect_timeout {
        Some(limit) => match tokio::time::timeout(limit, handshake).await {
            Ok(result) => result.map_err(|e| e.to_string()),
            Err(_) => Err(format!("Connection timed out after {}s", limit.as_secs())),
        },
        None => handshake.await.map_err(|e| e.to_string()),
    };

    let mut stream = match connected {
        Ok((stream, _response)) => stream,
        Err(e) => {
            tracing::warn!(%id, url = %url, error = %e, "websocket handshake failed");
            emit(TransportEvent::Error(format!("Could not connect to {url}: {e}"))).await;
            emit(TransportEvent::Closed { reason: None }).await;
            return;
        }
    };

    tracing::info!(%id, url = %url, "websocket open");
    emit(TransportEvent::Opened).await;

    let reason = loop {
        tokio::select! {
            command = commands.recv() => match command {
                Some(NetCommand::Send(text)) => {
                    if let Err(e) = stream.send(Message::text(text)).await {
                        tracing::warn!(%id, error = %e, "websocket send failed");
                        emit(TransportEvent::Error(e.to_string())).await;
                        break None;
                    }
                }
                Some(NetCommand::Close) | None => {
                    if let Err(e) = stream.close(None).await {
                        tracing::debug!(%id, error = %e, "close handshake failed");
                    }
                    break None;
                }
            },
            frame = stream.next() => match frame {
                Some(Ok(Message::Text(text))) => {
                    emit(TransportEvent::Message(text.as_str().to_string())).await;
                }
                Some(Ok(Message::Binary(data))) => {
                    tracing::debug!(%id, bytes = data.len(), "binary frame ignored");
                }
                Some(Ok(Message::Close(frame))) => {
                    tracing::info!(%id, ?frame, "websocket closed by server");
                    break frame
                        .map(|f| f.reason.as_str().to_string())
                        .filter(|r| !r.is_empty());
                }
                Some(Ok(Message::Ping(_) | Message::Pong(_) | Message::Frame(_))) => {}
                Some(Err(e)) => {
                    tracing::warn!(%id, error = %e, "websocket read error");
                    emit(TransportEvent::Error(e.to_string())).await;
                    break None;
                }
                None => break None,
            },
        }
    };

    emit(TransportEvent::Closed { reason }).await;
    tracing::info!(%id, "connection task exiting");
}
