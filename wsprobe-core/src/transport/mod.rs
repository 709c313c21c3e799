//! Transport abstraction used by the session.
//!
//! A [`Connector`] turns an address into a [`Transport`] handle. Opening is
//! synchronous and only fails for problems detectable up front (a malformed
//! address, no runtime to run on); everything that happens afterwards,
//! including the handshake, is reported back as [`TransportEvent`]s tagged
//! with the [`ConnectionId`] the session assigned.
//!
//! Implementations:
//! - [`recording::RecordingConnector`]: records every operation, for tests.
//! - `wsprobe::net::WsConnector`: tokio-tungstenite client.

pub mod recording;

use std::fmt;

/// Identifies one connection attempt within a session.
///
/// Events from an earlier attempt carry an older id and are ignored.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Wrap a raw id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The raw id.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }

    /// The id after this one.
    #[must_use]
    pub const fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Something that happened on an open transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportEvent {
    /// The handshake completed.
    Opened,
    /// A text frame arrived.
    Message(String),
    /// The transport failed.
    Error(String),
    /// The transport is closed and will produce no further events.
    Closed {
        /// Close reason given by the peer, if any.
        reason: Option<String>,
    },
}

/// Errors from transport operations.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum TransportError {
    /// The address cannot be used to open a connection.
    #[error("{0}")]
    InvalidAddress(String),

    /// The transport could not be started.
    #[error("transport unavailable: {0}")]
    Unavailable(String),

    /// The connection is gone.
    #[error("connection closed")]
    ConnectionClosed,

    /// The outgoing queue is full.
    #[error("outgoing queue is full")]
    Busy,
}

/// Handle to one open transport.
pub trait Transport {
    /// Queue a text frame.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the frame cannot be queued.
    fn send(&mut self, text: &str) -> Result<(), TransportError>;

    /// Start closing the transport. Further sends fail.
    fn close(&mut self);
}

/// Opens transports.
pub trait Connector {
    /// Handle type for opened transports.
    type Handle: Transport;

    /// Begin connecting to `address`.
    ///
    /// # Errors
    ///
    /// Returns [`TransportError`] if the attempt cannot even be started.
    fn open(&mut self, address: &str, id: ConnectionId) -> Result<Self::Handle, TransportError>;
}
