//! Recording transport for tests.
//!
//! [`RecordingConnector`] never touches the network. Every open, send and
//! close is appended to a shared log that clones of the connector can read,
//! so a test can hand the connector to a session and still inspect what the
//! session did with it.

use std::sync::Arc;

use parking_lot::Mutex;

use super::{ConnectionId, Connector, Transport, TransportError};

/// One recorded transport operation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransportOp {
    /// A connection was opened.
    Open {
        /// Address passed to the connector.
        address: String,
        /// Id assigned by the session.
        id: ConnectionId,
    },
    /// A frame was sent.
    Send {
        /// Connection the frame went through.
        id: ConnectionId,
        /// Frame text.
        text: String,
    },
    /// A connection was closed.
    Close {
        /// Connection that was closed.
        id: ConnectionId,
    },
}

/// Connector that records instead of connecting.
#[derive(Debug, Clone, Default)]
pub struct RecordingConnector {
    ops: Arc<Mutex<Vec<TransportOp>>>,
    fail_open: Arc<Mutex<Option<TransportError>>>,
}

impl RecordingConnector {
    /// Create a connector with an empty log.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next `open` fail with `error`.
    pub fn fail_next_open(&self, error: TransportError) {
        *self.fail_open.lock() = Some(error);
    }

    /// Everything recorded so far.
    #[must_use]
    pub fn ops(&self) -> Vec<TransportOp> {
        self.ops.lock().clone()
    }

    /// Text of every frame sent so far.
    #[must_use]
    pub fn sent(&self) -> Vec<String> {
        self.ops
            .lock()
            .iter()
            .filter_map(|op| match op {
                TransportOp::Send { text, .. } => Some(text.clone()),
                _ => None,
            })
            .collect()
    }
}

impl Connector for RecordingConnector {
    type Handle = RecordingTransport;

    fn open(&mut self, address: &str, id: ConnectionId) -> Result<RecordingTransport, TransportError> {
        if let Some(error) = self.fail_open.lock().take() {
            return Err(error);
        }
        self.ops.lock().push(TransportOp::Open {
            address: address.to_string(),
            id,
        });
        Ok(RecordingTransport {
            id,
            ops: Arc::clone(&self.ops),
            closed: false,
        })
    }
}

/// Handle produced by [`RecordingConnector`].
#[derive(Debug)]
pub struct RecordingTransport {
    id: ConnectionId,
    ops: Arc<Mutex<Vec<TransportOp>>>,
    closed: bool,
}

impl Transport for RecordingTransport {
    fn send(&mut self, text: &str) -> Result<(), TransportError> {
        if self.closed {
            return Err(TransportError::ConnectionClosed);
        }
        self.ops.lock().push(TransportOp::Send {
            id: self.id,
            text: text.to_string(),
        });
        Ok(())
    }

    fn close(&mut self) {
        if !self.closed {
            self.closed = true;
            self.ops.lock().push(TransportOp::Close { id: self.id });
        }
    }
}
