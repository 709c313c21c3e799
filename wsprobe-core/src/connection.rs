//! Connection lifecycle as an explicit state machine.
//!
//! ```text
//!            open()          Opened
//!  Absent ───────────▶ Connecting ───────▶ Open
//!                          │  Error          │  Error
//!                          ▼                 ▼
//!                       Errored ◀───────── (any)
//!                          │  Closed         │  Closed
//!                          ▼                 ▼
//!                        Closed ◀──────── (any)
//! ```
//!
//! User-initiated disconnect drops the connection outright, returning the
//! session to `Absent`.

use std::fmt;

use crate::transport::TransportEvent;

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// No connection has been requested.
    #[default]
    Absent,
    /// The handshake is in progress.
    Connecting,
    /// Frames can be exchanged.
    Open,
    /// The transport closed.
    Closed,
    /// The transport reported an error and has not closed yet.
    Errored,
}

impl ConnectionState {
    /// Whether a connection is in progress or established.
    #[must_use]
    pub const fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Open)
    }

    /// State after `event`.
    #[must_use]
    pub const fn on_event(self, event: &TransportEvent) -> Self {
        match event {
            TransportEvent::Opened => match self {
                Self::Connecting | Self::Open => Self::Open,
                other => other,
            },
            TransportEvent::Message(_) => self,
            TransportEvent::Error(_) => match self {
                Self::Closed => Self::Closed,
                _ => Self::Errored,
            },
            TransportEvent::Closed { .. } => Self::Closed,
        }
    }

    /// Which commands make sense in this state.
    #[must_use]
    pub const fn affordances(self) -> Affordances {
        Affordances {
            connect: !self.is_live(),
            disconnect: self.is_live(),
            send: matches!(self, Self::Open),
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Absent => "Disconnected",
            Self::Connecting => "Connecting",
            Self::Open => "Connected",
            Self::Closed => "Closed",
            Self::Errored => "Error",
        };
        f.write_str(label)
    }
}

/// Enabled/disabled state of the connection commands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[allow(clippy::struct_excessive_bools)]
pub struct Affordances {
    /// Connect is available.
    pub connect: bool,
    /// Disconnect is available.
    pub disconnect: bool,
    /// Send is available.
    pub send: bool,
}
