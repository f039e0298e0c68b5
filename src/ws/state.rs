//! Connection lifecycle state.

use std::sync::atomic::{AtomicU8, Ordering};

/// Lifecycle of one WebSocket connection.
///
/// `Disconnected → Connecting → Open → Closing → Closed`. `Closed` is
/// terminal: there is no reconnection and no resubscription.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    /// Not yet connected.
    Disconnected,
    /// Handshake in progress.
    Connecting,
    /// Accepting requests and subscriptions.
    Open,
    /// Close requested; waiting for the transport to wind down.
    Closing,
    /// Terminal.
    Closed,
}

impl ConnectionState {
    fn as_u8(self) -> u8 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Open => 2,
            Self::Closing => 3,
            Self::Closed => 4,
        }
    }

    fn from_u8(value: u8) -> Self {
        match value {
            0 => Self::Disconnected,
            1 => Self::Connecting,
            2 => Self::Open,
            3 => Self::Closing,
            _ => Self::Closed,
        }
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Open => "open",
            Self::Closing => "closing",
            Self::Closed => "closed",
        };
        write!(f, "{s}")
    }
}

/// State shared between the connection handle and its read loop.
#[derive(Debug)]
pub(crate) struct StateCell(AtomicU8);

impl StateCell {
    pub(crate) fn new() -> Self {
        Self(AtomicU8::new(ConnectionState::Disconnected.as_u8()))
    }

    pub(crate) fn get(&self) -> ConnectionState {
        ConnectionState::from_u8(self.0.load(Ordering::Acquire))
    }

    /// Move to `next`, never leaving `Closed`.
    pub(crate) fn set(&self, next: ConnectionState) {
        let _ = self
            .0
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |current| {
                if current == ConnectionState::Closed.as_u8() {
                    None
                } else {
                    Some(next.as_u8())
                }
            });
    }
}
