//! Connection state machine
//!
//! ```text
//! Disconnected  --ConnectRequested------------------->  Connecting
//! Connecting    --ConnAckReceived-------------------->  Connected
//! Connecting    --AttemptFailed { retries left > 0 }->  Connecting
//! Connecting    --AttemptFailed { 0 left }----------->  Disconnected
//! Connected     --TransportLost---------------------->  Reconnecting
//! Reconnecting  --AttemptFailed { .. }--------------->  Reconnecting
//! Reconnecting  --ConnAckReceived-------------------->  Connected
//! any           --CloseRequested--------------------->  Closed (terminal)
//! ```
//!
//! Transitions are a pure function of the current state and an event, so
//! the client's event task and the tests drive the exact same logic.

use std::fmt;

/// Connection lifecycle state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ConnectionState {
    /// Not connected and not trying
    #[default]
    Disconnected,
    /// Initial connect in progress
    Connecting,
    /// Broker acknowledged the connection
    Connected,
    /// Transport dropped; reconnecting with backoff
    Reconnecting,
    /// Closed by the owner; terminal
    Closed,
}

/// Inputs to the state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionEvent {
    /// The owner asked to connect
    ConnectRequested,
    /// The broker accepted a connection
    ConnAckReceived,
    /// A connect attempt failed
    AttemptFailed {
        /// Attempts left before the initial connect gives up
        retries_remaining: u32,
    },
    /// An established transport failed
    TransportLost,
    /// The owner closed the client
    CloseRequested,
}

impl ConnectionState {
    /// State after `event`. Events that do not apply leave the state unchanged.
    pub fn on(self, event: ConnectionEvent) -> ConnectionState {
        use ConnectionEvent as E;
        use ConnectionState as S;

        match (self, event) {
            (S::Closed, _) => S::Closed,
            (_, E::CloseRequested) => S::Closed,
            (S::Disconnected, E::ConnectRequested) => S::Connecting,
            (S::Connecting | S::Reconnecting, E::ConnAckReceived) => S::Connected,
            (S::Connecting, E::AttemptFailed { retries_remaining: 0 }) => S::Disconnected,
            (S::Connecting, E::AttemptFailed { .. }) => S::Connecting,
            (S::Reconnecting, E::AttemptFailed { .. }) => S::Reconnecting,
            (S::Connected, E::TransportLost) => S::Reconnecting,
            (state, _) => state,
        }
    }

    /// Whether publishes are accepted
    pub fn is_connected(self) -> bool {
        self == Self::Connected
    }

    /// Lowercase name
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
