//! Connection lifecycle states and the allowed transitions between them.

use std::fmt;

/// Lifecycle of the push connection.
///
/// Mutated only by the connection supervisor; everyone else reads the
/// value it publishes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Reconnecting,
    /// Terminal, reached only through an explicit stop.
    Closed,
}

impl ConnectionState {
    /// Whether `self -> next` is a legal edge of the state machine.
    pub const fn can_transition_to(self, next: Self) -> bool {
        use ConnectionState::{Closed, Connected, Connecting, Disconnected, Reconnecting};
        matches!(
            (self, next),
            (Disconnected, Connecting)
                | (Connecting, Connected)
                | (Connecting, Reconnecting)
                | (Connected, Reconnecting)
                | (Reconnecting, Connecting)
                | (Disconnected | Connecting | Connected | Reconnecting, Closed)
        )
    }

    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Closed)
    }

    /// Numeric encoding exported as the `connection_state` gauge.
    pub const fn as_gauge(self) -> i64 {
        match self {
            Self::Disconnected => 0,
            Self::Connecting => 1,
            Self::Connected => 2,
            Self::Reconnecting => 3,
            Self::Closed => 4,
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Reconnecting => "reconnecting",
            Self::Closed => "closed",
        };
        f.write_str(s)
    }
}
