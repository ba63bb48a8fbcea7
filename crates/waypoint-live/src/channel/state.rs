//! Connection state machine.

/// Connection state of a session. Initial state is `Disconnected`.
///
/// `Error` is the error-display flavour of `Disconnected`: it is entered
/// only when a connect attempt fails and it leaves exactly like
/// `Disconnected` does.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

/// What happened to the connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Trigger {
    ConnectAttempt,
    HandshakeSucceeded,
    ConnectError,
    Disconnect,
    /// Explicit disposal of the session.
    Close,
}

impl ConnectionState {
    pub const ALL: [ConnectionState; 4] = [
        ConnectionState::Disconnected,
        ConnectionState::Connecting,
        ConnectionState::Connected,
        ConnectionState::Error,
    ];

    /// The state reached from `self` on `trigger`, or `None` when the
    /// machine has no such edge.
    pub fn next(self, trigger: Trigger) -> Option<ConnectionState> {
        use ConnectionState::*;
        match (self, trigger) {
            (Disconnected | Error, Trigger::ConnectAttempt) => Some(Connecting),
            (Connecting, Trigger::HandshakeSucceeded) => Some(Connected),
            (Connecting, Trigger::ConnectError) => Some(Error),
            (Connected, Trigger::Disconnect) => Some(Disconnected),
            (Connecting | Connected | Error, Trigger::Close) => Some(Disconnected),
            _ => None,
        }
    }

    pub fn is_connected(self) -> bool {
        self == ConnectionState::Connected
    }

    /// Whether a new connect attempt may start from this state.
    pub fn is_idle(self) -> bool {
        matches!(self, ConnectionState::Disconnected | ConnectionState::Error)
    }
}

impl std::fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::Disconnected => "disconnected",
            Self::Connecting => "connecting",
            Self::Connected => "connected",
            Self::Error => "error",
        };
        f.write_str(name)
    }
}
