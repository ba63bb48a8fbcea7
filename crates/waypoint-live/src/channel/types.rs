//! Status, transport and event types for the channel.

use tokio::sync::oneshot;
use waypoint_common::ChannelError;
use waypoint_config::TransportName;

use super::state::ConnectionState;
use crate::protocol::Frame;

/// The transport a session ended up on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportKind {
    WebSocket,
    Polling,
}

impl std::fmt::Display for TransportKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::WebSocket => f.write_str("websocket"),
            Self::Polling => f.write_str("polling"),
        }
    }
}

impl From<TransportName> for TransportKind {
    fn from(name: TransportName) -> Self {
        match name {
            TransportName::Websocket => Self::WebSocket,
            TransportName::Polling => Self::Polling,
        }
    }
}

/// Snapshot of a session's health, published on every transition.
#[derive(Debug, Clone, PartialEq)]
pub struct ConnectionStatus {
    pub state: ConnectionState,
    pub transport: Option<TransportKind>,
    /// Why the last attempt failed. Set when entering `Error`.
    pub last_error: Option<ChannelError>,
}

impl Default for ConnectionStatus {
    fn default() -> Self {
        Self {
            state: ConnectionState::Disconnected,
            transport: None,
            last_error: None,
        }
    }
}

/// Events delivered to listeners, in arrival order.
#[derive(Debug, Clone, PartialEq)]
pub enum ChannelEvent {
    /// Handshake accepted.
    Connected { transport: TransportKind },
    /// A connect attempt failed.
    ConnectError { error: ChannelError },
    /// An established connection went away.
    Disconnected { reason: String },
    /// An application frame; the channel does not interpret it.
    Message(Frame),
}

/// Commands sent from session handles to the connection task.
#[derive(Debug)]
pub(crate) enum ChannelCommand {
    Emit(Frame),
    /// Sent now and replayed after every later handshake.
    EmitPersistent(Frame),
    /// Answered once every earlier command has been written.
    Flush(oneshot::Sender<()>),
}
