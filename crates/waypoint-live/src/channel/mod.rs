//! Channel manager: one owned connection to the live endpoint.
//!
//! [`ChannelSession`] is a cheap handle to a background connection task.
//! The task performs the handshake (WebSocket first, long-polling as
//! fallback), forwards outbound frames, and fans inbound frames out to
//! every registered [`Listener`]. Connection health is published through a
//! `watch` channel and only moves along the [`ConnectionState`] machine.

mod connection;
mod listeners;
mod session;
mod state;
mod transport;
mod types;


pub use listeners::Listener;
pub use session::{ChannelManager, ChannelSession};
pub use state::{ConnectionState, Trigger};
pub use types::{ChannelEvent, ConnectionStatus, TransportKind};
