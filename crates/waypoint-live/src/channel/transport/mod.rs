//! Transports: WebSocket first, HTTP long-polling as the fallback.
//!
//! Each transport performs its own handshake and hands back a [`Link`]: a
//! frame sink for outbound traffic plus a receiver fed by a reader task.

mod polling;
mod websocket;

use async_trait::async_trait;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};
use waypoint_common::ChannelError;
use waypoint_config::ChannelSettings;

use super::types::TransportKind;
use crate::auth::AuthToken;
use crate::protocol::Frame;

const INBOUND_CAPACITY: usize = 256;

/// What a transport's reader task reports.
#[derive(Debug)]
pub(crate) enum Inbound {
    Frame(Frame),
    Closed(String),
}

/// Outbound half of an established link.
#[async_trait]
pub(crate) trait FrameSink: Send {
    async fn send(&mut self, frame: &Frame) -> Result<(), ChannelError>;

    async fn keepalive(&mut self) -> Result<(), ChannelError> {
        Ok(())
    }

    /// Best-effort goodbye to the server.
    async fn close(&mut self);
}

/// An established, handshaken connection.
pub(crate) struct Link {
    pub(crate) kind: TransportKind,
    pub(crate) sink: Box<dyn FrameSink>,
    pub(crate) inbound: mpsc::Receiver<Inbound>,
    reader: JoinHandle<()>,
}

impl Drop for Link {
    fn drop(&mut self) {
        self.reader.abort();
    }
}

/// Why a single transport could not be used.
#[derive(Debug)]
pub(crate) enum ConnectFailure {
    /// The transport could not be reached; the next one may be tried.
    Unavailable(String),
    /// The server refused the handshake; no other transport is tried.
    Rejected(String),
}

/// Try each configured transport in order.
pub(crate) async fn establish(
    settings: &ChannelSettings,
    token: &AuthToken,
) -> Result<Link, ChannelError> {
    let timeout = settings.connect_timeout();
    let mut failures = Vec::new();
    let mut all_timed_out = true;

    for name in &settings.transports {
        let kind = TransportKind::from(*name);
        info!(transport = %kind, "Connecting to live channel");
        let attempt = match kind {
            TransportKind::WebSocket => {
                tokio::time::timeout(timeout, websocket::connect(settings, token)).await
            }
            TransportKind::Polling => {
                tokio::time::timeout(timeout, polling::connect(settings, token)).await
            }
        };
        match attempt {
            Ok(Ok(link)) => return Ok(link),
            Ok(Err(ConnectFailure::Rejected(reason))) => {
                warn!(transport = %kind, reason = %reason, "Handshake rejected");
                return Err(ChannelError::HandshakeRejected(reason));
            }
            Ok(Err(ConnectFailure::Unavailable(reason))) => {
                warn!(transport = %kind, reason = %reason, "Transport unavailable");
                all_timed_out = false;
                failures.push(format!("{kind}: {reason}"));
            }
            Err(_elapsed) => {
                warn!(transport = %kind, "Connect timed out after {timeout:?}");
                failures.push(format!("{kind}: timed out"));
            }
        }
    }

    if all_timed_out && !failures.is_empty() {
        Err(ChannelError::Timeout(timeout))
    } else {
        Err(ChannelError::NoTransport(failures.join("; ")))
    }
}
