//! Two-way connection badge for the presentation layer.

use tokio::sync::watch;

use crate::channel::{ChannelSession, ConnectionState, ConnectionStatus};

/// What the UI shows. `Connecting` and `Error` both read as disconnected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Badge {
    Connected,
    Disconnected,
}

impl From<ConnectionState> for Badge {
    fn from(state: ConnectionState) -> Self {
        if state.is_connected() {
            Badge::Connected
        } else {
            Badge::Disconnected
        }
    }
}

impl std::fmt::Display for Badge {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Badge::Connected => f.write_str("connected"),
            Badge::Disconnected => f.write_str("disconnected"),
        }
    }
}

/// Follows one session's connection state.
#[derive(Debug)]
pub struct PresenceIndicator {
    rx: watch::Receiver<ConnectionStatus>,
    shown: Badge,
}

impl PresenceIndicator {
    pub fn new(session: &ChannelSession) -> Self {
        let rx = session.watch_status();
        let shown = Badge::from(rx.borrow().state);
        Self { rx, shown }
    }

    pub fn badge(&self) -> Badge {
        Badge::from(self.rx.borrow().state)
    }

    /// Full status, including the last connect error for an error display.
    pub fn status(&self) -> ConnectionStatus {
        self.rx.borrow().clone()
    }

    /// Wait until the badge flips. State changes that keep the same badge
    /// (such as `Connecting` to `Error`) are skipped. Returns `None` once
    /// the session is gone.
    pub async fn changed(&mut self) -> Option<Badge> {
        loop {
            self.rx.changed().await.ok()?;
            let badge = Badge::from(self.rx.borrow_and_update().state);
            if badge != self.shown {
                self.shown = badge;
                return Some(badge);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::*;

    #[test]
    fn connecting_and_error_fold_into_disconnected() {
        assert_eq!(Badge::from(ConnectionState::Connected), Badge::Connected);
        for state in [
            ConnectionState::Disconnected,
            ConnectionState::Connecting,
            ConnectionState::Error,
        ] {
            assert_eq!(Badge::from(state), Badge::Disconnected);
        }
    }

    #[tokio::test]
    async fn follows_connect_and_server_drop() {
        let (endpoint, mut conns) = spawn_ws_server().await;
        let session = ChannelSession::open(ws_only(&endpoint), VALID_TOKEN);
        let mut presence = PresenceIndicator::new(&session);
        assert_eq!(presence.badge(), Badge::Disconnected);

        assert_eq!(within(presence.changed()).await, Some(Badge::Connected));
        let conn = within(conns.recv()).await.unwrap();
        drop(conn);
        assert_eq!(within(presence.changed()).await, Some(Badge::Disconnected));
        assert_eq!(presence.status().state, ConnectionState::Disconnected);
    }

    #[tokio::test]
    async fn error_keeps_badge_and_exposes_reason() {
        let session = ChannelSession::open(ws_only(&dead_endpoint().await), VALID_TOKEN);
        let presence = PresenceIndicator::new(&session);
        assert!(within(session.wait_ready()).await.is_err());
        assert_eq!(presence.badge(), Badge::Disconnected);
        assert_eq!(presence.status().state, ConnectionState::Error);
        assert!(presence.status().last_error.is_some());
    }
}
