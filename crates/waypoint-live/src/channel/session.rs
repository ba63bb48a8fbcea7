//! Session handle and the channel manager that opens sessions.

use std::sync::{Arc, Mutex};

use tokio::sync::{mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use waypoint_common::ChannelError;
use waypoint_config::ChannelSettings;

use super::connection::connection_loop;
use super::listeners::{Listener, ListenerRegistry};
use super::state::{ConnectionState, Trigger};
use super::types::{ChannelCommand, ConnectionStatus, TransportKind};
use crate::auth::AuthToken;
use crate::protocol::Frame;

const COMMAND_CAPACITY: usize = 256;

// ---------------------------------------------------------------------------
// Shared state
// ---------------------------------------------------------------------------

/// State shared between session handles and the connection task.
pub(crate) struct SessionShared {
    pub(crate) settings: ChannelSettings,
    pub(crate) token: AuthToken,
    pub(crate) listeners: Arc<ListenerRegistry>,
    pub(crate) cancel: CancellationToken,
    pub(crate) command_rx: tokio::sync::Mutex<mpsc::Receiver<ChannelCommand>>,
    /// Frames replayed after every handshake. Only the connection task
    /// touches this, and only one connection task runs at a time.
    pub(crate) persistent: tokio::sync::Mutex<Vec<Frame>>,
    status_tx: watch::Sender<ConnectionStatus>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl SessionShared {
    pub(crate) fn status(&self) -> ConnectionStatus {
        self.status_tx.borrow().clone()
    }

    /// Apply `trigger` to the state machine. `update` runs only when the
    /// transition exists. Returns whether it was applied.
    pub(crate) fn apply(
        &self,
        trigger: Trigger,
        update: impl FnOnce(&mut ConnectionStatus),
    ) -> bool {
        let mut applied = false;
        self.status_tx.send_if_modified(|status| match status.state.next(trigger) {
            Some(next) => {
                status.state = next;
                update(status);
                applied = true;
                true
            }
            None => false,
        });
        if !applied && trigger != Trigger::Close {
            warn!(state = %self.status().state, ?trigger, "Ignoring invalid state transition");
        }
        applied
    }

    /// Cancel the connection task, detach listeners, and go `Disconnected`.
    fn shutdown(&self) -> Option<usize> {
        if self.cancel.is_cancelled() {
            return None;
        }
        self.cancel.cancel();
        // The connection task drains the queue itself if it holds the lock.
        if let Ok(mut commands) = self.command_rx.try_lock() {
            discard_commands(&mut commands);
        }
        let removed = self.listeners.close();
        self.apply(Trigger::Close, |status| status.transport = None);
        Some(removed)
    }
}

/// Refuse further commands and drop the queued ones, which resolves any
/// pending `flush` with `Closed`. Returns how many were dropped.
pub(crate) fn discard_commands(commands: &mut mpsc::Receiver<ChannelCommand>) -> usize {
    commands.close();
    let mut dropped = 0;
    while commands.try_recv().is_ok() {
        dropped += 1;
    }
    dropped
}

// ---------------------------------------------------------------------------
// Session handle
// ---------------------------------------------------------------------------

/// Handle to one connection to the live endpoint.
///
/// Cloning is cheap; every clone drives the same connection. When the last
/// handle is dropped the session is closed.
#[derive(Clone)]
pub struct ChannelSession {
    inner: Arc<SessionInner>,
}

struct SessionInner {
    shared: Arc<SessionShared>,
    command_tx: mpsc::Sender<ChannelCommand>,
}

impl Drop for SessionInner {
    fn drop(&mut self) {
        self.shared.shutdown();
    }
}

impl std::fmt::Debug for ChannelSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChannelSession")
            .field("endpoint", &self.inner.shared.settings.endpoint)
            .field("status", &self.status())
            .finish()
    }
}

impl ChannelSession {
    /// Start connecting in the background and return immediately.
    ///
    /// Must be called from within a tokio runtime.
    pub fn open(settings: ChannelSettings, token: impl Into<AuthToken>) -> Self {
        let (command_tx, command_rx) = mpsc::channel(COMMAND_CAPACITY);
        let (status_tx, _) = watch::channel(ConnectionStatus::default());
        let shared = Arc::new(SessionShared {
            settings,
            token: token.into(),
            listeners: Arc::new(ListenerRegistry::default()),
            cancel: CancellationToken::new(),
            command_rx: tokio::sync::Mutex::new(command_rx),
            persistent: tokio::sync::Mutex::new(Vec::new()),
            status_tx,
            task: Mutex::new(None),
        });
        let session = Self {
            inner: Arc::new(SessionInner { shared, command_tx }),
        };
        // A fresh session is Disconnected, so the first attempt always starts.
        let _ = session.start_attempt();
        session
    }

    fn shared(&self) -> &Arc<SessionShared> {
        &self.inner.shared
    }

    fn start_attempt(&self) -> Result<(), ChannelError> {
        let shared = self.shared();
        if shared.cancel.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        let mut task = shared.task.lock().unwrap_or_else(|e| e.into_inner());
        if !shared.apply(Trigger::ConnectAttempt, |status| status.last_error = None) {
            return Err(ChannelError::AttemptInFlight);
        }
        // A previous task can only be sleeping in backoff or returning.
        if let Some(previous) = task.take() {
            previous.abort();
        }
        *task = Some(tokio::spawn(connection_loop(Arc::clone(shared))));
        Ok(())
    }

    pub fn state(&self) -> ConnectionState {
        self.shared().status().state
    }

    pub fn status(&self) -> ConnectionStatus {
        self.shared().status()
    }

    pub fn transport(&self) -> Option<TransportKind> {
        self.shared().status().transport
    }

    pub fn watch_status(&self) -> watch::Receiver<ConnectionStatus> {
        self.shared().status_tx.subscribe()
    }

    /// Wait for the outcome of the current connect attempt.
    pub async fn wait_ready(&self) -> Result<TransportKind, ChannelError> {
        let mut rx = self.watch_status();
        loop {
            {
                let status = rx.borrow_and_update();
                match status.state {
                    ConnectionState::Connected => {
                        if let Some(transport) = status.transport {
                            return Ok(transport);
                        }
                    }
                    ConnectionState::Error => {
                        return Err(status
                            .last_error
                            .clone()
                            .unwrap_or_else(|| ChannelError::ConnectFailed("unknown".into())));
                    }
                    ConnectionState::Disconnected => {
                        return Err(if self.is_closed() {
                            ChannelError::Closed
                        } else {
                            ChannelError::ConnectFailed("connection lost".into())
                        });
                    }
                    ConnectionState::Connecting => {}
                }
            }
            if rx.changed().await.is_err() {
                return Err(ChannelError::Closed);
            }
        }
    }

    /// Queue a frame for the server. Frames queued before the handshake
    /// completes are sent once it does.
    pub async fn emit(&self, event: &str, data: serde_json::Value) -> Result<(), ChannelError> {
        self.send(ChannelCommand::Emit(Frame::new(event, data))).await
    }

    /// Like [`emit`](Self::emit), and the frame is sent again after every
    /// later handshake on this session.
    pub async fn emit_persistent(
        &self,
        event: &str,
        data: serde_json::Value,
    ) -> Result<(), ChannelError> {
        self.send(ChannelCommand::EmitPersistent(Frame::new(event, data)))
            .await
    }

    /// Wait until every frame emitted so far has been written to the
    /// transport. Waits for the connection if it is not up yet.
    pub async fn flush(&self) -> Result<(), ChannelError> {
        let (done_tx, done_rx) = oneshot::channel();
        self.send(ChannelCommand::Flush(done_tx)).await?;
        tokio::select! {
            done = done_rx => done.map_err(|_| ChannelError::Closed),
            _ = self.shared().cancel.cancelled() => Err(ChannelError::Closed),
        }
    }

    async fn send(&self, command: ChannelCommand) -> Result<(), ChannelError> {
        let cancel = &self.shared().cancel;
        if cancel.is_cancelled() {
            return Err(ChannelError::Closed);
        }
        tokio::select! {
            sent = self.inner.command_tx.send(command) => sent.map_err(|_| ChannelError::Closed),
            _ = cancel.cancelled() => Err(ChannelError::Closed),
        }
    }

    /// Register a new observer of this session's events.
    pub fn listen(&self) -> Listener {
        self.shared().listeners.register()
    }

    pub fn listener_count(&self) -> usize {
        self.shared().listeners.len()
    }

    /// Start a new connect attempt after a failure or disconnect.
    ///
    /// Refused with `AttemptInFlight` while connecting or connected.
    pub fn reconnect(&self) -> Result<(), ChannelError> {
        self.start_attempt()?;
        info!(endpoint = %self.shared().settings.endpoint, "Manual reconnect requested");
        Ok(())
    }

    /// Dispose of the session: stop the connection task and anything tied
    /// to it, unregister every listener, and go `Disconnected`. Idempotent.
    pub fn close(&self) {
        if let Some(removed) = self.shared().shutdown() {
            info!(listeners = removed, "Channel session closed");
        }
    }

    pub fn is_closed(&self) -> bool {
        self.shared().cancel.is_cancelled()
    }

    /// Token cancelled when this session closes.
    pub fn child_token(&self) -> CancellationToken {
        self.shared().cancel.child_token()
    }
}

// ---------------------------------------------------------------------------
// Manager
// ---------------------------------------------------------------------------

/// Opens and closes channel sessions for one endpoint configuration.
#[derive(Debug, Clone)]
pub struct ChannelManager {
    settings: ChannelSettings,
}

impl ChannelManager {
    pub fn new(settings: ChannelSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> &ChannelSettings {
        &self.settings
    }

    /// Open a session authenticated with `token`. Connecting happens in
    /// the background; use [`ChannelSession::wait_ready`] for the outcome.
    pub fn open(&self, token: impl Into<AuthToken>) -> ChannelSession {
        ChannelSession::open(self.settings.clone(), token)
    }

    pub fn close(&self, session: &ChannelSession) {
        session.close();
    }
}
