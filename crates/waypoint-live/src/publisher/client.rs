//! The location publisher and its sampling task.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use waypoint_common::{ChannelError, PublisherError};
use waypoint_config::PublisherSettings;

use super::gate::SampleGate;
use super::source::{LocationPermission, PermissionStatus, PositionSource};
use crate::channel::{ChannelEvent, ChannelSession, Listener};
use crate::protocol::{events, Position};

struct Running {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// Publishes a traveler's position on a [`ChannelSession`].
///
/// Sampling stops on [`stop`](Self::stop), when the position source ends,
/// when the session is closed, or when the publisher is dropped.
pub struct LocationPublisher {
    settings: PublisherSettings,
    emitted: Arc<AtomicU64>,
    running: Option<Running>,
}

impl LocationPublisher {
    pub fn new(settings: PublisherSettings) -> Self {
        Self {
            settings,
            emitted: Arc::new(AtomicU64::new(0)),
            running: None,
        }
    }

    /// Ask for the location permission, then start the sampling task.
    ///
    /// A denied permission fails with `PermissionDenied` and is not retried.
    pub async fn start(
        &mut self,
        session: &ChannelSession,
        permission: &dyn LocationPermission,
        source: impl PositionSource + 'static,
    ) -> Result<(), PublisherError> {
        if self.is_running() {
            return Err(PublisherError::AlreadyRunning);
        }
        if permission.request().await == PermissionStatus::Denied {
            warn!("Location permission denied; publisher not started");
            return Err(PublisherError::PermissionDenied);
        }
        if session.is_closed() {
            return Err(ChannelError::Closed.into());
        }

        let cancel = session.child_token();
        let task = tokio::spawn(sampling_loop(
            session.clone(),
            SampleGate::new(&self.settings),
            Box::new(source),
            session.listen(),
            cancel.clone(),
            Arc::clone(&self.emitted),
        ));
        self.running = Some(Running { cancel, task });
        info!(
            min_interval_ms = self.settings.min_interval_ms,
            min_distance_m = self.settings.min_distance_m,
            "Location publisher started"
        );
        Ok(())
    }

    /// Stop sampling. Safe to call any number of times.
    pub fn stop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
            info!("Location publisher stopped");
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
            .as_ref()
            .is_some_and(|running| !running.task.is_finished())
    }

    /// Wait until the sampling task ends, for example because the
    /// position source ran dry. Returns immediately when not started.
    pub async fn finished(&mut self) {
        if let Some(running) = self.running.as_mut() {
            let _ = (&mut running.task).await;
            self.running = None;
        }
    }

    /// Number of `location_update` frames handed to the channel so far.
    pub fn emitted(&self) -> u64 {
        self.emitted.load(Ordering::Relaxed)
    }
}

impl Drop for LocationPublisher {
    fn drop(&mut self) {
        if let Some(running) = self.running.take() {
            running.cancel.cancel();
        }
    }
}

async fn sampling_loop(
    session: ChannelSession,
    mut gate: SampleGate,
    mut source: Box<dyn PositionSource>,
    mut listener: Listener,
    cancel: CancellationToken,
    emitted: Arc<AtomicU64>,
) {
    loop {
        tokio::select! {
            biased;
            _ = cancel.cancelled() => break,
            event = listener.recv() => match event {
                Some(ChannelEvent::Message(frame)) if frame.is(events::LOCATION_ACK) => {
                    debug!(data = %frame.data, "Location acknowledged");
                }
                Some(_) => {}
                None => break,
            },
            position = source.next_position() => {
                let Some(position) = position else {
                    info!("Position source ended");
                    break;
                };
                match publish(&session, &mut gate, &position).await {
                    Ok(true) => {
                        emitted.fetch_add(1, Ordering::Relaxed);
                    }
                    Ok(false) => {}
                    Err(ChannelError::Closed) => break,
                    Err(e) => warn!(error = %e, "Failed to publish location"),
                }
            }
        }
    }
    debug!("Sampling task finished");
}

/// Emit `position` if it passes the gate and the session is connected.
/// Returns whether a frame was emitted.
pub(super) async fn publish(
    session: &ChannelSession,
    gate: &mut SampleGate,
    position: &Position,
) -> Result<bool, ChannelError> {
    if !position.is_valid() {
        debug!(?position, "Dropping invalid position");
        return Ok(false);
    }
    if !gate.offer(position) {
        return Ok(false);
    }
    if !session.state().is_connected() {
        debug!(state = %session.state(), "Dropping sample while not connected");
        return Ok(false);
    }
    session
        .emit(events::LOCATION_UPDATE, serde_json::to_value(position)?)
        .await?;
    gate.commit(position);
    Ok(true)
}
