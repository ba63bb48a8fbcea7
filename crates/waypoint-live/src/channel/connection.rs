//! Background connection task: handshake, forwarding, and optional backoff.

use std::sync::Arc;

use tokio::time::MissedTickBehavior;
use tracing::{debug, error, info, warn};

use super::session::{discard_commands, SessionShared};
use super::state::Trigger;
use super::transport::{self, Inbound, Link};
use super::types::{ChannelCommand, ChannelEvent};
use crate::protocol::events;
use crate::timer::tick;

/// How a live link ended.
enum LinkEnd {
    /// The session was closed or every handle dropped.
    Closed,
    /// The connection was lost.
    Lost(String),
}

/// Drive one session from `Connecting` until it is closed, or until it is
/// down and the reconnect policy does not allow another attempt.
///
/// Every terminal transition is applied after the matching event has been
/// dispatched, so once the state is idle this task does no more work than
/// sleeping or returning.
pub(crate) async fn connection_loop(shared: Arc<SessionShared>) {
    let mut retry: u32 = 0;

    loop {
        let outcome = tokio::select! {
            _ = shared.cancel.cancelled() => return,
            outcome = transport::establish(&shared.settings, &shared.token) => outcome,
        };

        match outcome {
            Ok(link) => {
                retry = 0;
                let kind = link.kind;
                if shared.cancel.is_cancelled() {
                    return;
                }
                if !shared.apply(Trigger::HandshakeSucceeded, |status| {
                    status.transport = Some(kind);
                    status.last_error = None;
                }) {
                    return;
                }
                info!(transport = %kind, endpoint = %shared.settings.endpoint, "Channel connected");
                shared
                    .listeners
                    .dispatch(ChannelEvent::Connected { transport: kind })
                    .await;

                match run_link(&shared, link).await {
                    LinkEnd::Closed => return,
                    LinkEnd::Lost(reason) => {
                        info!(reason = %reason, "Channel disconnected");
                        shared
                            .listeners
                            .dispatch(ChannelEvent::Disconnected {
                                reason: reason.clone(),
                            })
                            .await;
                        shared.apply(Trigger::Disconnect, |status| status.transport = None);
                    }
                }
            }
            Err(err) => {
                error!(error = %err, "Failed to connect to live channel");
                shared
                    .listeners
                    .dispatch(ChannelEvent::ConnectError { error: err.clone() })
                    .await;
                shared.apply(Trigger::ConnectError, |status| {
                    status.transport = None;
                    status.last_error = Some(err);
                });
            }
        }

        let reconnect = &shared.settings.reconnect;
        if !reconnect.allows(retry) {
            debug!("Automatic reconnect disabled or exhausted");
            return;
        }
        let delay = reconnect.delay_for(retry);
        retry += 1;
        info!(delay_secs = delay.as_secs(), attempt = retry, "Reconnecting");
        tokio::select! {
            _ = shared.cancel.cancelled() => return,
            _ = tokio::time::sleep(delay) => {}
        }
        // Loses to a manual reconnect that already started an attempt.
        if !shared.apply(Trigger::ConnectAttempt, |status| status.last_error = None) {
            return;
        }
    }
}

/// Pump frames between the session and an established link.
async fn run_link(shared: &SessionShared, mut link: Link) -> LinkEnd {
    {
        let persistent = shared.persistent.lock().await;
        for frame in persistent.iter() {
            debug!(event = %frame.event, "Replaying persistent frame");
            if let Err(e) = link.sink.send(frame).await {
                return LinkEnd::Lost(e.to_string());
            }
        }
    }

    let mut commands = shared.command_rx.lock().await;
    let mut keepalive = shared.settings.keepalive().map(|period| {
        let mut interval = tokio::time::interval_at(tokio::time::Instant::now() + period, period);
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        interval
    });

    loop {
        tokio::select! {
            _ = shared.cancel.cancelled() => {
                let dropped = discard_commands(&mut commands);
                if dropped > 0 {
                    debug!(dropped, "Dropped queued commands on close");
                }
                link.sink.close().await;
                return LinkEnd::Closed;
            }
            command = commands.recv() => {
                let Some(command) = command else {
                    link.sink.close().await;
                    return LinkEnd::Closed;
                };
                let frame = match command {
                    ChannelCommand::Emit(frame) => frame,
                    ChannelCommand::EmitPersistent(frame) => {
                        shared.persistent.lock().await.push(frame.clone());
                        frame
                    }
                    ChannelCommand::Flush(done) => {
                        let _ = done.send(());
                        continue;
                    }
                };
                if let Err(e) = link.sink.send(&frame).await {
                    warn!(error = %e, event = %frame.event, "Failed to send frame");
                    return LinkEnd::Lost(e.to_string());
                }
            }
            inbound = link.inbound.recv() => match inbound {
                Some(Inbound::Frame(frame)) if frame.is(events::DISCONNECT) => {
                    return LinkEnd::Lost("server disconnect".to_string());
                }
                Some(Inbound::Frame(frame)) => {
                    shared.listeners.dispatch(ChannelEvent::Message(frame)).await;
                }
                Some(Inbound::Closed(reason)) => return LinkEnd::Lost(reason),
                None => return LinkEnd::Lost("transport reader stopped".to_string()),
            },
            _ = tick(&mut keepalive) => {
                if let Err(e) = link.sink.keepalive().await {
                    warn!(error = %e, "Keepalive failed");
                    return LinkEnd::Lost(e.to_string());
                }
            }
        }
    }
}
