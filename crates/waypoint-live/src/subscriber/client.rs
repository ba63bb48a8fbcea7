//! The location subscriber: interest declaration and event ingestion.

use std::time::Duration;

use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, info};
use waypoint_common::ChannelError;
use waypoint_config::SubscriberSettings;

use super::events::SubscriberEvent;
use super::store::{TravelerStore, Upsert};
use crate::channel::{ChannelEvent, ChannelSession, Listener};
use crate::protocol::{events, PresenceSnapshot, TravelerReport};
use crate::timer::tick;

const MIN_SWEEP_PERIOD: Duration = Duration::from_millis(100);

/// Aggregates traveler positions received on a [`ChannelSession`].
///
/// The subscriber is driven by the caller: each [`next_event`] call
/// handles channel events (and staleness sweeps) until one of them changes
/// something, so the store is only ever touched from the caller's task.
///
/// [`next_event`]: LocationSubscriber::next_event
pub struct LocationSubscriber {
    session: ChannelSession,
    listener: Listener,
    settings: SubscriberSettings,
    store: TravelerStore,
    sweep: Option<Interval>,
    subscribed: bool,
}

impl LocationSubscriber {
    /// Register on `session`. Events that arrive before the first
    /// [`next_event`](Self::next_event) call are queued, not lost.
    pub fn new(session: &ChannelSession, settings: SubscriberSettings) -> Self {
        let period = [settings.stale_after(), settings.evict_after()]
            .into_iter()
            .flatten()
            .min()
            .map(|window| (window / 2).max(MIN_SWEEP_PERIOD));
        let sweep = period.map(|period| {
            let mut interval = tokio::time::interval_at(Instant::now() + period, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
            interval
        });
        Self {
            session: session.clone(),
            listener: session.listen(),
            store: TravelerStore::new(settings.ordering),
            settings,
            sweep,
            subscribed: false,
        }
    }

    /// Declare interest. The server answers with one `active_travelers`
    /// snapshot, then `traveler_location` updates. The declaration is
    /// repeated after every reconnect; calling this again is a no-op.
    pub async fn subscribe(&mut self) -> Result<(), ChannelError> {
        if self.subscribed {
            return Ok(());
        }
        self.session
            .emit_persistent(events::SPECIALIST_SUBSCRIBE, serde_json::json!({}))
            .await?;
        self.subscribed = true;
        info!("Subscribed to traveler locations");
        Ok(())
    }

    /// Replace the whole store with `snapshot`. Returns the new size.
    pub fn apply_snapshot(&mut self, snapshot: PresenceSnapshot) -> usize {
        if snapshot.count != snapshot.samples.len() {
            debug!(
                announced = snapshot.count,
                received = snapshot.samples.len(),
                "Snapshot count differs from its traveler list"
            );
        }
        self.store.replace_all(snapshot.samples, Instant::now());
        self.store.len()
    }

    pub fn apply_update(&mut self, report: TravelerReport) -> Upsert {
        let outcome = self.store.upsert(report, Instant::now());
        if outcome == Upsert::Ignored {
            debug!("Dropping out-of-order traveler sample");
        }
        outcome
    }

    pub fn travelers(&self) -> &TravelerStore {
        &self.store
    }

    /// Wait for the next change. Returns `None` once the session is closed.
    pub async fn next_event(&mut self) -> Option<SubscriberEvent> {
        loop {
            tokio::select! {
                event = self.listener.recv() => {
                    let event = event?;
                    if let Some(change) = self.handle(event) {
                        return Some(change);
                    }
                }
                _ = tick(&mut self.sweep) => {
                    let outcome = self.store.sweep(
                        Instant::now(),
                        self.settings.stale_after(),
                        self.settings.evict_after(),
                    );
                    if !outcome.is_empty() {
                        debug!(
                            marked = outcome.marked,
                            evicted = outcome.evicted.len(),
                            "Swept idle travelers"
                        );
                        return Some(SubscriberEvent::Swept(outcome));
                    }
                }
            }
        }
    }

    fn handle(&mut self, event: ChannelEvent) -> Option<SubscriberEvent> {
        match event {
            ChannelEvent::Connected { transport } => Some(SubscriberEvent::Connected { transport }),
            ChannelEvent::ConnectError { error } => Some(SubscriberEvent::ConnectError { error }),
            ChannelEvent::Disconnected { reason } => {
                let stale = self.store.mark_all_stale();
                Some(SubscriberEvent::Disconnected { reason, stale })
            }
            ChannelEvent::Message(frame) if frame.is(events::ACTIVE_TRAVELERS) => {
                match PresenceSnapshot::from_frame(&frame) {
                    Ok(snapshot) => Some(SubscriberEvent::Snapshot {
                        travelers: self.apply_snapshot(snapshot),
                    }),
                    Err(e) => {
                        debug!(error = %e, "Dropping malformed snapshot");
                        None
                    }
                }
            }
            ChannelEvent::Message(frame) if frame.is(events::TRAVELER_LOCATION) => {
                match TravelerReport::from_frame(&frame) {
                    Ok(report) => {
                        let traveler_id = report.sample.traveler_id.clone();
                        let outcome = self.apply_update(report);
                        Some(SubscriberEvent::Updated {
                            traveler_id,
                            outcome,
                        })
                    }
                    Err(e) => {
                        debug!(error = %e, "Dropping malformed traveler location");
                        None
                    }
                }
            }
            ChannelEvent::Message(frame) => {
                debug!(event = %frame.event, "Ignoring frame");
                None
            }
        }
    }
}
