use waypoint_common::ChannelError;

use super::store::{SweepOutcome, Upsert};
use crate::channel::TransportKind;

/// What changed in a subscriber after handling one channel event.
#[derive(Debug, Clone, PartialEq)]
pub enum SubscriberEvent {
    Connected { transport: TransportKind },
    ConnectError { error: ChannelError },
    /// The connection dropped; every tracked entry is now stale.
    Disconnected { reason: String, stale: usize },
    /// The store was replaced by an `active_travelers` snapshot.
    Snapshot { travelers: usize },
    Updated { traveler_id: String, outcome: Upsert },
    Swept(SweepOutcome),
}
