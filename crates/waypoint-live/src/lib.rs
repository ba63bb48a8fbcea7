//! Real-time traveler location channel.
//!
//! A [`ChannelSession`] owns one connection to the live endpoint. The two
//! roles sit on top of it: [`LocationPublisher`] samples device positions
//! and emits `location_update`, [`LocationSubscriber`] declares interest and
//! keeps the aggregated [`TravelerStore`]. [`PresenceIndicator`] folds the
//! connection state into a two-way badge for the UI.

pub mod auth;
pub mod channel;
pub mod presence;
pub mod protocol;
pub mod publisher;
pub mod subscriber;

mod timer;

#[cfg(test)]
mod test_support;

pub use auth::AuthToken;
pub use channel::{
    ChannelEvent, ChannelManager, ChannelSession, ConnectionState, ConnectionStatus, Listener,
    TransportKind, Trigger,
};
pub use presence::{Badge, PresenceIndicator};
pub use protocol::{Frame, LocationSample, Position, PresenceSnapshot, TravelerReport};
pub use publisher::{
    FixedPermission, LocationPermission, LocationPublisher, PermissionStatus, PositionSource,
    SampleGate,
};
pub use subscriber::{
    LocationSubscriber, SubscriberEvent, SweepOutcome, TrackedTraveler, TravelerStore, Upsert,
};
