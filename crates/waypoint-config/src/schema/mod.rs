//! Configuration schema types for Waypoint.
//!
//! All structs use `serde(default)` so partial configs work correctly.

mod channel;
mod publisher;
mod subscriber;

pub use channel::*;
pub use publisher::*;
pub use subscriber::*;

use serde::{Deserialize, Serialize};

/// Root configuration.
///
/// Only override what you want to change.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct WaypointConfig {
    pub channel: ChannelSettings,
    pub publisher: PublisherSettings,
    pub subscriber: SubscriberSettings,
}
