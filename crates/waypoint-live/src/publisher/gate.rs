//! Joint time + distance threshold for outgoing samples.

use std::time::Duration;

use waypoint_config::PublisherSettings;

use crate::protocol::Position;

/// Mean Earth radius in meters.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// Great-circle distance between two positions, in meters.
pub fn distance_m(a: &Position, b: &Position) -> f64 {
    let (lat1, lat2) = (a.lat.to_radians(), b.lat.to_radians());
    let dlat = lat2 - lat1;
    let dlng = (b.lng - a.lng).to_radians();
    let h = (dlat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (dlng / 2.0).sin().powi(2);
    2.0 * EARTH_RADIUS_M * h.sqrt().min(1.0).asin()
}

/// Decides which positions are worth publishing.
///
/// A position qualifies only when BOTH the minimum interval has elapsed
/// and the minimum distance has been covered since the last committed
/// position. The first position always qualifies. Elapsed time is taken
/// from the positions' own timestamps, so a stream replayed faster than
/// real time is gated the same way.
#[derive(Debug, Clone)]
pub struct SampleGate {
    min_interval: Duration,
    min_distance_m: f64,
    last: Option<Position>,
}

impl SampleGate {
    pub fn new(settings: &PublisherSettings) -> Self {
        Self {
            min_interval: settings.min_interval(),
            min_distance_m: settings.min_distance_m,
            last: None,
        }
    }

    /// Whether `position` would be published. Does not change the gate.
    pub fn offer(&self, position: &Position) -> bool {
        let Some(last) = &self.last else {
            return true;
        };
        let elapsed_ms = position.timestamp.saturating_sub(last.timestamp);
        let min_ms = i64::try_from(self.min_interval.as_millis()).unwrap_or(i64::MAX);
        elapsed_ms >= min_ms && distance_m(last, position) >= self.min_distance_m
    }

    /// Record `position` as the last one published.
    pub fn commit(&mut self, position: &Position) {
        self.last = Some(*position);
    }

    pub fn reset(&mut self) {
        self.last = None;
    }

    pub fn last(&self) -> Option<&Position> {
        self.last.as_ref()
    }
}
