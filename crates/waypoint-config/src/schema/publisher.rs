//! Location publisher configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Sampling thresholds. A position is published only when both the time
/// and the distance since the last published position are reached.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PublisherSettings {
    pub min_interval_ms: u64,
    /// Minimum displacement in meters.
    pub min_distance_m: f64,
}

impl Default for PublisherSettings {
    fn default() -> Self {
        Self {
            min_interval_ms: 5000,
            min_distance_m: 10.0,
        }
    }
}

impl PublisherSettings {
    pub fn min_interval(&self) -> Duration {
        Duration::from_millis(self.min_interval_ms)
    }
}
