//! Location subscriber configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// How an incoming sample is reconciled with the stored one.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrderingMode {
    /// The most recently applied sample always wins.
    #[default]
    LastWriteWins,
    /// Samples older than the stored one are dropped.
    NewestTimestamp,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SubscriberSettings {
    pub ordering: OrderingMode,
    /// Flag entries without updates for this long as stale. 0 = never.
    pub stale_after_secs: u64,
    /// Drop entries without updates for this long. 0 = never.
    pub evict_after_secs: u64,
}

impl SubscriberSettings {
    pub fn stale_after(&self) -> Option<Duration> {
        (self.stale_after_secs > 0).then(|| Duration::from_secs(self.stale_after_secs))
    }

    pub fn evict_after(&self) -> Option<Duration> {
        (self.evict_after_secs > 0).then(|| Duration::from_secs(self.evict_after_secs))
    }
}
