//! Subscriber-local projection of every known traveler.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use waypoint_config::OrderingMode;

use crate::protocol::{LocationSample, TravelerReport};

/// Latest known state of one traveler.
#[derive(Debug, Clone, PartialEq)]
pub struct TrackedTraveler {
    pub sample: LocationSample,
    pub display_name: Option<String>,
    /// Set on disconnect or by the staleness sweep; cleared by fresh data.
    pub stale: bool,
    /// When this entry last received data, on the subscriber's clock.
    pub updated_at: Instant,
}

/// What an upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Upsert {
    Inserted,
    Replaced,
    /// Dropped by the ordering policy.
    Ignored,
}

/// Result of a staleness sweep.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Entries newly flagged stale.
    pub marked: usize,
    pub evicted: Vec<String>,
}

impl SweepOutcome {
    pub fn is_empty(&self) -> bool {
        self.marked == 0 && self.evicted.is_empty()
    }
}

/// Map from traveler id to [`TrackedTraveler`], at most one entry per id.
///
/// Owned by a single subscriber and never shared, so it takes `&mut self`
/// and no locks.
#[derive(Debug, Clone, Default)]
pub struct TravelerStore {
    ordering: OrderingMode,
    entries: HashMap<String, TrackedTraveler>,
}

impl TravelerStore {
    pub fn new(ordering: OrderingMode) -> Self {
        Self {
            ordering,
            entries: HashMap::new(),
        }
    }

    pub fn get(&self, traveler_id: &str) -> Option<&TrackedTraveler> {
        self.entries.get(traveler_id)
    }

    /// Insert or overwrite the entry for `report`'s traveler.
    ///
    /// Under `LastWriteWins` the report always replaces the entry. Under
    /// `NewestTimestamp` a report older than the stored sample is ignored.
    /// A report without a display name keeps the stored one.
    pub fn upsert(&mut self, report: TravelerReport, now: Instant) -> Upsert {
        let TravelerReport {
            sample,
            display_name,
        } = report;
        match self.entries.get_mut(&sample.traveler_id) {
            Some(existing) => {
                if self.ordering == OrderingMode::NewestTimestamp
                    && sample.timestamp < existing.sample.timestamp
                {
                    return Upsert::Ignored;
                }
                existing.sample = sample;
                if display_name.is_some() {
                    existing.display_name = display_name;
                }
                existing.stale = false;
                existing.updated_at = now;
                Upsert::Replaced
            }
            None => {
                self.entries.insert(
                    sample.traveler_id.clone(),
                    TrackedTraveler {
                        sample,
                        display_name,
                        stale: false,
                        updated_at: now,
                    },
                );
                Upsert::Inserted
            }
        }
    }

    pub fn remove(&mut self, traveler_id: &str) -> Option<TrackedTraveler> {
        self.entries.remove(traveler_id)
    }

    /// Replace the whole map with `reports`. Nothing from before survives.
    pub fn replace_all(&mut self, reports: impl IntoIterator<Item = TravelerReport>, now: Instant) {
        self.entries.clear();
        for report in reports {
            self.upsert(report, now);
        }
    }

    /// Flag every entry stale. Returns how many were not stale already.
    pub fn mark_all_stale(&mut self) -> usize {
        let mut marked = 0;
        for entry in self.entries.values_mut().filter(|e| !e.stale) {
            entry.stale = true;
            marked += 1;
        }
        marked
    }

    /// Flag entries idle for `stale_after` and drop entries idle for
    /// `evict_after`. `None` disables either rule.
    pub fn sweep(
        &mut self,
        now: Instant,
        stale_after: Option<Duration>,
        evict_after: Option<Duration>,
    ) -> SweepOutcome {
        let mut outcome = SweepOutcome::default();
        if let Some(window) = evict_after {
            self.entries.retain(|id, entry| {
                let keep = now.saturating_duration_since(entry.updated_at) < window;
                if !keep {
                    outcome.evicted.push(id.clone());
                }
                keep
            });
            outcome.evicted.sort();
        }
        if let Some(window) = stale_after {
            for entry in self.entries.values_mut() {
                if !entry.stale && now.saturating_duration_since(entry.updated_at) >= window {
                    entry.stale = true;
                    outcome.marked += 1;
                }
            }
        }
        outcome
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TrackedTraveler> {
        self.entries.values()
    }

    /// Entries ordered by traveler id.
    pub fn sorted(&self) -> Vec<&TrackedTraveler> {
        let mut entries: Vec<_> = self.entries.values().collect();
        entries.sort_by(|a, b| a.sample.traveler_id.cmp(&b.sample.traveler_id));
        entries
    }
}
