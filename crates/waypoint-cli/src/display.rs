//! Plain-text rendering of the tracked travelers and the badge.

use std::fmt::Write;

use waypoint_live::{Badge, ConnectionStatus, TrackedTraveler, TravelerStore};

pub fn badge_line(badge: Badge, status: &ConnectionStatus) -> String {
    let mut line = format!("[{badge}]");
    if let Some(transport) = status.transport {
        let _ = write!(line, " via {transport}");
    }
    if let Some(error) = &status.last_error {
        let _ = write!(line, " ({error})");
    }
    line
}

fn clock(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms)
        .map(|t| t.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string())
}

fn row(traveler: &TrackedTraveler) -> String {
    let sample = &traveler.sample;
    let mut row = format!(
        "  {:<16} {:>10.5} {:>11.5}  {}",
        sample.traveler_id,
        sample.lat,
        sample.lng,
        clock(sample.timestamp)
    );
    if let Some(name) = &traveler.display_name {
        let _ = write!(row, "  {name}");
    }
    if traveler.stale {
        row.push_str("  (stale)");
    }
    row
}

/// One line per traveler, ordered by id, with a header.
pub fn traveler_table(store: &TravelerStore) -> String {
    let mut out = format!("{} traveler(s)\n", store.len());
    for traveler in store.sorted() {
        out.push_str(&row(traveler));
        out.push('\n');
    }
    out
}
