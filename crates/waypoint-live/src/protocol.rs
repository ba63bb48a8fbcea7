//! Wire protocol for the live location channel.
//!
//! Every message on either transport is a JSON [`Frame`]
//! `{"event": <name>, "data": <payload>}`. The channel layer only moves
//! frames; the payload types below are decoded by the publisher and
//! subscriber roles.

use serde::{Deserialize, Serialize};

use crate::auth::AuthToken;

// ---------------------------------------------------------------------------
// Event names
// ---------------------------------------------------------------------------

pub mod events {
    pub const CONNECT: &str = "connect";
    pub const CONNECT_ERROR: &str = "connect_error";
    pub const DISCONNECT: &str = "disconnect";
    pub const LOCATION_UPDATE: &str = "location_update";
    pub const LOCATION_ACK: &str = "location_ack";
    pub const SPECIALIST_SUBSCRIBE: &str = "specialist_subscribe";
    pub const ACTIVE_TRAVELERS: &str = "active_travelers";
    pub const TRAVELER_LOCATION: &str = "traveler_location";
}

// ---------------------------------------------------------------------------
// Envelope
// ---------------------------------------------------------------------------

/// A single channel message.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub event: String,
    #[serde(default)]
    pub data: serde_json::Value,
}

impl Frame {
    pub fn new(event: &str, data: serde_json::Value) -> Self {
        Self {
            event: event.to_string(),
            data,
        }
    }

    /// The `connect` frame carrying `{auth: {token}}`.
    pub fn handshake(token: &AuthToken) -> Self {
        Self::new(
            events::CONNECT,
            serde_json::json!({ "auth": { "token": token.expose() } }),
        )
    }

    pub fn is(&self, event: &str) -> bool {
        self.event == event
    }

    /// Reason carried by a `connect_error` frame, if any.
    pub fn error_message(&self) -> String {
        self.data
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or("handshake rejected")
            .to_string()
    }
}

// ---------------------------------------------------------------------------
// Payloads
// ---------------------------------------------------------------------------

/// Device position; also the `location_update` and `location_ack` payload.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Position {
    pub lat: f64,
    pub lng: f64,
    /// Milliseconds since the Unix epoch.
    pub timestamp: i64,
}

impl Position {
    pub fn new(lat: f64, lng: f64, timestamp: i64) -> Self {
        Self { lat, lng, timestamp }
    }

    pub fn is_valid(&self) -> bool {
        valid_coordinates(self.lat, self.lng)
    }
}

/// One traveler's reported position as seen by subscribers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationSample {
    pub traveler_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub service_id: Option<String>,
    pub lat: f64,
    pub lng: f64,
    pub timestamp: i64,
}

impl LocationSample {
    pub fn is_valid(&self) -> bool {
        !self.traveler_id.is_empty() && valid_coordinates(self.lat, self.lng)
    }
}

/// A `traveler_location` payload: the sample plus an optional display name.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TravelerReport {
    #[serde(flatten)]
    pub sample: LocationSample,
    #[serde(default, alias = "name", skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

impl TravelerReport {
    pub fn new(sample: LocationSample) -> Self {
        Self {
            sample,
            display_name: None,
        }
    }

    /// Decode and check a `traveler_location` frame.
    pub fn from_frame(frame: &Frame) -> Result<Self, String> {
        Self::from_value(&frame.data)
    }

    fn from_value(value: &serde_json::Value) -> Result<Self, String> {
        let report = Self::deserialize(value).map_err(|e| e.to_string())?;
        if !report.sample.is_valid() {
            return Err(format!(
                "invalid sample for traveler {:?}",
                report.sample.traveler_id
            ));
        }
        Ok(report)
    }
}

/// The `active_travelers` bulk listing sent right after `specialist_subscribe`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PresenceSnapshot {
    /// Count as announced by the server.
    pub count: usize,
    pub samples: Vec<TravelerReport>,
}

#[derive(Deserialize)]
struct RawSnapshot {
    #[serde(default)]
    count: Option<usize>,
    #[serde(default)]
    travelers: Vec<serde_json::Value>,
}

impl PresenceSnapshot {
    /// Decode an `active_travelers` frame. Entries that fail to decode are
    /// dropped individually; the frame itself must still be an object.
    pub fn from_frame(frame: &Frame) -> Result<Self, String> {
        let raw = RawSnapshot::deserialize(&frame.data).map_err(|e| e.to_string())?;
        let mut samples = Vec::with_capacity(raw.travelers.len());
        for value in &raw.travelers {
            match TravelerReport::from_value(value) {
                Ok(report) => samples.push(report),
                Err(e) => tracing::debug!(error = %e, "Dropping malformed snapshot entry"),
            }
        }
        Ok(Self {
            count: raw.count.unwrap_or(samples.len()),
            samples,
        })
    }
}

fn valid_coordinates(lat: f64, lng: f64) -> bool {
    lat.is_finite()
        && lng.is_finite()
        && (-90.0..=90.0).contains(&lat)
        && (-180.0..=180.0).contains(&lng)
}
