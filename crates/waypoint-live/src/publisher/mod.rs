//! Publisher role: sample device positions and emit `location_update`.

mod client;
mod gate;
mod source;


pub use client::LocationPublisher;
pub use gate::{distance_m, SampleGate};
pub use source::{FixedPermission, LocationPermission, PermissionStatus, PositionSource};
