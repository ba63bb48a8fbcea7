//! Subscriber role: declare interest and keep the aggregated traveler view.

mod client;
mod events;
mod store;


pub use client::LocationSubscriber;
pub use events::SubscriberEvent;
pub use store::{SweepOutcome, TrackedTraveler, TravelerStore, Upsert};
