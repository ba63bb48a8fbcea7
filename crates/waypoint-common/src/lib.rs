pub mod errors;

pub use errors::{ChannelError, ConfigError, PublisherError, WaypointError};

pub type Result<T> = std::result::Result<T, WaypointError>;
