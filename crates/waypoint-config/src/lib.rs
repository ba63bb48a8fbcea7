//! Waypoint configuration system.
//!
//! TOML-based configuration for the live location channel. Every section
//! uses serde defaults so partial config files work out of the box.

pub mod loader;
pub mod schema;
pub mod validation;

use std::path::Path;

pub use loader::{create_default_config, default_config_path, load_default, load_from_path};
pub use schema::{
    ChannelSettings, OrderingMode, PublisherSettings, ReconnectSettings, SubscriberSettings,
    TransportName, WaypointConfig,
};

use waypoint_common::ConfigError;

/// Load `path`, or the platform default file when `None`, then apply an
/// endpoint override and validate the result.
///
/// Unlike [`load_from_path`], an override that fails validation is an error
/// rather than a fallback to defaults.
pub fn load_config(
    path: Option<&Path>,
    endpoint: Option<&str>,
) -> Result<WaypointConfig, ConfigError> {
    let mut config = match path {
        Some(path) => load_from_path(path)?,
        None => load_default()?,
    };
    if let Some(endpoint) = endpoint {
        config.channel.endpoint = endpoint.to_string();
    }
    validation::validate(&config)?;
    Ok(config)
}
