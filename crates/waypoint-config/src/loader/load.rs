//! Core TOML config loading: read from path or platform default.

use std::path::Path;

use tracing::{info, warn};
use waypoint_common::ConfigError;

use super::paths::{create_default_config, default_config_path};
use crate::schema::WaypointConfig;
use crate::validation;

/// Load config from a specific TOML file path.
///
/// Deserializes the file using serde defaults for any missing fields.
/// If the parsed config fails validation, a warning is logged and the
/// default config is returned instead.
pub fn load_from_path(path: &Path) -> Result<WaypointConfig, ConfigError> {
    if !path.exists() {
        return Err(ConfigError::FileNotFound(path.to_path_buf()));
    }

    let content = std::fs::read_to_string(path)
        .map_err(|e| ConfigError::ParseError(format!("failed to read {}: {e}", path.display())))?;

    let config: WaypointConfig = toml::from_str(&content)
        .map_err(|e| ConfigError::ParseError(format!("failed to parse TOML: {e}")))?;

    if let Err(e) = validation::validate(&config) {
        warn!("config validation warning: {e}");
        warn!("falling back to default config");
        return Ok(WaypointConfig::default());
    }

    info!("loaded config from {}", path.display());
    Ok(config)
}

/// Load config from the platform-specific default path.
///
/// On macOS: `~/Library/Application Support/waypoint/config.toml`
/// On Linux: `~/.config/waypoint/config.toml`
///
/// If the file does not exist, creates a default config file and returns defaults.
pub fn load_default() -> Result<WaypointConfig, ConfigError> {
    let path = default_config_path()?;

    match load_from_path(&path) {
        Ok(config) => Ok(config),
        Err(ConfigError::FileNotFound(_)) => {
            info!("no config found at {}, creating default", path.display());
            if create_default_config(&path)? {
                Ok(WaypointConfig::default())
            } else {
                load_from_path(&path)
            }
        }
        Err(e) => Err(e),
    }
}
