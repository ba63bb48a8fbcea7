//! Where the config file lives, and seeding it on first run.

use std::fs::OpenOptions;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, info};
use waypoint_common::ConfigError;

use super::template::default_config_toml;

const APP_DIR: &str = "waypoint";
const FILE_NAME: &str = "config.toml";

fn io_failure(action: &str, path: &Path, e: std::io::Error) -> ConfigError {
    ConfigError::ParseError(format!("failed to {action} {}: {e}", path.display()))
}

/// `<platform config dir>/waypoint/config.toml`.
pub fn default_config_path() -> Result<PathBuf, ConfigError> {
    dirs::config_dir()
        .map(|dir| dir.join(APP_DIR).join(FILE_NAME))
        .ok_or_else(|| ConfigError::ParseError("no platform config directory".into()))
}

/// Seed `path` with the commented template.
///
/// Never overwrites: returns `Ok(false)` when a file is already there, which
/// covers two processes racing to create it on first run.
pub fn create_default_config(path: &Path) -> Result<bool, ConfigError> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| io_failure("create", parent, e))?;
    }

    let mut file = match OpenOptions::new().write(true).create_new(true).open(path) {
        Ok(file) => file,
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!(path = %path.display(), "Config file already exists, leaving it alone");
            return Ok(false);
        }
        Err(e) => return Err(io_failure("create", path, e)),
    };
    file.write_all(default_config_toml().as_bytes())
        .map_err(|e| io_failure("write", path, e))?;

    info!(path = %path.display(), "Created default config");
    Ok(true)
}
