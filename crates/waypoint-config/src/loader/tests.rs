//! Tests for TOML config loading, creation, and path resolution.

use super::*;
use crate::schema::{OrderingMode, TransportName, WaypointConfig};
use std::path::Path;
use waypoint_common::ConfigError;

#[test]
fn load_from_nonexistent_returns_file_not_found() {
    let result = load_from_path(Path::new("/tmp/nonexistent_waypoint_config.toml"));
    assert!(matches!(result, Err(ConfigError::FileNotFound(_))));
}

#[test]
fn load_valid_partial_toml() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[channel]
endpoint = "wss://tracking.example.com/live"
transports = ["polling"]

[subscriber]
ordering = "newest_timestamp"
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.channel.endpoint, "wss://tracking.example.com/live");
    assert_eq!(config.channel.transports, vec![TransportName::Polling]);
    assert_eq!(config.subscriber.ordering, OrderingMode::NewestTimestamp);
    // Defaults preserved
    assert_eq!(config.publisher.min_interval_ms, 5000);
    assert!(!config.channel.reconnect.enabled);
}

#[test]
fn load_invalid_toml_returns_parse_error() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(&path, "this is not valid toml {{{").unwrap();

    let result = load_from_path(&path);
    assert!(matches!(result, Err(ConfigError::ParseError(_))));
}

#[test]
fn load_out_of_range_falls_back_to_defaults() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    std::fs::write(
        &path,
        r#"
[channel]
endpoint = "wss://tracking.example.com/live"
connect_timeout_secs = 0
"#,
    )
    .unwrap();

    let config = load_from_path(&path).unwrap();
    assert_eq!(config.channel.connect_timeout_secs, 15);
    assert_eq!(config.channel.endpoint, WaypointConfig::default().channel.endpoint);
}

#[test]
fn create_default_config_writes_template() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("config.toml");

    assert!(create_default_config(&path).unwrap());
    assert!(path.exists());

    let content = std::fs::read_to_string(&path).unwrap();
    assert!(content.contains("[channel]"));
    assert!(content.contains("[subscriber]"));

    // Template is all comments, so it loads as defaults.
    let config = load_from_path(&path).unwrap();
    assert_eq!(config.publisher.min_distance_m, 10.0);
}

#[test]
fn create_default_config_keeps_existing_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("config.toml");
    let custom = "[channel]\nendpoint = \"wss://mine.example.com/live\"\n";
    std::fs::write(&path, custom).unwrap();

    assert!(!create_default_config(&path).unwrap());
    assert_eq!(std::fs::read_to_string(&path).unwrap(), custom);
}

#[test]
fn default_config_path_ends_with_waypoint() {
    if let Ok(path) = default_config_path() {
        assert!(path.ends_with("waypoint/config.toml"));
    }
}
