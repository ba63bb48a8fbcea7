//! Configuration validation.
//!
//! Collects every problem into a single `ConfigError::ValidationError`.

use waypoint_common::ConfigError;

use crate::schema::WaypointConfig;

/// Run all validations on a config, collecting all errors.
pub fn validate(config: &WaypointConfig) -> Result<(), ConfigError> {
    let mut errors: Vec<String> = Vec::new();

    // Channel
    let endpoint = config.channel.endpoint.as_str();
    if !(endpoint.starts_with("ws://") || endpoint.starts_with("wss://")) {
        errors.push(format!(
            "channel.endpoint = {endpoint:?} must start with ws:// or wss://"
        ));
    }
    if config.channel.transports.is_empty() {
        errors.push("channel.transports must list at least one transport".to_string());
    }
    let mut seen = Vec::new();
    for transport in &config.channel.transports {
        if seen.contains(transport) {
            errors.push(format!("channel.transports lists {transport:?} twice"));
        }
        seen.push(*transport);
    }
    validate_range(
        &mut errors,
        "channel.connect_timeout_secs",
        config.channel.connect_timeout_secs,
        1,
        300,
    );
    validate_range(&mut errors, "channel.keepalive_secs", config.channel.keepalive_secs, 0, 600);
    validate_range(
        &mut errors,
        "channel.poll_interval_ms",
        config.channel.poll_interval_ms,
        10,
        60_000,
    );

    let reconnect = &config.channel.reconnect;
    validate_range(
        &mut errors,
        "channel.reconnect.base_delay_secs",
        reconnect.base_delay_secs,
        1,
        3600,
    );
    if reconnect.max_delay_secs < reconnect.base_delay_secs {
        errors.push(format!(
            "channel.reconnect.max_delay_secs = {} is below base_delay_secs = {}",
            reconnect.max_delay_secs, reconnect.base_delay_secs
        ));
    }

    // Publisher
    validate_range(
        &mut errors,
        "publisher.min_interval_ms",
        config.publisher.min_interval_ms,
        0,
        3_600_000,
    );
    validate_range_f64(
        &mut errors,
        "publisher.min_distance_m",
        config.publisher.min_distance_m,
        0.0,
        100_000.0,
    );

    // Subscriber
    let subscriber = &config.subscriber;
    if subscriber.stale_after_secs > 0
        && subscriber.evict_after_secs > 0
        && subscriber.evict_after_secs < subscriber.stale_after_secs
    {
        errors.push(format!(
            "subscriber.evict_after_secs = {} is below stale_after_secs = {}",
            subscriber.evict_after_secs, subscriber.stale_after_secs
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(ConfigError::ValidationError(errors.join("; ")))
    }
}

/// Push an error if `value` is outside `[min, max]` (integer).
fn validate_range(errors: &mut Vec<String>, name: &str, value: u64, min: u64, max: u64) {
    if value < min || value > max {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}

/// Push an error if `value` is outside `[min, max]` (float).
fn validate_range_f64(errors: &mut Vec<String>, name: &str, value: f64, min: f64, max: f64) {
    if !(min..=max).contains(&value) {
        errors.push(format!("{name} = {value} is out of range [{min}, {max}]"));
    }
}
