//! Commented default config file content.

pub(super) fn default_config_toml() -> &'static str {
    r##"# Waypoint Configuration
# Only override what you want to change -- missing fields use defaults.

[channel]
# endpoint = "ws://127.0.0.1:3000/live"
# transports = ["websocket", "polling"]   # tried in order
# connect_timeout_secs = 15               # 1-300
# keepalive_secs = 25                     # 0 disables pings
# poll_interval_ms = 250                  # polling transport only

[channel.reconnect]
# enabled = false                         # reconnect is manual by default
# base_delay_secs = 1
# max_delay_secs = 30
# max_attempts = 0                        # 0 = unlimited

[publisher]
# min_interval_ms = 5000                  # both thresholds must be met
# min_distance_m = 10.0

[subscriber]
# ordering = "last_write_wins"            # or "newest_timestamp"
# stale_after_secs = 0                    # 0 = never
# evict_after_secs = 0                    # 0 = never
"##
}
