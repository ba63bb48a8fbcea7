//! Channel connection configuration types.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// A transport the channel may use, in preference order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TransportName {
    Websocket,
    Polling,
}

/// Connection settings for the live channel.
///
/// `transports` is tried in order; the next entry is only used when the
/// previous one could not be reached at all.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChannelSettings {
    /// Realtime endpoint, `ws://` or `wss://`.
    pub endpoint: String,
    pub transports: Vec<TransportName>,
    /// Upper bound on connect + handshake per transport.
    pub connect_timeout_secs: u64,
    /// WebSocket ping interval. 0 disables keepalive.
    pub keepalive_secs: u64,
    /// Pause between polls when the polling transport returns nothing.
    pub poll_interval_ms: u64,
    pub reconnect: ReconnectSettings,
}

impl Default for ChannelSettings {
    fn default() -> Self {
        Self {
            endpoint: "ws://127.0.0.1:3000/live".to_string(),
            transports: vec![TransportName::Websocket, TransportName::Polling],
            connect_timeout_secs: 15,
            keepalive_secs: 25,
            poll_interval_ms: 250,
            reconnect: ReconnectSettings::default(),
        }
    }
}

impl ChannelSettings {
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_secs)
    }

    pub fn keepalive(&self) -> Option<Duration> {
        (self.keepalive_secs > 0).then(|| Duration::from_secs(self.keepalive_secs))
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

/// Automatic reconnect policy. Disabled by default: a failed or dropped
/// connection stays down until the caller reconnects explicitly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ReconnectSettings {
    pub enabled: bool,
    pub base_delay_secs: u64,
    pub max_delay_secs: u64,
    /// 0 means retry forever.
    pub max_attempts: u32,
}

impl Default for ReconnectSettings {
    fn default() -> Self {
        Self {
            enabled: false,
            base_delay_secs: 1,
            max_delay_secs: 30,
            max_attempts: 0,
        }
    }
}

impl ReconnectSettings {
    /// Delay before retry number `attempt` (0-based): `base * 2^attempt`,
    /// capped at `max_delay_secs`.
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let factor = 1u64.checked_shl(attempt.min(32)).unwrap_or(u64::MAX);
        let secs = self
            .base_delay_secs
            .saturating_mul(factor)
            .min(self.max_delay_secs);
        Duration::from_secs(secs)
    }

    /// Whether retry number `attempt` (0-based) is still allowed.
    pub fn allows(&self, attempt: u32) -> bool {
        self.enabled && (self.max_attempts == 0 || attempt < self.max_attempts)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn channel_settings_defaults() {
        let config = ChannelSettings::default();
        assert_eq!(
            config.transports,
            vec![TransportName::Websocket, TransportName::Polling]
        );
        assert_eq!(config.connect_timeout(), Duration::from_secs(15));
        assert_eq!(config.keepalive(), Some(Duration::from_secs(25)));
        assert!(!config.reconnect.enabled);
    }

    #[test]
    fn keepalive_zero_disables() {
        let config: ChannelSettings = toml::from_str("keepalive_secs = 0").unwrap();
        assert!(config.keepalive().is_none());
    }

    #[test]
    fn polling_only_transport_list() {
        let config: ChannelSettings = toml::from_str(r#"transports = ["polling"]"#).unwrap();
        assert_eq!(config.transports, vec![TransportName::Polling]);
    }

    #[test]
    fn backoff_doubles_and_caps() {
        let reconnect = ReconnectSettings {
            enabled: true,
            base_delay_secs: 1,
            max_delay_secs: 30,
            max_attempts: 0,
        };
        assert_eq!(reconnect.delay_for(0), Duration::from_secs(1));
        assert_eq!(reconnect.delay_for(1), Duration::from_secs(2));
        assert_eq!(reconnect.delay_for(4), Duration::from_secs(16));
        assert_eq!(reconnect.delay_for(5), Duration::from_secs(30));
        assert_eq!(reconnect.delay_for(200), Duration::from_secs(30));
    }

    #[test]
    fn attempts_limited_when_configured() {
        let mut reconnect = ReconnectSettings {
            enabled: true,
            max_attempts: 2,
            ..Default::default()
        };
        assert!(reconnect.allows(0));
        assert!(reconnect.allows(1));
        assert!(!reconnect.allows(2));

        reconnect.enabled = false;
        assert!(!reconnect.allows(0));
    }
}
