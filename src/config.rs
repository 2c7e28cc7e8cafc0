//! Configuration loading and management.

use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Engine configuration.
///
/// Every field has a default, so an empty TOML document is a valid
/// configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct EngineConfig {
    /// Prefix character that marks chat input as a command.
    #[serde(default = "defaults::command_prefix")]
    pub command_prefix: char,

    /// Primary wait for the session user state after connecting, in
    /// milliseconds. The user state arrives over IRC and may never come
    /// if the connection stalls.
    #[serde(default = "defaults::user_state_timeout_ms")]
    pub user_state_timeout_ms: u64,

    /// Fallback wait for a user state that covers fewer channels than
    /// expected, in milliseconds.
    #[serde(default = "defaults::user_state_short_timeout_ms")]
    pub user_state_short_timeout_ms: u64,

    /// Base wait for a channel's room state when the channel id cannot
    /// be resolved through the API, in milliseconds.
    #[serde(default = "defaults::room_state_timeout_ms")]
    pub room_state_timeout_ms: u64,

    /// Additional room-state wait per joined channel, in milliseconds.
    #[serde(default = "defaults::room_state_per_channel_ms")]
    pub room_state_per_channel_ms: u64,

    /// Interval between stream-metadata refreshes, in milliseconds.
    #[serde(default = "defaults::stream_refresh_interval_ms")]
    pub stream_refresh_interval_ms: u64,

    /// Whether stream metadata is fetched at all.
    #[serde(default = "defaults::enabled")]
    pub fetch_streams: bool,

    /// Whether recent-message backfill runs on channel load.
    #[serde(default = "defaults::enabled")]
    pub load_recent_messages: bool,
}

mod defaults {
    pub(super) fn command_prefix() -> char {
        '/'
    }
    pub(super) fn user_state_timeout_ms() -> u64 {
        5_000
    }
    pub(super) fn user_state_short_timeout_ms() -> u64 {
        1_000
    }
    pub(super) fn room_state_timeout_ms() -> u64 {
        5_000
    }
    pub(super) fn room_state_per_channel_ms() -> u64 {
        600
    }
    pub(super) fn stream_refresh_interval_ms() -> u64 {
        30_000
    }
    pub(super) fn enabled() -> bool {
        true
    }
}

impl Default for EngineConfig {
    fn default() -> Self {
        toml::from_str("").expect("empty config must deserialize")
    }
}

impl EngineConfig {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: EngineConfig = toml::from_str(&content)?;
        Ok(config)
    }

    /// Primary user-state wait.
    pub fn user_state_timeout(&self) -> Duration {
        Duration::from_millis(self.user_state_timeout_ms)
    }

    /// Fallback user-state wait.
    pub fn user_state_short_timeout(&self) -> Duration {
        Duration::from_millis(self.user_state_short_timeout_ms)
    }

    /// Room-state wait, scaled by the number of unresolved channels.
    pub fn room_state_timeout(&self, channel_count: usize) -> Duration {
        Duration::from_millis(
            self.room_state_timeout_ms + channel_count as u64 * self.room_state_per_channel_ms,
        )
    }

    /// Stream refresh interval.
    pub fn stream_refresh_interval(&self) -> Duration {
        Duration::from_millis(self.stream_refresh_interval_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_config_uses_defaults() {
        let config = EngineConfig::default();
        assert_eq!(config.command_prefix, '/');
        assert_eq!(config.user_state_timeout(), Duration::from_secs(5));
        assert_eq!(config.user_state_short_timeout(), Duration::from_secs(1));
        assert!(config.fetch_streams);
        assert!(config.load_recent_messages);
    }

    #[test]
    fn room_state_timeout_scales_with_channels() {
        let config = EngineConfig::default();
        assert_eq!(config.room_state_timeout(0), Duration::from_millis(5_000));
        assert_eq!(config.room_state_timeout(3), Duration::from_millis(6_800));
    }

    #[test]
    fn partial_config_overrides() {
        let config: EngineConfig = toml::from_str(
            r#"
            command_prefix = "!"
            fetch_streams = false
            "#,
        )
        .unwrap();
        assert_eq!(config.command_prefix, '!');
        assert!(!config.fetch_streams);
        assert!(config.load_recent_messages);
    }
}
