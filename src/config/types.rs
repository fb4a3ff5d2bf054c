//! Core configuration types and loading.

use serde::Deserialize;
use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use super::defaults::*;

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),
}

/// Bouncer configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    /// Local listener and account.
    pub bouncer: BouncerConfig,
    /// Upstream IRC server.
    pub upstream: UpstreamConfig,
    /// IRC identity and session behavior.
    pub user: UserConfig,
    /// Outbound flood protection.
    #[serde(default)]
    pub flood: FloodConfig,
    /// Keepalive and timer settings.
    #[serde(default)]
    pub timeouts: TimeoutsConfig,
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content)
    }

    /// Parse configuration from TOML text.
    pub fn parse(content: &str) -> Result<Self, ConfigError> {
        let config: Config = toml::from_str(content)?;
        Ok(config)
    }
}

/// Local side of the bouncer.
#[derive(Debug, Clone, Deserialize)]
pub struct BouncerConfig {
    /// Account name. Doubles as the ident in synthetic hostmasks.
    pub username: String,
    /// Password a client must send with PASS.
    pub password: String,
    /// Address the client listener binds to.
    #[serde(default = "default_listen")]
    pub listen: SocketAddr,
    /// How often the driver ticks the session.
    #[serde(default = "default_tick_interval_ms")]
    pub tick_interval_ms: u64,
    /// Log output format.
    #[serde(default)]
    pub log_format: LogFormat,
}

/// Log output format.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum LogFormat {
    /// Human-readable lines.
    #[default]
    Pretty,
    /// One JSON object per event.
    Json,
}

/// Upstream IRC server.
#[derive(Debug, Clone, Deserialize)]
pub struct UpstreamConfig {
    /// Server hostname.
    pub server: String,
    /// Server port.
    #[serde(default = "default_port")]
    pub port: u16,
    /// Optional server password (sent as PASS).
    pub password: Option<String>,
    /// Seconds to wait before reconnecting after the link drops.
    #[serde(default = "default_reconnect_delay")]
    pub reconnect_delay: u64,
    /// Minimum spacing between connection attempts, in seconds.
    #[serde(default = "default_reconnect_throttle")]
    pub reconnect_throttle: u64,
}

/// IRC identity and per-session behavior.
#[derive(Debug, Clone, Deserialize)]
pub struct UserConfig {
    /// Preferred nickname.
    pub nick: String,
    /// Realname sent with USER.
    #[serde(default = "default_realname")]
    pub realname: String,
    /// Channels joined after connecting. Kept up to date as the session
    /// joins and parts.
    #[serde(default)]
    pub channels: Vec<String>,
    /// Channel keys, by channel name.
    #[serde(default)]
    pub keys: BTreeMap<String, String>,
    /// User modes set after connecting and on attach (without the `+`).
    #[serde(default)]
    pub automodes: String,
    /// User modes removed while no client is attached (without the `-`).
    #[serde(default)]
    pub dropmodes: String,
    /// Away message set while detached.
    pub away: Option<String>,
    /// Nick switched to on detach.
    pub awaynick: Option<String>,
    /// Append the detach time to the away message.
    #[serde(default)]
    pub away_timestamp: bool,
    /// Use a client's QUIT message as the away message.
    #[serde(default)]
    pub quit_as_away: bool,
    /// When to join channels after the MOTD.
    #[serde(default)]
    pub delay_join: DelayJoin,
}

/// Auto-join policy after registration.
#[derive(Debug, Clone, Copy, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum DelayJoin {
    /// Join as soon as the MOTD ends.
    #[default]
    Immediate,
    /// Join a few seconds after the MOTD ends.
    Delayed,
    /// Never auto-join.
    Never,
}

/// Outbound flood protection.
#[derive(Debug, Clone, Deserialize)]
pub struct FloodConfig {
    /// Enable byte-budget pacing.
    #[serde(default = "default_true")]
    pub control: bool,
    /// Minimum seconds between two upstream lines while pacing.
    #[serde(default = "default_floodwait")]
    pub floodwait: u64,
}

impl Default for FloodConfig {
    fn default() -> Self {
        Self {
            control: true,
            floodwait: default_floodwait(),
        }
    }
}

/// Keepalive and timer settings, in seconds.
#[derive(Debug, Clone, Deserialize)]
pub struct TimeoutsConfig {
    /// Interval between keepalive PINGs to the server.
    #[serde(default = "default_ping_interval")]
    pub ping_interval: u64,
    /// Close the upstream link after this long without any line from it.
    #[serde(default = "default_liveness")]
    pub liveness: u64,
    /// Delay used by [`DelayJoin::Delayed`].
    #[serde(default = "default_delay_join_secs")]
    pub delay_join: u64,
}

impl Default for TimeoutsConfig {
    fn default() -> Self {
        Self {
            ping_interval: default_ping_interval(),
            liveness: default_liveness(),
            delay_join: default_delay_join_secs(),
        }
    }
}
