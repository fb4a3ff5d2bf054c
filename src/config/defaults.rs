//! Default value functions for configuration.
//!
//! Separated into its own module for clarity and reuse.

/// Returns `true` (for serde defaults).
pub fn default_true() -> bool {
    true
}

// =============================================================================
// Bouncer Defaults
// =============================================================================

pub fn default_listen() -> std::net::SocketAddr {
    std::net::SocketAddr::from(([127, 0, 0, 1], 6667))
}

pub fn default_tick_interval_ms() -> u64 {
    200
}

// =============================================================================
// Upstream Defaults
// =============================================================================

pub fn default_port() -> u16 {
    6667
}

pub fn default_reconnect_delay() -> u64 {
    5
}

pub fn default_reconnect_throttle() -> u64 {
    120
}

// =============================================================================
// User Defaults
// =============================================================================

pub fn default_realname() -> String {
    "slbnc user".to_string()
}

// =============================================================================
// Flood Defaults
// =============================================================================

pub fn default_floodwait() -> u64 {
    2
}

// =============================================================================
// Timeout Defaults
// =============================================================================

pub fn default_ping_interval() -> u64 {
    180
}

pub fn default_liveness() -> u64 {
    300
}

pub fn default_delay_join_secs() -> u64 {
    5
}
