//! Configuration validation.
//!
//! Validates configuration at startup to catch common errors early.

use super::Config;
use thiserror::Error;

/// Validation errors for configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ValidationError {
    #[error("bouncer.username is required")]
    MissingUsername,
    #[error("bouncer.password is required")]
    MissingPassword,
    #[error("upstream.server is required")]
    MissingServer,
    #[error("user.nick is not a valid nickname: '{0}'")]
    InvalidNick(String),
    #[error("user.channels entry is not a channel name: '{0}'")]
    InvalidChannel(String),
    #[error("user.{field} must be bare mode letters, got '{value}'")]
    InvalidModes { field: &'static str, value: String },
    #[error("bouncer.tick_interval_ms must be greater than zero")]
    ZeroTickInterval,
    #[error("timeouts.liveness ({liveness}s) must exceed timeouts.ping_interval ({ping_interval}s)")]
    LivenessTooShort { liveness: u64, ping_interval: u64 },
}

/// Validate a configuration, returning all errors found.
pub fn validate(config: &Config) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    // Required fields
    if config.bouncer.username.is_empty() {
        errors.push(ValidationError::MissingUsername);
    }
    if config.bouncer.password.is_empty() {
        errors.push(ValidationError::MissingPassword);
    }
    if config.upstream.server.is_empty() {
        errors.push(ValidationError::MissingServer);
    }

    if !is_valid_nick(&config.user.nick) {
        errors.push(ValidationError::InvalidNick(config.user.nick.clone()));
    }
    if let Some(awaynick) = &config.user.awaynick
        && !is_valid_nick(awaynick)
    {
        errors.push(ValidationError::InvalidNick(awaynick.clone()));
    }

    for channel in &config.user.channels {
        if !channel.starts_with(['#', '&', '+', '!']) || channel.contains([' ', ',']) {
            errors.push(ValidationError::InvalidChannel(channel.clone()));
        }
    }

    for (field, value) in [
        ("automodes", &config.user.automodes),
        ("dropmodes", &config.user.dropmodes),
    ] {
        if !value.chars().all(|c| c.is_ascii_alphabetic()) {
            errors.push(ValidationError::InvalidModes {
                field,
                value: value.clone(),
            });
        }
    }

    if config.bouncer.tick_interval_ms == 0 {
        errors.push(ValidationError::ZeroTickInterval);
    }
    if config.timeouts.liveness <= config.timeouts.ping_interval {
        errors.push(ValidationError::LivenessTooShort {
            liveness: config.timeouts.liveness,
            ping_interval: config.timeouts.ping_interval,
        });
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn is_valid_nick(nick: &str) -> bool {
    let Some(first) = nick.chars().next() else {
        return false;
    };
    !first.is_ascii_digit()
        && first != '-'
        && nick
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || "[]\\`_^{|}-".contains(c))
}
