//! Configuration loading and management.
//!
//! This module is split into logical submodules:
//! - [`types`]: Config struct definitions (Config, BouncerConfig, UpstreamConfig, UserConfig)
//! - [`defaults`]: serde default functions
//! - [`validation`]: startup validation

mod defaults;
mod types;
mod validation;

pub use types::{
    BouncerConfig, Config, ConfigError, DelayJoin, FloodConfig, LogFormat, TimeoutsConfig,
    UpstreamConfig, UserConfig,
};
pub use validation::{ValidationError, validate};
