//! slbnc - Straylight IRC Bouncer
//!
//! Keeps one IRC session alive on behalf of a user and relays it to
//! whichever client is currently attached.
//!
//! - [`session`]: the sans-IO relay core
//! - [`state`]: channel, member, ban and key tracking
//! - [`flood`]: outbound queues and byte-budget pacing
//! - [`network`]: the tokio driver around a session
//! - [`config`]: TOML configuration

pub mod config;
pub mod error;
pub mod flood;
pub mod network;
pub mod session;
pub mod state;
pub mod telemetry;

pub use error::{QueueError, RegistrationError, SessionError};
pub use session::{Output, Session, SessionContext};
