//! Network module.
//!
//! Contains the Gateway (client listener and session event loop) and
//! client registration.

mod gateway;
mod registration;

pub use gateway::{Gateway, LineStream};
pub use registration::{REGISTRATION_TIMEOUT, Registration, register};
