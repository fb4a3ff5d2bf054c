//! Tracked state of the upstream IRC session.
//!
//! Channels own their members and ban lists outright. Questions like
//! "which channels is this nick on" are answered by walking the session's
//! channel map, never through back-references.

mod banlist;
mod channel;
mod keyring;
mod nick;

pub use banlist::{BanEntry, Banlist};
pub use channel::{Channel, ModeEffects, ModeEntry, Topic, TopicState};
pub use keyring::Keyring;
pub use nick::Nick;
