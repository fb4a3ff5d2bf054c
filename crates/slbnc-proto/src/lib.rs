//! # slbnc-proto
//!
//! Protocol layer for the slbnc IRC session relay.
//!
//! ## Features
//!
//! - Line tokenizing and serialization with trailing-parameter handling
//! - A borrowed-free [`Message`] view (prefix, command, parameters)
//! - RFC 1459 case mapping and case-folded map keys
//! - A server capability store populated from `RPL_ISUPPORT` (005)
//! - Mode-change scanning driven by `CHANMODES` and `PREFIX`
//! - Optional Tokio line codec
//!
//! ## Quick Start
//!
//! ```rust
//! use slbnc_proto::{tokenize, serialize, Message};
//!
//! let args = tokenize(":irc.example.net 332 me #test :hello world");
//! assert_eq!(args, ["irc.example.net", "332", "me", "#test", "hello world"]);
//!
//! let msg: Message = ":alice!a@b MODE #test +ov bob carol".parse().unwrap();
//! assert_eq!(msg.source_nick(), Some("alice"));
//! assert_eq!(serialize(&["TOPIC", "#test", ""]), "TOPIC #test :");
//! ```

#![deny(clippy::all)]
#![warn(missing_docs)]

pub mod casemap;
#[cfg(feature = "tokio")]
pub mod codec;
pub mod error;
pub mod isupport;
pub mod line;
pub mod mode;
pub mod numeric;

pub use self::casemap::{irc_eq, irc_lower_char, irc_to_lower, CaseKey};
#[cfg(feature = "tokio")]
pub use self::codec::LineCodec;
pub use self::error::{ProtocolError, Result};
pub use self::isupport::{Capabilities, ChanModes, ModeClass, PrefixSpec};
pub use self::line::{nick_from_hostmask, serialize, tokenize, Message, MAX_LINE_LEN};
pub use self::mode::{count_mode_params, scan_mode_changes, ModeChange};
