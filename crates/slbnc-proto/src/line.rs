//! Line tokenizing and serialization.
//!
//! A line is split on single spaces. A leading `:` marks the first token
//! as the message prefix and is not part of the token. Any later token that
//! starts with `:` swallows the rest of the line verbatim as the final
//! parameter, which is how spaces and empty values travel.

use std::fmt;
use std::str::FromStr;

use crate::error::{ProtocolError, Result};

/// Maximum accepted line length in bytes, excluding the `\r\n` terminator.
pub const MAX_LINE_LEN: usize = 512;

/// Split a protocol line into its parameter tokens.
///
/// The prefix, if any, is returned as the first token without its colon.
/// Empty tokens produced by repeated spaces are skipped, but an explicit
/// empty trailing parameter (`TOPIC #chan :`) is kept.
///
/// ```
/// use slbnc_proto::tokenize;
///
/// assert_eq!(tokenize("TOPIC #chan :"), ["TOPIC", "#chan", ""]);
/// assert_eq!(tokenize(":n!u@h PRIVMSG #c :hi there"), ["n!u@h", "PRIVMSG", "#c", "hi there"]);
/// ```
pub fn tokenize(line: &str) -> Vec<String> {
    let line = line.trim_end_matches(['\r', '\n']);
    let mut rest = line.strip_prefix(':').unwrap_or(line);
    let mut args = Vec::new();

    loop {
        if !args.is_empty() {
            if let Some(trailing) = rest.strip_prefix(':') {
                args.push(trailing.to_string());
                break;
            }
        }

        match rest.split_once(' ') {
            Some((token, tail)) => {
                if !token.is_empty() {
                    args.push(token.to_string());
                }
                rest = tail;
            }
            None => {
                if !rest.is_empty() {
                    args.push(rest.to_string());
                }
                break;
            }
        }
    }

    args
}

/// Join tokens into a protocol line, marking the last one as trailing when
/// it would not survive re-tokenizing on its own.
///
/// The first token is never marked; callers that need a prefix write it
/// through [`Message`]'s `Display` impl instead.
pub fn serialize<S: AsRef<str>>(tokens: &[S]) -> String {
    let mut out = String::new();
    let last = tokens.len().saturating_sub(1);

    for (i, token) in tokens.iter().enumerate() {
        let token = token.as_ref();
        if i > 0 {
            out.push(' ');
            if i == last && needs_trailing_marker(token) {
                out.push(':');
            }
        }
        out.push_str(token);
    }

    out
}

fn needs_trailing_marker(token: &str) -> bool {
    token.is_empty() || token.contains(' ') || token.starts_with(':')
}

/// Returns the nick part of a `nick!user@host` mask.
///
/// A mask without `!` is returned whole (server names, bare nicks).
pub fn nick_from_hostmask(mask: &str) -> &str {
    mask.split_once('!').map_or(mask, |(nick, _)| nick)
}

/// Returns the `user@host` part of a `nick!user@host` mask, if present.
pub fn site_from_hostmask(mask: &str) -> Option<&str> {
    mask.split_once('!').map(|(_, site)| site)
}

/// A parsed IRC line.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message {
    /// Source of the message, without the leading colon.
    pub prefix: Option<String>,
    /// Command name or three-digit numeric, as received.
    pub command: String,
    /// Parameters, trailing parameter included.
    pub params: Vec<String>,
}

impl Message {
    /// Build a prefix-less message.
    pub fn new(command: impl Into<String>, params: Vec<String>) -> Self {
        Self {
            prefix: None,
            command: command.into(),
            params,
        }
    }

    /// Attach a source prefix.
    #[must_use]
    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.prefix = Some(prefix.into());
        self
    }

    /// Parameter at `index`, if present.
    pub fn param(&self, index: usize) -> Option<&str> {
        self.params.get(index).map(String::as_str)
    }

    /// Case-insensitive command comparison.
    pub fn is(&self, command: &str) -> bool {
        self.command.eq_ignore_ascii_case(command)
    }

    /// Nick portion of the prefix.
    pub fn source_nick(&self) -> Option<&str> {
        self.prefix.as_deref().map(nick_from_hostmask)
    }

    /// `user@host` portion of the prefix, for user sources.
    pub fn source_site(&self) -> Option<&str> {
        self.prefix.as_deref().and_then(site_from_hostmask)
    }

    /// Numeric code, when the command is a three-digit reply.
    pub fn numeric(&self) -> Option<u16> {
        if self.command.len() == 3 && self.command.bytes().all(|b| b.is_ascii_digit()) {
            self.command.parse().ok()
        } else {
            None
        }
    }
}

impl FromStr for Message {
    type Err = ProtocolError;

    fn from_str(line: &str) -> Result<Self> {
        let trimmed = line.trim_end_matches(['\r', '\n']);
        if trimmed.len() > MAX_LINE_LEN {
            return Err(ProtocolError::LineTooLong {
                actual: trimmed.len(),
                limit: MAX_LINE_LEN,
            });
        }

        let has_prefix = trimmed.starts_with(':');
        let mut tokens = tokenize(trimmed).into_iter();

        let prefix = if has_prefix {
            Some(tokens.next().ok_or(ProtocolError::EmptyLine)?)
        } else {
            None
        };

        let command = match tokens.next() {
            Some(command) => command,
            None if prefix.is_some() => return Err(ProtocolError::MissingCommand),
            None => return Err(ProtocolError::EmptyLine),
        };

        Ok(Self {
            prefix,
            command,
            params: tokens.collect(),
        })
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(prefix) = &self.prefix {
            write!(f, ":{} ", prefix)?;
        }
        let mut tokens = Vec::with_capacity(self.params.len() + 1);
        tokens.push(self.command.as_str());
        tokens.extend(self.params.iter().map(String::as_str));
        f.write_str(&serialize(&tokens))
    }
}
