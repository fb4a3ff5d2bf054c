//! IRC case-mapping functions.
//!
//! Channel and nick names compare under the `rfc1459` mapping, where
//! `[]\~` are the uppercase forms of `{}|^`. Maps that must treat
//! `#Foo` and `#foo` as one entry are keyed by [`CaseKey`].

use std::borrow::Borrow;
use std::fmt;

/// Convert a single character to IRC lowercase using RFC 1459 case mapping.
///
/// In addition to ASCII lowercase conversion, this maps:
/// - `[` → `{`
/// - `]` → `}`
/// - `\` → `|`
/// - `~` → `^`
#[inline]
pub const fn irc_lower_char(c: char) -> char {
    match c {
        '[' => '{',
        ']' => '}',
        '\\' => '|',
        '~' => '^',
        'A'..='Z' => (c as u8 + 32) as char,
        _ => c,
    }
}

/// Convert a string to IRC lowercase using RFC 1459 case mapping.
pub fn irc_to_lower(s: &str) -> String {
    s.chars().map(irc_lower_char).collect()
}

/// Compare two strings using IRC case-insensitive comparison.
pub fn irc_eq(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }

    a.chars()
        .zip(b.chars())
        .all(|(ca, cb)| irc_lower_char(ca) == irc_lower_char(cb))
}

/// A case-folded map key.
///
/// Holds the RFC 1459 lowercase form only; callers keep the display form in
/// the map value. Lookups fold the probe the same way, so
/// `map.get(&CaseKey::new("#Test"))` finds an entry inserted as `#test`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CaseKey(String);

impl CaseKey {
    /// Fold `name` into a key.
    pub fn new(name: &str) -> Self {
        Self(irc_to_lower(name))
    }

    /// The folded form.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for CaseKey {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl Borrow<str> for CaseKey {
    fn borrow(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CaseKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
