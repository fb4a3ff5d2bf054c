//! Server capability store (`RPL_ISUPPORT`).
//!
//! The store starts out with the values an RFC 1459 server implies and is
//! overwritten token by token as 005 replies arrive. A key can be present
//! with an empty value (`EXCEPTS`) or absent; the two are distinct.

use std::collections::BTreeMap;

/// Defaults assumed until the server says otherwise.
const DEFAULTS: &[(&str, &str)] = &[
    ("CHANMODES", "bIe,k,l"),
    ("CHANTYPES", "#&+"),
    ("PREFIX", "(ov)@+"),
];

/// Flat key/value table of server capabilities.
///
/// # Example
///
/// ```
/// use slbnc_proto::Capabilities;
///
/// let mut caps = Capabilities::new();
/// caps.apply_isupport(&["me", "NETWORK=TestNet", "EXCEPTS", "are supported by this server"]);
///
/// assert_eq!(caps.get("NETWORK"), Some("TestNet"));
/// assert_eq!(caps.get("EXCEPTS"), Some(""));
/// assert_eq!(caps.get("INVEX"), None);
/// ```
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Capabilities {
    entries: BTreeMap<String, String>,
}

impl Default for Capabilities {
    fn default() -> Self {
        Self::new()
    }
}

impl Capabilities {
    /// A store seeded with RFC 1459 defaults.
    pub fn new() -> Self {
        let entries = DEFAULTS
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        Self { entries }
    }

    /// Value for `key`. `Some("")` means present without a value.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.entries.get(key).map(String::as_str)
    }

    /// Store or overwrite a single capability.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.entries.insert(key.into(), value.into());
    }

    /// Apply the parameters of an 005 reply.
    ///
    /// The first parameter (our nick) and the last (the human-readable
    /// trailer) are skipped. Each token in between is `KEY=VALUE` or a bare
    /// `KEY`, which is stored with an empty value.
    pub fn apply_isupport<S: AsRef<str>>(&mut self, params: &[S]) {
        if params.len() < 3 {
            return;
        }

        for token in &params[1..params.len() - 1] {
            let token = token.as_ref();
            if token.is_empty() {
                continue;
            }
            match token.split_once('=') {
                Some((key, value)) => self.set(key, value),
                None => self.set(token, ""),
            }
        }
    }

    /// All capabilities as `KEY=VALUE` (or bare `KEY`) tokens, key-ordered.
    pub fn tokens(&self) -> Vec<String> {
        self.entries
            .iter()
            .map(|(k, v)| {
                if v.is_empty() {
                    k.clone()
                } else {
                    format!("{}={}", k, v)
                }
            })
            .collect()
    }

    /// Channel name prefix characters.
    pub fn chantypes(&self) -> &str {
        self.get("CHANTYPES").unwrap_or("#&+")
    }

    /// Whether `name` starts with a channel type character.
    pub fn is_channel(&self, name: &str) -> bool {
        name.chars()
            .next()
            .is_some_and(|c| self.chantypes().contains(c))
    }

    /// The parsed `PREFIX` value; an unparseable value yields no status modes.
    pub fn prefix(&self) -> PrefixSpec<'_> {
        self.get("PREFIX")
            .and_then(PrefixSpec::parse)
            .unwrap_or(PrefixSpec {
                modes: "",
                prefixes: "",
            })
    }

    /// The parsed `CHANMODES` value; missing groups are empty.
    pub fn chanmodes(&self) -> ChanModes<'_> {
        ChanModes::parse(self.get("CHANMODES").unwrap_or(""))
    }

    /// Classify a channel mode letter.
    ///
    /// Derived from the current `PREFIX` and `CHANMODES` on every call, so a
    /// later 005 takes effect immediately. Letters the server never
    /// advertised are treated as parameterless.
    pub fn mode_class(&self, mode: char) -> ModeClass {
        if self.prefix().is_prefix_mode(mode) {
            return ModeClass::Prefix;
        }
        self.chanmodes().class_of(mode)
    }
}

/// How a channel mode letter consumes parameters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ModeClass {
    /// Status mode from `PREFIX`; takes a nick.
    Prefix,
    /// Type A: list mode, takes a parameter on both `+` and `-`.
    List,
    /// Type B: always takes a parameter.
    AlwaysParam,
    /// Type C: takes a parameter only when set.
    ParamWhenSet,
    /// Type D: never takes a parameter.
    NoParam,
}

impl ModeClass {
    /// Whether this class consumes a parameter for the given polarity.
    pub fn takes_param(self, adding: bool) -> bool {
        match self {
            Self::Prefix | Self::List | Self::AlwaysParam => true,
            Self::ParamWhenSet => adding,
            Self::NoParam => false,
        }
    }
}

/// Parsed `PREFIX` ISUPPORT token.
///
/// ```
/// use slbnc_proto::PrefixSpec;
///
/// let spec = PrefixSpec::parse("(ov)@+").unwrap();
/// assert_eq!(spec.prefix_for_mode('o'), Some('@'));
/// assert_eq!(spec.mode_for_prefix('+'), Some('v'));
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PrefixSpec<'a> {
    /// Mode characters, highest rank first.
    pub modes: &'a str,
    /// Prefix symbols in the same order.
    pub prefixes: &'a str,
}

impl<'a> PrefixSpec<'a> {
    /// Parse a `PREFIX` value like `(ov)@+`.
    pub fn parse(s: &'a str) -> Option<Self> {
        let rest = s.strip_prefix('(')?;
        let (modes, prefixes) = rest.split_once(')')?;
        if modes.is_empty() || prefixes.is_empty() {
            return None;
        }
        Some(PrefixSpec { modes, prefixes })
    }

    /// Returns true if the given character is a status mode on this server.
    #[inline]
    pub fn is_prefix_mode(&self, mode: char) -> bool {
        self.modes.contains(mode)
    }

    /// Returns true if the given character is a status symbol.
    #[inline]
    pub fn is_prefix_symbol(&self, symbol: char) -> bool {
        self.prefixes.contains(symbol)
    }

    /// Returns the prefix symbol for a given mode character.
    #[inline]
    pub fn prefix_for_mode(&self, mode: char) -> Option<char> {
        self.modes
            .chars()
            .position(|c| c == mode)
            .and_then(|i| self.prefixes.chars().nth(i))
    }

    /// Returns the mode character for a given prefix symbol.
    #[inline]
    pub fn mode_for_prefix(&self, prefix: char) -> Option<char> {
        self.prefixes
            .chars()
            .position(|c| c == prefix)
            .and_then(|i| self.modes.chars().nth(i))
    }

    /// The highest-ranked symbol contained in `flags`.
    ///
    /// ```
    /// use slbnc_proto::PrefixSpec;
    ///
    /// let spec = PrefixSpec::parse("(qaohv)~&@%+").unwrap();
    /// assert_eq!(spec.highest("+@"), Some('@'));
    /// assert_eq!(spec.highest(""), None);
    /// ```
    pub fn highest(&self, flags: &str) -> Option<char> {
        self.prefixes.chars().find(|p| flags.contains(*p))
    }
}

/// Parsed `CHANMODES` ISUPPORT token.
///
/// Channel modes are divided into four categories (A, B, C, D):
/// - **A**: List modes (e.g., `b` for ban)
/// - **B**: Modes with a parameter for both +/- (e.g., `k` for key)
/// - **C**: Modes with a parameter only for + (e.g., `l` for limit)
/// - **D**: Modes without parameters (e.g., `n` for no external messages)
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChanModes<'a> {
    /// Type A: List modes.
    pub a: &'a str,
    /// Type B: Modes that always require a parameter.
    pub b: &'a str,
    /// Type C: Modes that require a parameter when set.
    pub c: &'a str,
    /// Type D: Modes that never have a parameter.
    pub d: &'a str,
}

impl<'a> ChanModes<'a> {
    /// Parse a `CHANMODES` value like `b,k,l,imnpst`. Missing groups are empty.
    pub fn parse(s: &'a str) -> Self {
        let mut parts = s.splitn(4, ',');
        ChanModes {
            a: parts.next().unwrap_or(""),
            b: parts.next().unwrap_or(""),
            c: parts.next().unwrap_or(""),
            d: parts.next().unwrap_or(""),
        }
    }

    /// Group a letter belongs to; unlisted letters are type D.
    pub fn class_of(&self, mode: char) -> ModeClass {
        if self.a.contains(mode) {
            ModeClass::List
        } else if self.b.contains(mode) {
            ModeClass::AlwaysParam
        } else if self.c.contains(mode) {
            ModeClass::ParamWhenSet
        } else {
            ModeClass::NoParam
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let caps = Capabilities::new();
        assert_eq!(caps.get("CHANMODES"), Some("bIe,k,l"));
        assert_eq!(caps.get("CHANTYPES"), Some("#&+"));
        assert_eq!(caps.get("PREFIX"), Some("(ov)@+"));
        assert_eq!(caps.get("NETWORK"), None);
    }

    #[test]
    fn test_apply_isupport_skips_nick_and_trailer() {
        let mut caps = Capabilities::new();
        caps.apply_isupport(&[
            "me",
            "PREFIX=(qaohv)~&@%+",
            "EXCEPTS",
            "CHANMODES=beI,k,l,imnpst",
            "are supported by this server",
        ]);

        assert_eq!(caps.get("PREFIX"), Some("(qaohv)~&@%+"));
        assert_eq!(caps.get("EXCEPTS"), Some(""));
        assert_eq!(caps.get("me"), None);
        assert_eq!(caps.get("are supported by this server"), None);
    }

    #[test]
    fn test_apply_isupport_too_short() {
        let mut caps = Capabilities::new();
        caps.apply_isupport(&["me", "trailer"]);
        assert_eq!(caps, Capabilities::new());
    }

    #[test]
    fn test_mode_class_default() {
        let caps = Capabilities::new();
        assert_eq!(caps.mode_class('o'), ModeClass::Prefix);
        assert_eq!(caps.mode_class('v'), ModeClass::Prefix);
        assert_eq!(caps.mode_class('b'), ModeClass::List);
        assert_eq!(caps.mode_class('e'), ModeClass::List);
        assert_eq!(caps.mode_class('k'), ModeClass::AlwaysParam);
        assert_eq!(caps.mode_class('l'), ModeClass::ParamWhenSet);
        assert_eq!(caps.mode_class('n'), ModeClass::NoParam);
    }

    #[test]
    fn test_mode_class_follows_later_isupport() {
        let mut caps = Capabilities::new();
        assert_eq!(caps.mode_class('h'), ModeClass::NoParam);
        caps.set("PREFIX", "(ohv)@%+");
        assert_eq!(caps.mode_class('h'), ModeClass::Prefix);
    }

    #[test]
    fn test_takes_param() {
        assert!(ModeClass::List.takes_param(false));
        assert!(ModeClass::AlwaysParam.takes_param(false));
        assert!(ModeClass::ParamWhenSet.takes_param(true));
        assert!(!ModeClass::ParamWhenSet.takes_param(false));
        assert!(!ModeClass::NoParam.takes_param(true));
    }

    #[test]
    fn test_prefix_spec() {
        let spec = PrefixSpec::parse("(qaohv)~&@%+").unwrap();
        assert_eq!(spec.prefix_for_mode('q'), Some('~'));
        assert_eq!(spec.mode_for_prefix('%'), Some('h'));
        assert_eq!(spec.highest("+%"), Some('%'));
        assert!(PrefixSpec::parse("@+").is_none());
        assert!(PrefixSpec::parse("()").is_none());
    }

    #[test]
    fn test_is_channel() {
        let caps = Capabilities::new();
        assert!(caps.is_channel("#test"));
        assert!(caps.is_channel("&local"));
        assert!(!caps.is_channel("alice"));
        assert!(!caps.is_channel(""));
    }

    #[test]
    fn test_tokens_render_bare_keys() {
        let mut caps = Capabilities::new();
        caps.set("EXCEPTS", "");
        let tokens = caps.tokens();
        assert!(tokens.contains(&"EXCEPTS".to_string()));
        assert!(tokens.contains(&"PREFIX=(ov)@+".to_string()));
    }
}
