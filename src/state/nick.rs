//! Channel member records.

use std::collections::BTreeMap;

/// A nick as seen in one channel.
///
/// The same person in two channels is two `Nick` values; nothing links
/// them except the name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Nick {
    name: String,
    /// Status symbols held in this channel, e.g. `@+`.
    prefixes: String,
    site: Option<String>,
    realname: Option<String>,
    server: Option<String>,
    joined_at: i64,
    idle_since: i64,
    tags: BTreeMap<String, String>,
}

impl Nick {
    pub fn new(name: impl Into<String>, now: i64) -> Self {
        Self {
            name: name.into(),
            prefixes: String::new(),
            site: None,
            realname: None,
            server: None,
            joined_at: now,
            idle_since: now,
            tags: BTreeMap::new(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn set_name(&mut self, name: impl Into<String>) {
        self.name = name.into();
    }

    pub fn prefixes(&self) -> &str {
        &self.prefixes
    }

    pub fn has_prefix(&self, symbol: char) -> bool {
        self.prefixes.contains(symbol)
    }

    /// Add a status symbol; adding one already held is a no-op.
    pub fn add_prefix(&mut self, symbol: char) {
        if !self.has_prefix(symbol) {
            self.prefixes.push(symbol);
        }
    }

    pub fn remove_prefix(&mut self, symbol: char) {
        self.prefixes.retain(|c| c != symbol);
    }

    /// Replace the held symbols, dropping duplicates.
    pub fn set_prefixes(&mut self, symbols: &str) {
        self.prefixes.clear();
        for symbol in symbols.chars() {
            self.add_prefix(symbol);
        }
    }

    /// `user@host`, once learned.
    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    pub fn set_site(&mut self, site: impl Into<String>) {
        self.site = Some(site.into());
    }

    pub fn realname(&self) -> Option<&str> {
        self.realname.as_deref()
    }

    pub fn set_realname(&mut self, realname: impl Into<String>) {
        self.realname = Some(realname.into());
    }

    pub fn server(&self) -> Option<&str> {
        self.server.as_deref()
    }

    pub fn set_server(&mut self, server: impl Into<String>) {
        self.server = Some(server.into());
    }

    pub fn joined_at(&self) -> i64 {
        self.joined_at
    }

    pub fn idle_since(&self) -> i64 {
        self.idle_since
    }

    pub fn set_idle_since(&mut self, ts: i64) {
        self.idle_since = ts;
    }

    /// Arbitrary per-member data left by listeners.
    pub fn tag(&self, key: &str) -> Option<&str> {
        self.tags.get(key).map(String::as_str)
    }

    pub fn set_tag(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.tags.insert(key.into(), value.into());
    }
}
