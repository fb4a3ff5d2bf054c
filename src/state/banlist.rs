//! Channel ban list.

use std::collections::BTreeMap;

use slbnc_proto::CaseKey;

/// A ban mask with who set it and when.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BanEntry {
    pub mask: String,
    pub set_by: String,
    pub set_at: i64,
}

/// Bans keyed case-insensitively by mask.
#[derive(Debug, Clone, Default)]
pub struct Banlist {
    bans: BTreeMap<CaseKey, BanEntry>,
}

impl Banlist {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a ban, replacing any entry with the same mask.
    pub fn set_ban(&mut self, mask: &str, set_by: &str, set_at: i64) {
        self.bans.insert(
            CaseKey::new(mask),
            BanEntry {
                mask: mask.to_string(),
                set_by: set_by.to_string(),
                set_at,
            },
        );
    }

    /// Returns whether the mask was present.
    pub fn unset_ban(&mut self, mask: &str) -> bool {
        self.bans.remove(&CaseKey::new(mask)).is_some()
    }

    pub fn get(&self, mask: &str) -> Option<&BanEntry> {
        self.bans.get(&CaseKey::new(mask))
    }

    pub fn iter(&self) -> impl Iterator<Item = &BanEntry> {
        self.bans.values()
    }

    pub fn len(&self) -> usize {
        self.bans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.bans.is_empty()
    }
}
