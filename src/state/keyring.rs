//! Channel keys learned from `+k` and client JOINs.

use std::collections::HashMap;

use slbnc_proto::CaseKey;

#[derive(Debug, Clone, Default)]
pub struct Keyring {
    keys: HashMap<CaseKey, String>,
}

impl Keyring {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_key(&mut self, channel: &str, key: &str) {
        self.keys.insert(CaseKey::new(channel), key.to_string());
    }

    pub fn get_key(&self, channel: &str) -> Option<&str> {
        self.keys.get(&CaseKey::new(channel)).map(String::as_str)
    }

    pub fn remove_key(&mut self, channel: &str) {
        self.keys.remove(&CaseKey::new(channel));
    }
}

impl<K: AsRef<str>, V: AsRef<str>> FromIterator<(K, V)> for Keyring {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut keyring = Self::new();
        for (channel, key) in iter {
            keyring.add_key(channel.as_ref(), key.as_ref());
        }
        keyring
    }
}
