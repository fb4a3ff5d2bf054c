//! Channel-related types and state.

use std::collections::BTreeMap;

use slbnc_proto::{Capabilities, CaseKey, ModeChange, ModeClass, irc_eq};
use tracing::trace;

use super::{Banlist, Nick};

/// Channel topic with metadata.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topic {
    pub text: String,
    pub set_by: String,
    pub set_at: i64,
}

/// What the session knows about a channel's topic.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum TopicState {
    /// Nothing heard yet.
    #[default]
    Unknown,
    /// The server said there is no topic (331).
    Unset,
    Set(Topic),
}

impl TopicState {
    pub fn is_known(&self) -> bool {
        !matches!(self, Self::Unknown)
    }

    /// The topic, when one is set and non-empty.
    pub fn topic(&self) -> Option<&Topic> {
        match self {
            Self::Set(topic) if !topic.text.is_empty() => Some(topic),
            _ => None,
        }
    }
}

/// A currently-set channel mode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModeEntry {
    pub mode: char,
    pub param: Option<String>,
}

/// Side effects of a mode change the channel cannot apply itself.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ModeEffects {
    /// We were opped; the mode list must be re-read.
    pub opped: bool,
    /// A channel key was set.
    pub key: Option<String>,
}

/// A channel the session is on.
#[derive(Debug, Clone)]
pub struct Channel {
    name: String,
    created_at: i64,
    /// Set modes in the order they were first seen, one entry per letter.
    modes: Vec<ModeEntry>,
    topic: TopicState,
    members: BTreeMap<CaseKey, Nick>,
    bans: Banlist,
    modes_known: bool,
    names_known: bool,
    bans_known: bool,
}

impl Channel {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            created_at: 0,
            modes: Vec::new(),
            topic: TopicState::Unknown,
            members: BTreeMap::new(),
            bans: Banlist::new(),
            modes_known: false,
            names_known: false,
            bans_known: false,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn created_at(&self) -> i64 {
        self.created_at
    }

    pub fn set_created_at(&mut self, ts: i64) {
        self.created_at = ts;
    }

    // ------------------------------------------------------------------
    // Modes
    // ------------------------------------------------------------------

    pub fn modes(&self) -> &[ModeEntry] {
        &self.modes
    }

    pub fn mode(&self, mode: char) -> Option<&ModeEntry> {
        self.modes.iter().find(|m| m.mode == mode)
    }

    pub fn clear_modes(&mut self) {
        self.modes.clear();
    }

    pub fn modes_known(&self) -> bool {
        self.modes_known
    }

    pub fn set_modes_known(&mut self, known: bool) {
        self.modes_known = known;
    }

    /// Mode string as sent in 324: `+` then letters, then parameters.
    ///
    /// List modes never appear, even if the server advertised them
    /// differently since they were stored.
    pub fn chan_modes(&self, caps: &Capabilities) -> String {
        let shown: Vec<&ModeEntry> = self
            .modes
            .iter()
            .filter(|m| caps.mode_class(m.mode) != ModeClass::List)
            .collect();

        let mut out = String::from("+");
        out.extend(shown.iter().map(|m| m.mode));
        for param in shown.iter().filter_map(|m| m.param.as_deref()) {
            out.push(' ');
            out.push_str(param);
        }
        out
    }

    /// Apply a scanned mode line.
    ///
    /// `source` is the full prefix of whoever set the modes; `own_nick` is
    /// the session's current nick.
    pub fn apply_mode_changes(
        &mut self,
        source: &str,
        changes: &[ModeChange],
        caps: &Capabilities,
        own_nick: Option<&str>,
        now: i64,
    ) -> ModeEffects {
        let mut effects = ModeEffects::default();
        let prefix = caps.prefix();

        for change in changes {
            let param = change.param.as_deref();

            match change.class {
                ModeClass::Prefix => {
                    let (Some(target), Some(symbol)) = (param, prefix.prefix_for_mode(change.mode))
                    else {
                        continue;
                    };
                    if let Some(member) = self.member_mut(target) {
                        if change.adding {
                            member.add_prefix(symbol);
                        } else {
                            member.remove_prefix(symbol);
                        }
                    }
                    if change.adding
                        && change.mode == 'o'
                        && own_nick.is_some_and(|me| irc_eq(me, target))
                    {
                        self.modes_known = false;
                        effects.opped = true;
                    }
                }
                ModeClass::List => {
                    if change.mode == 'b'
                        && let Some(mask) = param
                    {
                        if change.adding {
                            self.bans.set_ban(mask, source, now);
                        } else {
                            self.bans.unset_ban(mask);
                        }
                    }
                }
                _ => {
                    if change.mode == 'k' && change.adding {
                        effects.key = param.map(str::to_string);
                    }
                    if change.adding {
                        self.set_mode(change.mode, change.param.clone());
                    } else {
                        self.modes.retain(|m| m.mode != change.mode);
                    }
                }
            }

            trace!(
                channel = %self.name,
                mode = %change.mode,
                adding = change.adding,
                "Applied mode change"
            );
        }

        effects
    }

    fn set_mode(&mut self, mode: char, param: Option<String>) {
        match self.modes.iter_mut().find(|m| m.mode == mode) {
            Some(entry) => entry.param = param,
            None => self.modes.push(ModeEntry { mode, param }),
        }
    }

    // ------------------------------------------------------------------
    // Topic
    // ------------------------------------------------------------------

    pub fn topic(&self) -> &TopicState {
        &self.topic
    }

    /// Topic text from 332, keeping any setter already known.
    pub fn set_topic_text(&mut self, text: &str) {
        match &mut self.topic {
            TopicState::Set(topic) => topic.text = text.to_string(),
            _ => {
                self.topic = TopicState::Set(Topic {
                    text: text.to_string(),
                    set_by: String::new(),
                    set_at: 0,
                })
            }
        }
    }

    /// Setter and time from 333.
    pub fn set_topic_meta(&mut self, set_by: &str, set_at: i64) {
        match &mut self.topic {
            TopicState::Set(topic) => {
                topic.set_by = set_by.to_string();
                topic.set_at = set_at;
            }
            _ => {
                self.topic = TopicState::Set(Topic {
                    text: String::new(),
                    set_by: set_by.to_string(),
                    set_at,
                })
            }
        }
    }

    pub fn set_topic(&mut self, topic: Topic) {
        self.topic = TopicState::Set(topic);
    }

    pub fn set_no_topic(&mut self) {
        self.topic = TopicState::Unset;
    }

    // ------------------------------------------------------------------
    // Members
    // ------------------------------------------------------------------

    pub fn member(&self, nick: &str) -> Option<&Nick> {
        self.members.get(&CaseKey::new(nick))
    }

    pub fn member_mut(&mut self, nick: &str) -> Option<&mut Nick> {
        self.members.get_mut(&CaseKey::new(nick))
    }

    /// Members ordered by folded nick.
    pub fn members(&self) -> impl Iterator<Item = &Nick> {
        self.members.values()
    }

    pub fn members_mut(&mut self) -> impl Iterator<Item = &mut Nick> {
        self.members.values_mut()
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }

    /// A JOIN: the nick starts over with no status.
    pub fn join(&mut self, nick: &str, now: i64) {
        self.members.insert(CaseKey::new(nick), Nick::new(nick, now));
    }

    /// A NAMES entry: insert the nick or refresh its status symbols.
    pub fn add_names_entry(&mut self, nick: &str, prefixes: &str, now: i64) {
        self.members
            .entry(CaseKey::new(nick))
            .or_insert_with(|| Nick::new(nick, now))
            .set_prefixes(prefixes);
    }

    pub fn remove_member(&mut self, nick: &str) -> Option<Nick> {
        self.members.remove(&CaseKey::new(nick))
    }

    /// Re-key a member under a new nick, keeping everything else.
    pub fn rename_member(&mut self, old: &str, new: &str) -> bool {
        let Some(mut member) = self.members.remove(&CaseKey::new(old)) else {
            return false;
        };
        member.set_name(new);
        self.members.insert(CaseKey::new(new), member);
        true
    }

    pub fn names_known(&self) -> bool {
        self.names_known
    }

    pub fn set_names_known(&mut self) {
        self.names_known = true;
    }

    /// Highest status symbol `nick` holds, by `PREFIX` rank.
    pub fn highest_prefix(&self, nick: &str, caps: &Capabilities) -> Option<char> {
        self.member(nick)
            .and_then(|m| caps.prefix().highest(m.prefixes()))
    }

    // ------------------------------------------------------------------
    // Bans
    // ------------------------------------------------------------------

    pub fn bans(&self) -> &Banlist {
        &self.bans
    }

    pub fn bans_mut(&mut self) -> &mut Banlist {
        &mut self.bans
    }

    pub fn bans_known(&self) -> bool {
        self.bans_known
    }

    pub fn set_bans_known(&mut self) {
        self.bans_known = true;
    }
}
