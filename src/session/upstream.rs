//! Per-connection state of the upstream IRC link.

use std::collections::BTreeMap;

use slbnc_proto::{Capabilities, CaseKey};

use super::SessionContext;
use crate::flood::{FloodControl, Priority, QueueId};
use crate::state::Channel;

/// Registration progress of an upstream link.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Registration lines sent, nothing heard back yet.
    Connecting,
    /// The server has pinged us at least once.
    Pong,
    /// End of MOTD seen.
    Connected,
}

/// Everything that lives exactly as long as one upstream connection.
#[derive(Debug)]
pub struct Upstream {
    pub(super) state: ConnectionState,
    pub(super) nick: String,
    pub(super) server: Option<String>,
    pub(super) version: Option<String>,
    pub(super) features: Option<String>,
    pub(super) site: Option<String>,
    pub(super) caps: Capabilities,
    pub(super) channels: BTreeMap<CaseKey, Channel>,
    pub(super) flood: FloodControl,
    queues: [QueueId; 3],
    pub(super) last_heard: i64,
    pub(super) next_ping: i64,
    pub(super) join_at: Option<i64>,
    /// Delay before the next connection attempt once this one ends.
    pub(super) reconnect_delay: u64,
}

impl Upstream {
    pub(super) fn new(ctx: &SessionContext, now: i64) -> Self {
        let mut flood = FloodControl::new(now).with_wait(ctx.flood.floodwait);
        // Registration goes out unpaced; pacing starts once the MOTD ends.
        flood.disable();
        let queues = Priority::ALL.map(|p| flood.attach_queue(p.as_u32()));

        Self {
            state: ConnectionState::Connecting,
            nick: ctx.user.nick.clone(),
            server: None,
            version: None,
            features: None,
            site: None,
            caps: Capabilities::new(),
            channels: BTreeMap::new(),
            flood,
            queues,
            last_heard: now,
            next_ping: now.saturating_add(secs(ctx.timeouts.ping_interval)),
            join_at: None,
            reconnect_delay: ctx.reconnect_delay,
        }
    }

    pub fn state(&self) -> ConnectionState {
        self.state
    }

    /// Our nick as the server knows it.
    pub fn nick(&self) -> &str {
        &self.nick
    }

    /// Server name from the 001 prefix, or `"bouncer"` before registration.
    pub fn server(&self) -> &str {
        self.server.as_deref().unwrap_or("bouncer")
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    pub fn features(&self) -> Option<&str> {
        self.features.as_deref()
    }

    /// Our own `user@host`, once learned.
    pub fn site(&self) -> Option<&str> {
        self.site.as_deref()
    }

    pub fn capabilities(&self) -> &Capabilities {
        &self.caps
    }

    pub fn flood(&self) -> &FloodControl {
        &self.flood
    }

    pub fn channel(&self, name: &str) -> Option<&Channel> {
        self.channels.get(&CaseKey::new(name))
    }

    pub(super) fn channel_mut(&mut self, name: &str) -> Option<&mut Channel> {
        self.channels.get_mut(&CaseKey::new(name))
    }

    pub fn is_on_channel(&self, name: &str) -> bool {
        self.channels.contains_key(&CaseKey::new(name))
    }

    /// Tracked channels ordered by folded name.
    pub fn channels(&self) -> impl Iterator<Item = &Channel> {
        self.channels.values()
    }

    pub(super) fn add_channel(&mut self, name: &str) {
        self.channels
            .insert(CaseKey::new(name), Channel::new(name));
    }

    pub(super) fn remove_channel(&mut self, name: &str) -> Option<Channel> {
        self.channels.remove(&CaseKey::new(name))
    }

    pub(super) fn push(&mut self, priority: Priority, line: impl Into<String>) {
        let id = self.queues[priority as usize];
        self.flood.queue_mut(id).push(line);
    }

    pub(super) fn push_next(&mut self, priority: Priority, line: impl Into<String>) {
        let id = self.queues[priority as usize];
        self.flood.queue_mut(id).push_next(line);
    }

    /// Record a `nick!user@host` seen on the wire: our own site when it is
    /// us, and the member's site wherever none is known yet.
    pub(super) fn learn_host(&mut self, hostmask: &str) {
        let Some((nick, site)) = hostmask.split_once('!') else {
            return;
        };
        if slbnc_proto::irc_eq(nick, &self.nick) {
            self.site = Some(site.to_string());
        }
        for channel in self.channels.values_mut() {
            if let Some(member) = channel.member_mut(nick)
                && member.site().is_none()
            {
                member.set_site(site);
            }
        }
    }
}

pub(super) fn secs(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
