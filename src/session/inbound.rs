//! Lines from the upstream server.

use slbnc_proto::{irc_eq, numeric, scan_mode_changes, CaseKey, Message};
use tracing::{debug, info, warn};

use super::listener::offer;
use super::upstream::secs;
use super::{ConnectionState, Intercept, Session, KEEPALIVE_TOKEN};
use crate::config::DelayJoin;
use crate::flood::Priority;
use crate::state::Topic;

/// Reconnect delay after an `ERROR` mentioning throttling.
const THROTTLED_RECONNECT_DELAY: u64 = 50;

/// Whether a PRIVMSG/NOTICE body is a CTCP request or reply.
fn is_ctcp(text: &str) -> bool {
    text.starts_with('\x01') || text.ends_with('\x01')
}

impl Session {
    /// Apply one line from the upstream server and forward it to the client
    /// unless it was consumed.
    pub fn handle_server_line(&mut self, line: &str, now: i64) {
        let msg = match line.parse::<Message>() {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, code = e.error_code(), "Dropping server line");
                return;
            }
        };
        let Some(upstream) = self.upstream.as_mut() else {
            debug!("Server line without an upstream link");
            return;
        };
        upstream.last_heard = now;

        if self.route_server_message(&msg, now) {
            self.to_client(line);
        }
    }

    /// Returns whether the line should reach the client.
    fn route_server_message(&mut self, msg: &Message, now: i64) -> bool {
        // These are shown to listeners while the state still has the
        // departing nick or channel in it.
        let early = matches!(msg.command.to_ascii_uppercase().as_str(), "PART" | "KICK" | "QUIT")
            || (msg.numeric() == Some(numeric::ERR_NICKNAMEINUSE) && self.client.is_none());

        if early && offer(&mut self.listeners, |l| l.intercept_server(msg)) == Intercept::Claim {
            return false;
        }

        if !self.apply_server_message(msg, now) {
            return false;
        }

        if !early && offer(&mut self.listeners, |l| l.intercept_server(msg)) == Intercept::Claim {
            return false;
        }

        if msg.is("PING") {
            let token = msg.param(0).unwrap_or_default();
            if let Some(upstream) = self.upstream.as_mut() {
                upstream.push_next(Priority::High, format!("PONG :{token}"));
                if upstream.state != ConnectionState::Connected {
                    upstream.state = ConnectionState::Pong;
                }
            }
            return false;
        }

        true
    }

    /// Update tracked state. Returns `false` for lines that must go no
    /// further.
    fn apply_server_message(&mut self, msg: &Message, now: i64) -> bool {
        if let Some(code) = msg.numeric() {
            self.apply_numeric(code, msg, now);
            return true;
        }

        let Some(upstream) = self.upstream.as_mut() else {
            return false;
        };
        let source = msg.prefix.as_deref().unwrap_or_default();
        let from_me = msg.source_nick().is_some_and(|nick| irc_eq(nick, &upstream.nick));
        let p = &msg.params;

        match msg.command.to_ascii_uppercase().as_str() {
            "PRIVMSG" | "NOTICE" if p.len() >= 2 => {
                let nick = msg.source_nick().unwrap_or_default();
                let (target, text) = (&p[0], &p[1]);
                let to_me = irc_eq(target, &upstream.nick) && !irc_eq(nick, &upstream.nick);

                if msg.is("PRIVMSG") {
                    if let Some(member) = upstream
                        .channel_mut(target)
                        .and_then(|chan| chan.member_mut(nick))
                    {
                        member.set_idle_since(now);
                    }
                    upstream.learn_host(source);
                }

                if self.client.is_none() && to_me && !is_ctcp(text) {
                    let entry = if msg.is("PRIVMSG") {
                        let site = msg.source_site().unwrap_or("<unknown host>");
                        format!("{nick} ({site}): {text}")
                    } else {
                        format!("{source} (notice): {text}")
                    };
                    self.log_event(&entry, now);
                }
            }
            "JOIN" if !p.is_empty() => {
                let channel = &p[0];
                if from_me {
                    upstream.add_channel(channel);
                    if self.client.is_none() {
                        upstream.push(Priority::High, format!("MODE {channel}"));
                    }
                    debug!(%channel, "Joined channel");
                }
                if let Some(chan) = upstream.channel_mut(channel) {
                    chan.join(msg.source_nick().unwrap_or_default(), now);
                }
                upstream.learn_host(source);
                if from_me {
                    self.sync_channel_list();
                }
            }
            "PART" if !p.is_empty() => {
                let channel = &p[0];
                if from_me {
                    upstream.remove_channel(channel);
                    debug!(%channel, "Left channel");
                } else if let Some(chan) = upstream.channel_mut(channel) {
                    chan.remove_member(msg.source_nick().unwrap_or_default());
                }
                upstream.learn_host(source);
                if from_me {
                    self.sync_channel_list();
                }
            }
            "KICK" if p.len() >= 2 => {
                let (channel, victim) = (&p[0], &p[1]);
                upstream.learn_host(source);
                if irc_eq(victim, &upstream.nick) {
                    upstream.remove_channel(channel);
                    info!(%channel, by = %source, "Kicked from channel");
                    self.sync_channel_list();

                    if self.client.is_none() {
                        let rejoin = Message::new("JOIN", vec![channel.clone()]);
                        self.dispatch_client(&rejoin);

                        let (nick, host) = source.split_once('!').unwrap_or((source, ""));
                        let reason = p.get(2).map(String::as_str).unwrap_or_default();
                        self.log_event(
                            &format!("{nick} ({host}) kicked you from {channel} ({reason})"),
                            now,
                        );
                    }
                } else if let Some(chan) = upstream.channel_mut(channel) {
                    chan.remove_member(victim);
                }
            }
            "NICK" if !p.is_empty() => {
                let old = msg.source_nick().unwrap_or_default();
                let new = &p[0];
                if from_me {
                    upstream.nick = new.clone();
                    if let Some(client) = self.client.as_mut()
                        && irc_eq(&client.nick, old)
                    {
                        client.nick = new.clone();
                    }
                }
                for chan in upstream.channels.values_mut() {
                    chan.rename_member(old, new);
                }
            }
            "QUIT" => {
                let nick = msg.source_nick().unwrap_or_default();
                for chan in upstream.channels.values_mut() {
                    chan.remove_member(nick);
                }
            }
            "MODE" if p.len() >= 2 => {
                upstream.learn_host(source);
                self.apply_channel_modes(&p[0], source, &p[1], &p[2..], now);
            }
            "TOPIC" if p.len() >= 2 => {
                if let Some(chan) = upstream.channel_mut(&p[0]) {
                    chan.set_topic(Topic {
                        text: p[1].clone(),
                        set_by: source.to_string(),
                        set_at: now,
                    });
                }
                upstream.learn_host(source);
            }
            "ERROR" => {
                let text = p.first().map(String::as_str).unwrap_or_default();
                if text.contains("throttle") {
                    upstream.reconnect_delay = THROTTLED_RECONNECT_DELAY;
                }
                warn!(error = %text, "Upstream sent ERROR");
                let entry = format!("Error received for {}: {text}", self.ctx.username);
                self.notice_or_log(&entry, now);
            }
            "PONG" if p.len() >= 2 && p[1].eq_ignore_ascii_case(KEEPALIVE_TOKEN) => {
                return false;
            }
            _ => {}
        }

        true
    }

    fn apply_numeric(&mut self, code: u16, msg: &Message, now: i64) {
        let Some(upstream) = self.upstream.as_mut() else {
            return;
        };
        let p = &msg.params;
        let at = |i: usize| p.get(i).map(String::as_str);
        let number = |i: usize| at(i).and_then(|s| s.parse::<i64>().ok()).unwrap_or(0);

        match code {
            numeric::RPL_WELCOME if !p.is_empty() => {
                let nick = &p[0];
                if let Some(client) = self.client.as_mut()
                    && client.nick != *nick
                {
                    let line = format!(
                        ":{}!{}@slbnc NICK :{nick}",
                        client.nick, self.ctx.username
                    );
                    client.nick = nick.clone();
                    self.outputs.push_back(super::Output::ToClient(line));
                }
                upstream.nick = nick.clone();
                upstream.server = msg.prefix.clone();
                info!(nick = %nick, server = %upstream.server(), "Registered with upstream");
            }
            numeric::RPL_ISUPPORT if p.len() >= 2 => {
                upstream.caps.apply_isupport(p);
            }
            numeric::RPL_ENDOFMOTD | numeric::ERR_NOMOTD => {
                self.end_of_motd(now);
            }
            numeric::ERR_NICKNAMEINUSE if self.client.is_none() => {
                if let Some(taken) = at(1) {
                    upstream.push(Priority::High, format!("NICK :{taken}_"));
                }
            }
            numeric::ERR_YOUREBANNEDCREEP if p.len() >= 2 => {
                let entry = format!("G/K-line reason for {}: {}", self.ctx.username, p[1]);
                warn!(reason = %p[1], "Banned from upstream");
                self.notice_or_log(&entry, now);
            }
            numeric::RPL_VERSION if p.len() >= 4 => {
                upstream.version = Some(p[1].clone());
                upstream.features = Some(p[3].clone());
            }
            numeric::RPL_CHANNELMODEIS if p.len() >= 3 => {
                let channel = p[1].clone();
                if let Some(chan) = upstream.channel_mut(&channel) {
                    chan.clear_modes();
                }
                self.apply_channel_modes(&channel, msg.prefix.as_deref().unwrap_or_default(), &p[2], &p[3..], now);
                if let Some(chan) = self.upstream.as_mut().and_then(|up| up.channel_mut(&channel)) {
                    chan.set_modes_known(true);
                }
            }
            numeric::RPL_CREATIONTIME if p.len() >= 3 => {
                if let Some(chan) = upstream.channel_mut(&p[1]) {
                    chan.set_created_at(number(2));
                }
            }
            numeric::RPL_NOTOPIC if p.len() >= 2 => {
                if let Some(chan) = upstream.channel_mut(&p[1]) {
                    chan.set_no_topic();
                }
            }
            numeric::RPL_TOPIC if p.len() >= 3 => {
                if let Some(chan) = upstream.channel_mut(&p[1]) {
                    chan.set_topic_text(&p[2]);
                }
            }
            numeric::RPL_TOPICWHOTIME if p.len() >= 4 => {
                let set_at = number(3);
                if let Some(chan) = upstream.channel_mut(&p[1]) {
                    chan.set_topic_meta(&p[2], set_at);
                }
            }
            numeric::RPL_NAMREPLY if p.len() >= 4 => {
                let Some(chan) = upstream.channels.get_mut(&CaseKey::new(&p[2])) else {
                    return;
                };
                let prefix = upstream.caps.prefix();
                for token in p[3].split(' ').filter(|t| !t.is_empty()) {
                    let name = token.trim_start_matches(|c: char| prefix.is_prefix_symbol(c));
                    let symbols = &token[..token.len() - name.len()];
                    chan.add_names_entry(name, symbols, now);
                }
            }
            numeric::RPL_ENDOFNAMES if p.len() >= 2 => {
                if let Some(chan) = upstream.channel_mut(&p[1]) {
                    chan.set_names_known();
                }
            }
            numeric::RPL_WHOREPLY if p.len() >= 8 => {
                let (ident, host, server, nick) = (&p[2], &p[3], &p[4], &p[5]);
                let realname = p[7].split_once(' ').map_or("", |(_, name)| name);
                let site = format!("{ident}@{host}");
                if irc_eq(nick, &upstream.nick) {
                    upstream.site = Some(site.clone());
                }
                for chan in upstream.channels.values_mut() {
                    if let Some(member) = chan.member_mut(nick) {
                        member.set_site(site.as_str());
                        member.set_server(server.as_str());
                        member.set_realname(realname);
                    }
                }
            }
            numeric::RPL_BANLIST if p.len() >= 5 => {
                let set_at = number(4);
                if let Some(chan) = upstream.channel_mut(&p[1]) {
                    chan.bans_mut().set_ban(&p[2], &p[3], set_at);
                }
            }
            numeric::RPL_ENDOFBANLIST if p.len() >= 2 => {
                if let Some(chan) = upstream.channel_mut(&p[1]) {
                    chan.set_bans_known();
                }
            }
            numeric::RPL_HOSTHIDDEN if p.len() >= 2 => {
                upstream.site = Some(p[1].clone());
            }
            _ => {}
        }
    }

    /// Scan and apply a channel mode string, then tell listeners about each
    /// change. Unknown channels are ignored.
    fn apply_channel_modes(
        &mut self,
        channel: &str,
        source: &str,
        modes: &str,
        args: &[String],
        now: i64,
    ) {
        let Some(upstream) = self.upstream.as_mut() else {
            return;
        };
        let Some(chan) = upstream.channels.get_mut(&CaseKey::new(channel)) else {
            return;
        };

        let changes = scan_mode_changes(modes, args, &upstream.caps);
        let effects = chan.apply_mode_changes(source, &changes, &upstream.caps, Some(&upstream.nick), now);

        if let Some(key) = &effects.key {
            self.keyring.add_key(channel, key);
        }
        if effects.opped && self.client.is_none() {
            upstream.push(Priority::High, format!("MODE {channel}"));
        }

        for change in &changes {
            for listener in &mut self.listeners {
                listener.on_single_mode_change(channel, source, change);
            }
        }
    }

    /// End of MOTD: auto-join, logon notices, and the away/automodes burst.
    fn end_of_motd(&mut self, now: i64) {
        let delay_join = secs(self.ctx.timeouts.delay_join);
        match self.ctx.user.delay_join {
            DelayJoin::Immediate => self.join_channels(),
            DelayJoin::Delayed => {
                if let Some(upstream) = self.upstream.as_mut() {
                    upstream.join_at = Some(now.saturating_add(delay_join));
                }
            }
            DelayJoin::Never => {}
        }

        let Some(upstream) = self.upstream.as_mut() else {
            return;
        };
        let first_logon = upstream.state != ConnectionState::Connected;
        upstream.state = ConnectionState::Connected;
        let nick = upstream.nick.clone();

        if first_logon {
            if self.ctx.flood.control {
                upstream.flood.enable();
            }
            let server = upstream.server().to_string();
            for listener in &mut self.listeners {
                listener.on_server_logon(&server);
            }
            info!(user = %self.ctx.username, %server, "Connected to an IRC server");
            self.notice("Connected to an IRC server.");
        }

        if self.client.is_none()
            && let Some(away) = self.away_text()
        {
            let line = if self.ctx.user.away_timestamp {
                format!("AWAY :{away} (Away since the dawn of time)")
            } else {
                format!("AWAY :{away}")
            };
            self.queue_line(Priority::High, line);
        }

        let automodes = &self.ctx.user.automodes;
        if !automodes.is_empty() {
            let line = format!("MODE {nick} +{automodes}");
            self.queue_line(Priority::High, line);
        }
        let dropmodes = &self.ctx.user.dropmodes;
        if self.client.is_none() && !dropmodes.is_empty() {
            let line = format!("MODE {nick} -{dropmodes}");
            self.queue_line(Priority::High, line);
        }
    }
}
