//! The relay core: one upstream IRC session and the client attached to it.
//!
//! A [`Session`] owns no sockets and reads no clock. The driver hands it
//! complete lines and the current time, then drains [`Output`]s:
//!
//! - [`Session::handle_server_line`] / [`Session::handle_client_line`]
//! - [`Session::attach`] / [`Session::detach`]
//! - [`Session::enqueue`] for lines originating elsewhere
//! - [`Session::tick`], which releases at most one upstream line per call
//!
//! Connection lifecycle is reported back through
//! [`Session::upstream_connected`], [`Session::connect_failed`] and
//! [`Session::upstream_closed`].

mod attach;
mod client;
mod inbound;
mod listener;
mod synth;
mod upstream;

pub use listener::{Intercept, Listener};
pub use upstream::{ConnectionState, Upstream};

use std::collections::VecDeque;

use chrono::{DateTime, Local};
use tracing::{debug, info, trace, warn};

use crate::config::{Config, FloodConfig, TimeoutsConfig, UserConfig};
use crate::error::SessionError;
use crate::flood::{OutputQueue, Priority};
use crate::state::Keyring;
use upstream::secs;

/// Token carried by our own keepalive PINGs; matching PONGs are swallowed.
pub const KEEPALIVE_TOKEN: &str = "sbnc";

/// Entries kept in the offline log; the oldest go first.
pub const OFFLINE_LOG_LIMIT: usize = 512;

/// Source of notices the bouncer sends on its own behalf.
pub const NOTICE_SOURCE: &str = "-slbnc!bouncer@slbnc";

/// Something the driver must do on the session's behalf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Output {
    /// Write a line to the upstream server.
    ToServer(String),
    /// Write a line to the attached client.
    ToClient(String),
    /// Open a new upstream connection.
    Connect,
    /// Close the upstream connection.
    CloseUpstream(String),
    /// Close the client connection.
    CloseClient(String),
}

/// Per-session settings, passed in rather than looked up.
#[derive(Debug, Clone)]
pub struct SessionContext {
    /// Account name; the ident in synthetic hostmasks.
    pub username: String,
    pub server: String,
    pub port: u16,
    pub upstream_password: Option<String>,
    pub user: UserConfig,
    pub flood: FloodConfig,
    pub timeouts: TimeoutsConfig,
    pub reconnect_delay: u64,
    pub reconnect_throttle: u64,
}

impl SessionContext {
    pub fn from_config(config: &Config) -> Self {
        Self {
            username: config.bouncer.username.clone(),
            server: config.upstream.server.clone(),
            port: config.upstream.port,
            upstream_password: config.upstream.password.clone(),
            user: config.user.clone(),
            flood: config.flood.clone(),
            timeouts: config.timeouts.clone(),
            reconnect_delay: config.upstream.reconnect_delay,
            reconnect_throttle: config.upstream.reconnect_throttle,
        }
    }
}

/// The attached client.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientInfo {
    /// Nick the client believes it has.
    pub nick: String,
    pub peer_host: String,
}

/// One bouncer session.
pub struct Session {
    ctx: SessionContext,
    upstream: Option<Upstream>,
    client: Option<ClientInfo>,
    listeners: Vec<Box<dyn Listener>>,
    keyring: Keyring,
    /// Channels to join after connecting, kept in step with joins and parts.
    channel_list: Vec<String>,
    offline_log: Vec<String>,
    /// Away text from a client QUIT, overriding the configured one.
    away_text: Option<String>,
    reconnect_at: Option<i64>,
    last_reconnect: Option<i64>,
    outputs: VecDeque<Output>,
}

impl Session {
    /// A detached, unconnected session. The first [`Session::tick`] asks the
    /// driver to connect.
    pub fn new(ctx: SessionContext, now: i64) -> Self {
        let keyring = ctx.user.keys.iter().collect();
        let channel_list = ctx.user.channels.clone();
        Self {
            ctx,
            upstream: None,
            client: None,
            listeners: Vec::new(),
            keyring,
            channel_list,
            offline_log: Vec::new(),
            away_text: None,
            reconnect_at: Some(now),
            last_reconnect: None,
            outputs: VecDeque::new(),
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn upstream(&self) -> Option<&Upstream> {
        self.upstream.as_ref()
    }

    pub fn client(&self) -> Option<&ClientInfo> {
        self.client.as_ref()
    }

    pub fn has_client(&self) -> bool {
        self.client.is_some()
    }

    /// Our nick on the server, or the configured one while disconnected.
    pub fn current_nick(&self) -> &str {
        self.upstream
            .as_ref()
            .map_or(self.ctx.user.nick.as_str(), |up| up.nick())
    }

    pub fn keyring(&self) -> &Keyring {
        &self.keyring
    }

    /// Channels the session rejoins on connect.
    pub fn channel_list(&self) -> &[String] {
        &self.channel_list
    }

    pub fn offline_log(&self) -> &[String] {
        &self.offline_log
    }

    /// Hand over and clear the messages logged while detached.
    pub fn take_offline_log(&mut self) -> Vec<String> {
        std::mem::take(&mut self.offline_log)
    }

    /// Away text used while detached.
    pub fn away_text(&self) -> Option<&str> {
        self.away_text.as_deref().or(self.ctx.user.away.as_deref())
    }

    /// When the next connection attempt is due, if one is scheduled.
    pub fn reconnect_at(&self) -> Option<i64> {
        self.reconnect_at
    }

    pub fn add_listener(&mut self, listener: Box<dyn Listener>) {
        self.listeners.push(listener);
    }

    pub fn poll_output(&mut self) -> Option<Output> {
        self.outputs.pop_front()
    }

    pub fn drain_outputs(&mut self) -> impl Iterator<Item = Output> + '_ {
        self.outputs.drain(..)
    }

    /// Queue a line for the upstream server at `priority`.
    pub fn enqueue(&mut self, priority: Priority, line: impl Into<String>) -> Result<(), SessionError> {
        let upstream = self.upstream.as_mut().ok_or(SessionError::NoUpstream)?;
        upstream.push(priority, line);
        Ok(())
    }

    // ========================================================================
    // Connection lifecycle
    // ========================================================================

    /// The driver opened the upstream socket: register.
    pub fn upstream_connected(&mut self, now: i64) {
        if self.upstream.is_some() {
            warn!("Upstream connected while a link already exists; keeping the old one");
            return;
        }

        let mut upstream = Upstream::new(&self.ctx, now);
        if let Some(password) = &self.ctx.upstream_password {
            upstream.push(Priority::High, format!("PASS :{password}"));
        }
        upstream.push(Priority::High, format!("NICK {}", self.ctx.user.nick));
        upstream.push(
            Priority::High,
            format!(
                "USER {} \"\" \"fnords\" :{}",
                self.ctx.username, self.ctx.user.realname
            ),
        );

        self.upstream = Some(upstream);
        self.reconnect_at = None;
        self.last_reconnect = Some(now);
        info!(server = %self.ctx.server, port = self.ctx.port, "Upstream connected, registering");
    }

    /// The driver could not open the upstream socket.
    pub fn connect_failed(&mut self, reason: &str, now: i64) {
        warn!(server = %self.ctx.server, reason, "Can't connect to upstream");
        self.notice(&format!("Can't connect: {reason}"));
        self.schedule_reconnect(self.ctx.reconnect_delay, now);
    }

    /// The upstream socket is gone. Stops all pacing and queued writes,
    /// forgets per-connection state, and schedules the next attempt.
    pub fn upstream_closed(&mut self, reason: &str, now: i64) {
        let Some(mut upstream) = self.upstream.take() else {
            return;
        };
        upstream.flood.disable();
        upstream.flood.flush();
        let delay = upstream.reconnect_delay;
        drop(upstream);

        info!(reason, "Upstream connection closed");
        self.notice("Disconnected from the server.");
        if self.client.is_none() {
            self.log_event("Disconnected from the server.", now);
        }
        for listener in &mut self.listeners {
            listener.on_server_disconnect(reason);
        }
        self.schedule_reconnect(delay, now);
    }

    /// Arrange a connection attempt `delay` seconds from now.
    ///
    /// Ignored while connected. Attempts are spaced at least
    /// `reconnect_throttle` apart, and an already scheduled attempt is only
    /// ever pushed later, never earlier.
    pub fn schedule_reconnect(&mut self, delay: u64, now: i64) {
        if self.upstream.is_some() {
            return;
        }

        let throttle = secs(self.ctx.reconnect_throttle);
        let mut delay = secs(delay);
        if let Some(last) = self.last_reconnect
            && now - last < throttle
            && delay < throttle
        {
            delay = throttle;
        }

        let at = now.saturating_add(delay);
        if self.reconnect_at.is_none_or(|current| current < at) {
            debug!(at, delay, "Reconnect scheduled");
            self.reconnect_at = Some(at);
        }
    }

    /// Advance timers and release at most one line upstream.
    pub fn tick(&mut self, now: i64) {
        if self.upstream.is_none() {
            if self.reconnect_at.is_some_and(|at| at <= now) {
                self.reconnect_at = None;
                self.last_reconnect = Some(now);
                let target = format!("{}:{}", self.ctx.server, self.ctx.port);
                info!(%target, "Connecting to upstream");
                self.notice(&format!("Trying to reconnect to {target}"));
                self.outputs.push_back(Output::Connect);
            }
            return;
        }

        let liveness = secs(self.ctx.timeouts.liveness);
        let ping_interval = secs(self.ctx.timeouts.ping_interval);
        let mut join_due = false;

        if let Some(upstream) = self.upstream.as_mut() {
            if now - upstream.last_heard > liveness {
                let reason = "Ping timeout";
                warn!(silent_for = now - upstream.last_heard, "Upstream timed out");
                self.outputs.push_back(Output::CloseUpstream(reason.to_string()));
                self.upstream_closed(reason, now);
                return;
            }

            if now >= upstream.next_ping {
                upstream.push(Priority::High, format!("PING :{KEEPALIVE_TOKEN}"));
                upstream.next_ping = now.saturating_add(ping_interval);
            }

            join_due = upstream.join_at.is_some_and(|at| at <= now);
        }

        if join_due {
            self.join_channels();
        }

        if let Some(upstream) = self.upstream.as_mut() {
            upstream.flood.tick(now);
            if let Some(line) = upstream.flood.dequeue_item() {
                trace!(%line, bytes = upstream.flood.bytes(), "Upstream write");
                self.outputs.push_back(Output::ToServer(line));
            }
        }
    }

    // ========================================================================
    // Helpers
    // ========================================================================

    fn to_client(&mut self, line: impl Into<String>) {
        if self.client.is_some() {
            self.outputs.push_back(Output::ToClient(line.into()));
        }
    }

    /// Bouncer notice to the attached client, if any.
    fn notice(&mut self, text: &str) {
        if let Some(client) = &self.client {
            let line = format!(":{NOTICE_SOURCE} NOTICE {} :{text}", client.nick);
            self.outputs.push_back(Output::ToClient(line));
        }
    }

    /// Append to the offline log, evicting the oldest entry at
    /// [`OFFLINE_LOG_LIMIT`].
    fn log_event(&mut self, text: &str, now: i64) {
        let stamp = DateTime::from_timestamp(now, 0)
            .map(|t| t.with_timezone(&Local).format("%Y-%m-%d %H:%M:%S").to_string())
            .unwrap_or_default();
        debug!(%text, "Offline log entry");
        if self.offline_log.len() >= OFFLINE_LOG_LIMIT {
            self.offline_log.remove(0);
        }
        self.offline_log.push(format!("[{stamp}] {text}"));
    }

    /// Notice when attached, offline log when not.
    fn notice_or_log(&mut self, text: &str, now: i64) {
        if self.client.is_some() {
            self.notice(text);
        } else {
            self.log_event(text, now);
        }
    }

    /// Queue upstream, dropping the line when there is no link.
    fn queue_line(&mut self, priority: Priority, line: impl Into<String>) {
        match self.upstream.as_mut() {
            Some(upstream) => upstream.push(priority, line),
            None => debug!(line = %line.into(), "No upstream link, dropping line"),
        }
    }

    fn sync_channel_list(&mut self) {
        if let Some(upstream) = &self.upstream {
            self.channel_list = upstream.channels().map(|c| c.name().to_string()).collect();
        }
    }

    /// Join the configured channels: keyed ones one by one, the rest in
    /// comma lists of about 400 bytes.
    fn join_channels(&mut self) {
        if let Some(upstream) = self.upstream.as_mut() {
            upstream.join_at = None;
        }

        let mut lines = Vec::new();
        let mut batch: Option<String> = None;
        for channel in &self.channel_list {
            if let Some(key) = self.keyring.get_key(channel) {
                lines.push(format!("JOIN {channel} {key}"));
                continue;
            }
            let extend = batch.as_ref().is_some_and(|list| list.len() <= 400);
            if extend {
                if let Some(list) = batch.as_mut() {
                    list.push(',');
                    list.push_str(channel);
                }
            } else if let Some(full) = batch.replace(channel.clone()) {
                lines.push(format!("JOIN {full}"));
            }
        }
        if let Some(list) = batch {
            lines.push(format!("JOIN {list}"));
        }

        debug!(count = lines.len(), "Joining channels");
        for line in lines {
            self.queue_line(Priority::High, line);
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn context() -> SessionContext {
        let config = Config::parse(
            r##"
            [bouncer]
            username = "bob"
            password = "secret"

            [upstream]
            server = "irc.example.net"

            [user]
            nick = "bob"
            channels = ["#test"]
            "##,
        )
        .unwrap();
        SessionContext::from_config(&config)
    }

    #[test]
    fn test_first_tick_connects() {
        let mut session = Session::new(context(), 1000);
        session.tick(1000);
        assert_eq!(session.poll_output(), Some(Output::Connect));
        assert_eq!(session.reconnect_at(), None);
    }

    #[test]
    fn test_registration_lines() {
        let mut ctx = context();
        ctx.upstream_password = Some("serverpass".into());
        let mut session = Session::new(ctx, 0);
        session.upstream_connected(0);

        let mut sent = Vec::new();
        for t in 0..3 {
            session.tick(t);
            sent.extend(session.drain_outputs());
        }
        assert_eq!(
            sent,
            vec![
                Output::ToServer("PASS :serverpass".into()),
                Output::ToServer("NICK bob".into()),
                Output::ToServer("USER bob \"\" \"fnords\" :slbnc user".into()),
            ]
        );
    }

    #[test]
    fn test_enqueue_without_upstream() {
        let mut session = Session::new(context(), 0);
        let err = session.enqueue(Priority::Middle, "PRIVMSG #a :hi").unwrap_err();
        assert_eq!(err.error_code(), "no_upstream");
    }

    #[test]
    fn test_reconnect_throttle() {
        let mut session = Session::new(context(), 0);
        session.tick(0);
        session.upstream_connected(0);
        session.upstream_closed("Connection reset", 10);

        // Only 10s since the last attempt: wait out the throttle.
        assert_eq!(session.reconnect_at(), Some(130));

        // An earlier request never pulls the attempt forward.
        session.schedule_reconnect(0, 125);
        assert_eq!(session.reconnect_at(), Some(130));

        // A later one does push it back.
        session.schedule_reconnect(50, 100);
        assert_eq!(session.reconnect_at(), Some(220));
    }

    #[test]
    fn test_reconnect_ignored_while_connected() {
        let mut session = Session::new(context(), 0);
        session.tick(0);
        session.upstream_connected(0);
        session.schedule_reconnect(0, 5);
        assert_eq!(session.reconnect_at(), None);
    }

    #[test]
    fn test_keepalive_ping() {
        let mut session = Session::new(context(), 0);
        session.upstream_connected(0);
        for t in 0..3 {
            session.tick(t);
        }
        session.drain_outputs().for_each(drop);

        session.handle_server_line(":irc.example.net NOTICE bob :still here", 179);
        session.tick(180);
        assert_eq!(
            session.poll_output(),
            Some(Output::ToServer("PING :sbnc".into()))
        );
    }

    #[test]
    fn test_liveness_timeout_closes_upstream() {
        let mut session = Session::new(context(), 0);
        session.upstream_connected(0);
        session.tick(301);

        assert_eq!(
            session.poll_output(),
            Some(Output::CloseUpstream("Ping timeout".into()))
        );
        assert!(session.upstream().is_none());
        assert_eq!(session.offline_log().len(), 1);
        assert!(session.offline_log()[0].ends_with("Disconnected from the server."));
        assert!(session.reconnect_at().is_some());
    }

    #[test]
    fn test_offline_log_is_capped() {
        let mut session = Session::new(context(), 0);
        for i in 0..OFFLINE_LOG_LIMIT + 10 {
            session.log_event(&format!("event {i}"), 0);
        }

        let log = session.offline_log();
        assert_eq!(log.len(), OFFLINE_LOG_LIMIT);
        assert!(log[0].ends_with("event 10"));
        assert!(log[OFFLINE_LOG_LIMIT - 1].ends_with(&format!("event {}", OFFLINE_LOG_LIMIT + 9)));
    }

    #[test]
    fn test_join_batching_and_keys() {
        let mut ctx = context();
        ctx.user.channels = vec!["#a".into(), "#secret".into(), "#b".into()];
        ctx.user.keys.insert("#secret".into(), "hunter2".into());
        let mut session = Session::new(ctx, 0);
        session.upstream_connected(0);
        session.join_channels();

        let mut sent = Vec::new();
        for t in 0..6 {
            session.tick(t);
            sent.extend(session.drain_outputs().filter_map(|o| match o {
                Output::ToServer(line) if line.starts_with("JOIN") => Some(line),
                _ => None,
            }));
        }
        assert_eq!(sent, vec!["JOIN #secret hunter2", "JOIN #a,#b"]);
    }
}
