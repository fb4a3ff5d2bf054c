//! Client attach and detach.

use chrono::{DateTime, Local};
use tracing::info;

use super::{ClientInfo, Output, Session};
use crate::flood::Priority;

impl Session {
    /// A registered client takes over the session.
    ///
    /// A client already attached is disconnected. With an upstream link the
    /// new client is walked through a synthetic welcome, then a JOIN, topic
    /// and member list for every tracked channel. Without one, a connection
    /// attempt is scheduled instead.
    pub fn attach(&mut self, nick: &str, peer_host: &str, now: i64) {
        if self.client.take().is_some() {
            info!(user = %self.ctx.username, "Seamless transition to a new client");
            self.outputs.push_back(Output::CloseClient(
                "Another client has connected.".to_string(),
            ));
            for listener in &mut self.listeners {
                listener.on_detach();
            }
        }

        self.client = Some(ClientInfo {
            nick: nick.to_string(),
            peer_host: peer_host.to_string(),
        });
        info!(user = %self.ctx.username, %nick, peer = %peer_host, "Client attached");
        for listener in &mut self.listeners {
            listener.on_attach(nick);
        }

        let Some(upstream) = self.upstream.as_ref() else {
            self.schedule_reconnect(0, now);
            self.announce_offline_log();
            return;
        };
        let current = upstream.nick().to_string();
        let server = upstream.server().to_string();
        let channels: Vec<String> = upstream.channels().map(|c| c.name().to_string()).collect();
        let ident = self.ctx.username.clone();

        self.queue_line(Priority::High, "AWAY");
        if !self.ctx.user.automodes.is_empty() {
            let line = format!("MODE {current} +{}", self.ctx.user.automodes);
            self.queue_line(Priority::High, line);
        }

        if nick != current {
            self.to_client(format!(":{nick}!{ident}@{peer_host} NICK :{current}"));
            self.queue_line(Priority::High, format!("NICK :{nick}"));
            if let Some(client) = self.client.as_mut() {
                client.nick = current.clone();
            }
        }

        self.to_client(format!(
            ":{server} 001 {current} :Welcome to the Internet Relay Network {current}"
        ));
        self.to_client(format!(":{server} 422 {current} :MOTD File is missing"));
        self.synth(&["version".to_string()]);

        for channel in channels {
            self.to_client(format!(":{current}!{ident}@{peer_host} JOIN {channel}"));
            self.synth(&["topic".to_string(), channel.clone()]);
            self.synth(&["names".to_string(), channel]);
        }

        self.announce_offline_log();
    }

    /// The client went away; the session stays up.
    pub fn detach(&mut self, now: i64) {
        let Some(client) = self.client.take() else {
            return;
        };
        info!(user = %self.ctx.username, nick = %client.nick, "Client detached");
        for listener in &mut self.listeners {
            listener.on_detach();
        }

        let Some(upstream) = self.upstream.as_ref() else {
            return;
        };
        let current = upstream.nick().to_string();

        if !self.ctx.user.dropmodes.is_empty() {
            let line = format!("MODE {current} -{}", self.ctx.user.dropmodes);
            self.queue_line(Priority::High, line);
        }
        if let Some(awaynick) = self.ctx.user.awaynick.clone() {
            self.queue_line(Priority::High, format!("NICK {awaynick}"));
        }
        if let Some(away) = self.away_text().map(str::to_string) {
            let line = if self.ctx.user.away_timestamp {
                let since = DateTime::from_timestamp(now, 0)
                    .map(|t| t.with_timezone(&Local).format("%c").to_string())
                    .unwrap_or_default();
                format!("AWAY :{away} (Away since {since})")
            } else {
                format!("AWAY :{away}")
            };
            self.queue_line(Priority::High, line);
        }
    }

    fn announce_offline_log(&mut self) {
        if !self.offline_log.is_empty() {
            self.notice("You have new messages.");
        }
    }
}
