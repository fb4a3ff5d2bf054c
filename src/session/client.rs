//! Lines from the attached client.

use slbnc_proto::Message;
use tracing::debug;

use super::listener::offer;
use super::{Intercept, Output, Session};
use crate::flood::Priority;

/// Pseudo-nick answering for the bouncer itself.
const BOUNCER_NICK: &str = "-slbnc";

impl Session {
    /// Handle one line from the attached client.
    pub fn handle_client_line(&mut self, line: &str, now: i64) {
        let msg = match line.parse::<Message>() {
            Ok(msg) => msg,
            Err(e) => {
                debug!(error = %e, code = e.error_code(), "Dropping client line");
                return;
            }
        };
        if self.client.is_none() {
            debug!("Client line without an attached client");
            return;
        }

        if offer(&mut self.listeners, |l| l.intercept_client(&msg)) == Intercept::Claim {
            return;
        }

        if msg.is("QUIT") {
            if self.ctx.user.quit_as_away
                && let Some(reason) = msg.param(0).filter(|r| !r.is_empty())
            {
                self.away_text = Some(reason.to_string());
            }
            self.outputs.push_back(Output::CloseClient(
                "*** Thanks for flying with slbnc".to_string(),
            ));
            self.detach(now);
            return;
        }

        self.dispatch_client(&msg);
    }

    /// Act on a client command. Also used to replay commands on the
    /// session's own behalf, e.g. rejoining after a kick while detached.
    pub(super) fn dispatch_client(&mut self, msg: &Message) {
        let p = &msg.params;
        let command = msg.command.to_ascii_uppercase();

        match command.as_str() {
            "NICK" if !p.is_empty() => {
                self.ctx.user.nick = p[0].clone();
                if let Some(client) = self.client.as_mut() {
                    client.nick = p[0].clone();
                }
            }
            "JOIN" if !p.is_empty() => {
                let channel = &p[0];
                let single = !channel.contains(',');
                match p.get(1) {
                    Some(key) if single && !key.contains(',') => {
                        self.keyring.add_key(channel, key);
                    }
                    None if single => {
                        if let Some(key) = self.keyring.get_key(channel) {
                            let line = format!("JOIN {channel} {key}");
                            self.queue_line(Priority::Middle, line);
                            return;
                        }
                    }
                    _ => {}
                }
            }
            "WHOIS" if p.first().is_some_and(|n| n.eq_ignore_ascii_case(BOUNCER_NICK)) => {
                let me = self.client.as_ref().map(|c| c.nick.clone()).unwrap_or_default();
                for line in [
                    format!(":bouncer 311 {me} {BOUNCER_NICK} core slbnc * :slbnc"),
                    format!(":bouncer 312 {me} {BOUNCER_NICK} slbnc :slbnc IRC bouncer"),
                    format!(":bouncer 318 {me} {BOUNCER_NICK} :End of /WHOIS list."),
                ] {
                    self.to_client(line);
                }
                return;
            }
            "SBNC" => {
                self.notice("Bouncer commands are not available.");
                return;
            }
            "PRIVMSG" if p.first().is_some_and(|n| n.eq_ignore_ascii_case(BOUNCER_NICK)) => {
                self.notice("Bouncer commands are not available.");
                return;
            }
            "SYNTH" => {
                self.synth(p);
                return;
            }
            "MODE" | "TOPIC" | "NAMES" | "WHO" if p.len() == 1 => {
                let args = [command.to_ascii_lowercase(), p[0].clone()];
                self.synth(&args);
                return;
            }
            "MODE" if p.len() == 2 && p[1] == "+b" => {
                let args = ["mode".to_string(), p[0].clone(), p[1].clone()];
                self.synth(&args);
                return;
            }
            "VERSION" if p.is_empty() => {
                self.synth(&["version".to_string()]);
                return;
            }
            _ => {}
        }

        self.queue_line(Priority::Middle, msg.to_string());
    }
}
