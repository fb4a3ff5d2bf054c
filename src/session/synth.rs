//! Replies fabricated from tracked state.
//!
//! Each facet either answers from cache, when the tracker holds
//! authoritative data for it, or forwards the equivalent query upstream
//! and lets the real reply update the tracker on its way to the client.

use slbnc_proto::numeric;
use tracing::debug;

use super::{Session, Upstream};
use crate::flood::Priority;

/// NAMES replies are flushed once the nick list passes this many bytes.
const NAMES_CHUNK: usize = 400;

/// ISUPPORT tokens per synthesized 005 line.
const ISUPPORT_PER_LINE: usize = 11;

/// Outcome of a synthesis request.
#[derive(Debug, PartialEq, Eq)]
enum Synth {
    /// Lines for the client.
    Reply(Vec<String>),
    /// Query to send upstream instead.
    Forward(String),
}

/// `:server NNN me <rest>`
fn reply(upstream: &Upstream, code: u16, rest: &str) -> String {
    format!(
        ":{} {} {} {rest}",
        upstream.server(),
        numeric::code(code),
        upstream.nick()
    )
}

fn synth_mode(upstream: &Upstream, channel: &str) -> Synth {
    match upstream.channel(channel) {
        Some(chan) if chan.modes_known() => Synth::Reply(vec![
            reply(
                upstream,
                numeric::RPL_CHANNELMODEIS,
                &format!("{channel} {}", chan.chan_modes(upstream.capabilities())),
            ),
            reply(
                upstream,
                numeric::RPL_CREATIONTIME,
                &format!("{channel} {}", chan.created_at()),
            ),
        ]),
        _ => Synth::Forward(format!("MODE {channel}")),
    }
}

fn synth_bans(upstream: &Upstream, channel: &str) -> Synth {
    match upstream.channel(channel) {
        Some(chan) if chan.bans_known() => {
            let mut lines: Vec<String> = chan
                .bans()
                .iter()
                .map(|ban| {
                    reply(
                        upstream,
                        numeric::RPL_BANLIST,
                        &format!("{channel} {} {} {}", ban.mask, ban.set_by, ban.set_at),
                    )
                })
                .collect();
            lines.push(reply(
                upstream,
                numeric::RPL_ENDOFBANLIST,
                &format!("{channel} :End of Channel Ban List"),
            ));
            Synth::Reply(lines)
        }
        _ => Synth::Forward(format!("MODE {channel} +b")),
    }
}

fn synth_topic(upstream: &Upstream, channel: &str) -> Synth {
    match upstream.channel(channel) {
        Some(chan) if chan.topic().is_known() => {
            let Some(topic) = chan.topic().topic() else {
                return Synth::Reply(Vec::new());
            };
            Synth::Reply(vec![
                reply(
                    upstream,
                    numeric::RPL_TOPIC,
                    &format!("{channel} :{}", topic.text),
                ),
                reply(
                    upstream,
                    numeric::RPL_TOPICWHOTIME,
                    &format!("{channel} {} {}", topic.set_by, topic.set_at),
                ),
            ])
        }
        _ => Synth::Forward(format!("TOPIC {channel}")),
    }
}

fn synth_names(upstream: &Upstream, channel: &str) -> Synth {
    let Some(chan) = upstream.channel(channel).filter(|c| c.names_known()) else {
        return Synth::Forward(format!("NAMES {channel}"));
    };

    let prefix = upstream.capabilities().prefix();
    let mut lines = Vec::new();
    let mut nicks = String::new();
    for member in chan.members() {
        if !nicks.is_empty() {
            nicks.push(' ');
        }
        if let Some(symbol) = prefix.highest(member.prefixes()) {
            nicks.push(symbol);
        }
        nicks.push_str(member.name());

        if nicks.len() > NAMES_CHUNK {
            lines.push(reply(
                upstream,
                numeric::RPL_NAMREPLY,
                &format!("= {channel} :{nicks}"),
            ));
            nicks.clear();
        }
    }
    if !nicks.is_empty() {
        lines.push(reply(
            upstream,
            numeric::RPL_NAMREPLY,
            &format!("= {channel} :{nicks}"),
        ));
    }
    lines.push(reply(
        upstream,
        numeric::RPL_ENDOFNAMES,
        &format!("{channel} :End of /NAMES list."),
    ));
    Synth::Reply(lines)
}

/// WHO is only answered from cache when every member's site, server and
/// realname are known.
fn synth_who(upstream: &Upstream, channel: &str) -> Synth {
    let complete = upstream.channel(channel).filter(|chan| {
        chan.names_known()
            && chan
                .members()
                .all(|m| m.site().is_some() && m.server().is_some() && m.realname().is_some())
    });
    let Some(chan) = complete else {
        return Synth::Forward(format!("WHO {channel}"));
    };

    let prefix = upstream.capabilities().prefix();
    let mut lines: Vec<String> = chan
        .members()
        .map(|m| {
            let site = m.site().unwrap_or_default();
            let (ident, host) = site.split_once('@').unwrap_or(("*", site));
            let status = prefix
                .highest(m.prefixes())
                .map(String::from)
                .unwrap_or_default();
            reply(
                upstream,
                numeric::RPL_WHOREPLY,
                &format!(
                    "{channel} {ident} {host} {} {} H{status} :0 {}",
                    m.server().unwrap_or_default(),
                    m.name(),
                    m.realname().unwrap_or_default()
                ),
            )
        })
        .collect();
    lines.push(reply(
        upstream,
        numeric::RPL_ENDOFWHO,
        &format!("{channel} :End of /WHO list."),
    ));
    Synth::Reply(lines)
}

fn synth_version(upstream: &Upstream) -> Synth {
    let mut lines = Vec::new();
    if let (Some(version), Some(features)) = (upstream.version(), upstream.features()) {
        lines.push(reply(
            upstream,
            numeric::RPL_VERSION,
            &format!("{version} {} :{features}", upstream.server()),
        ));
    }
    for chunk in upstream.capabilities().tokens().chunks(ISUPPORT_PER_LINE) {
        lines.push(reply(
            upstream,
            numeric::RPL_ISUPPORT,
            &format!("{} :are supported by this server", chunk.join(" ")),
        ));
    }
    Synth::Reply(lines)
}

impl Session {
    /// `SYNTH <facet> <channel> [+b]`
    pub(super) fn synth(&mut self, args: &[String]) {
        let facet = args.first().map(|f| f.to_ascii_lowercase());
        let channel = args.get(1).map(String::as_str);

        let Some(upstream) = self.upstream.as_ref() else {
            debug!(?facet, "SYNTH without an upstream link");
            return;
        };

        let outcome = match (facet.as_deref(), channel) {
            (Some("mode"), Some(chan)) if args.len() == 2 => synth_mode(upstream, chan),
            (Some("mode"), Some(chan)) if args.len() == 3 && args[2] == "+b" => {
                synth_bans(upstream, chan)
            }
            (Some("mode"), Some(_)) => return,
            (Some("topic"), Some(chan)) => synth_topic(upstream, chan),
            (Some("names"), Some(chan)) => synth_names(upstream, chan),
            (Some("who"), Some(chan)) => synth_who(upstream, chan),
            (Some("version"), _) => synth_version(upstream),
            _ => {
                self.notice("Syntax: SYNTH command parameter");
                self.notice("supported commands are: mode, topic, names, who, version");
                return;
            }
        };

        match outcome {
            Synth::Reply(lines) => {
                for line in lines {
                    self.to_client(line);
                }
            }
            Synth::Forward(query) => {
                debug!(%query, "Not cached, asking upstream");
                self.queue_line(Priority::Middle, query);
            }
        }
    }
}
