//! Integration test common infrastructure.
//!
//! Drives a sans-IO session through a scripted upstream server and keeps
//! what it sent each way for assertions.

#![allow(dead_code)]

use slbnc::config::Config;
use slbnc::session::{Output, Session, SessionContext};

pub const SERVER: &str = "irc.example.net";
pub const CLIENT_HOST: &str = "client.example.org";

const CONFIG: &str = r##"
[bouncer]
username = "bob"
password = "secret"

[upstream]
server = "irc.example.net"

[user]
nick = "bob"
channels = ["#test"]
"##;

/// Session settings shared by the scenarios; tweak fields before use.
pub fn context() -> SessionContext {
    let config = Config::parse(CONFIG).expect("test config parses");
    SessionContext::from_config(&config)
}

/// A session plus a fake clock and captured outputs.
pub struct Harness {
    pub session: Session,
    pub now: i64,
    sent: Vec<String>,
    received: Vec<String>,
    other: Vec<Output>,
}

impl Harness {
    pub fn new(ctx: SessionContext) -> Self {
        let now = 1_000;
        Self {
            session: Session::new(ctx, now),
            now,
            sent: Vec::new(),
            received: Vec::new(),
            other: Vec::new(),
        }
    }

    /// Connect, register and finish the MOTD, then drop the captured
    /// registration traffic.
    pub fn connected(ctx: SessionContext) -> Self {
        let mut h = Self::new(ctx);
        h.session.tick(h.now);
        h.collect();
        assert!(h.other.contains(&Output::Connect), "first tick connects");
        h.session.upstream_connected(h.now);

        h.server(":irc.example.net 001 bob :Welcome to the network bob");
        h.server(
            ":irc.example.net 005 bob PREFIX=(ov)@+ CHANMODES=b,k,l,imnpst NETWORK=Example :are supported by this server",
        );
        h.server(":irc.example.net 376 bob :End of /MOTD command.");
        h.flush();
        h.take_sent();
        h.take_received();
        h.other.clear();
        h
    }

    /// Connected and sitting in `#test` with a known topic and member list.
    pub fn in_channel(ctx: SessionContext) -> Self {
        let mut h = Self::connected(ctx);
        h.server(":bob!bob@bob.example.org JOIN #test");
        h.server(":irc.example.net 332 bob #test :hello");
        h.server(":irc.example.net 333 bob #test alice 1700000000");
        h.server(":irc.example.net 353 bob = #test :@alice +carol bob");
        h.server(":irc.example.net 366 bob #test :End of /NAMES list.");
        h.flush();
        h.take_sent();
        h.take_received();
        h
    }

    pub fn server(&mut self, line: &str) {
        self.session.handle_server_line(line, self.now);
        self.collect();
    }

    pub fn client(&mut self, line: &str) {
        self.session.handle_client_line(line, self.now);
        self.collect();
    }

    pub fn attach(&mut self, nick: &str) {
        self.session.attach(nick, CLIENT_HOST, self.now);
        self.collect();
    }

    pub fn detach(&mut self) {
        self.session.detach(self.now);
        self.collect();
    }

    /// Tick without moving the clock.
    pub fn tick(&mut self) {
        self.session.tick(self.now);
        self.collect();
    }

    /// Move the clock forward one second at a time, ticking each second.
    pub fn advance(&mut self, secs: i64) {
        for _ in 0..secs {
            self.now += 1;
            self.session.tick(self.now);
            self.collect();
        }
    }

    /// Tick until the upstream queues are empty.
    pub fn flush(&mut self) {
        for _ in 0..120 {
            let pending = self
                .session
                .upstream()
                .map_or(0, |up| up.flood().real_queue_size());
            if pending == 0 {
                return;
            }
            self.advance(1);
        }
        panic!("upstream queues did not drain");
    }

    pub fn take_sent(&mut self) -> Vec<String> {
        std::mem::take(&mut self.sent)
    }

    pub fn take_received(&mut self) -> Vec<String> {
        std::mem::take(&mut self.received)
    }

    pub fn take_other(&mut self) -> Vec<Output> {
        std::mem::take(&mut self.other)
    }

    fn collect(&mut self) {
        for output in self.session.drain_outputs() {
            match output {
                Output::ToServer(line) => self.sent.push(line),
                Output::ToClient(line) => self.received.push(line),
                other => self.other.push(other),
            }
        }
    }
}
