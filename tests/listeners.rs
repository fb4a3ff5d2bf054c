use crate::common::{Harness, context};
use slbnc::session::{Intercept, Listener};
use slbnc_proto::{Message, ModeChange};
use std::sync::{Arc, Mutex};

mod common;

/// Records callbacks and swallows NickServ notices and `*status` queries.
struct Recorder {
    events: Arc<Mutex<Vec<String>>>,
}

impl Recorder {
    fn record(&self, event: String) {
        self.events.lock().unwrap().push(event);
    }
}

impl Listener for Recorder {
    fn name(&self) -> &str {
        "recorder"
    }

    fn intercept_server(&mut self, msg: &Message) -> Intercept {
        if msg.is("NOTICE") && msg.source_nick() == Some("NickServ") {
            self.record("claimed NickServ notice".into());
            return Intercept::Claim;
        }
        Intercept::Pass
    }

    fn intercept_client(&mut self, msg: &Message) -> Intercept {
        if msg.is("PRIVMSG") && msg.param(0) == Some("*status") {
            return Intercept::Claim;
        }
        Intercept::Pass
    }

    fn on_single_mode_change(&mut self, channel: &str, _source: &str, change: &ModeChange) {
        let sign = if change.adding { '+' } else { '-' };
        self.record(format!("mode {channel} {sign}{}", change.mode));
    }

    fn on_attach(&mut self, nick: &str) {
        self.record(format!("attach {nick}"));
    }

    fn on_detach(&mut self) {
        self.record("detach".into());
    }

    fn on_server_disconnect(&mut self, reason: &str) {
        self.record(format!("disconnect {reason}"));
    }
}

fn with_recorder() -> (Harness, Arc<Mutex<Vec<String>>>) {
    let mut h = Harness::in_channel(context());
    let events = Arc::new(Mutex::new(Vec::new()));
    h.session.add_listener(Box::new(Recorder {
        events: Arc::clone(&events),
    }));
    (h, events)
}

#[test]
fn test_claimed_server_line_not_forwarded() {
    let (mut h, events) = with_recorder();
    h.attach("bob");
    h.take_received();

    h.server(":NickServ!services@services.example.org NOTICE bob :This nickname is registered");
    h.server(":alice!a@alice.example.org NOTICE bob :hello");
    assert_eq!(
        h.take_received(),
        vec![":alice!a@alice.example.org NOTICE bob :hello"]
    );
    assert!(events.lock().unwrap().contains(&"claimed NickServ notice".to_string()));
}

#[test]
fn test_claimed_client_line_not_sent() {
    let (mut h, _events) = with_recorder();
    h.attach("bob");
    h.flush();
    h.take_sent();

    h.client("PRIVMSG *status :help");
    h.client("PRIVMSG #test :hi");
    h.flush();
    assert_eq!(h.take_sent(), vec!["PRIVMSG #test :hi"]);
}

#[test]
fn test_lifecycle_callbacks() {
    let (mut h, events) = with_recorder();
    h.attach("bob");
    h.server(":alice!a@alice.example.org MODE #test +nv carol");
    h.detach();
    h.session.upstream_closed("Connection reset by peer", h.now);

    assert_eq!(
        *events.lock().unwrap(),
        vec![
            "attach bob",
            "mode #test +n",
            "mode #test +v",
            "detach",
            "disconnect Connection reset by peer",
        ]
    );
}
