use crate::common::{Harness, context};

mod common;

fn log_ends_with(h: &Harness, text: &str) -> bool {
    h.session.offline_log().iter().any(|entry| entry.ends_with(text))
}

#[test]
fn test_private_messages_logged_while_detached() {
    let mut h = Harness::in_channel(context());
    h.server(":alice!a@alice.example.org PRIVMSG bob :ping me later");
    h.server(":services!s@services.example.org NOTICE bob :Your nick is registered");
    h.server(":alice!a@alice.example.org PRIVMSG bob :\x01VERSION\x01");
    h.server(":alice!a@alice.example.org PRIVMSG #test :channel chatter");

    let log = h.session.offline_log();
    assert_eq!(log.len(), 2);
    assert!(log[0].starts_with('['));
    assert!(log[0].ends_with("] alice (a@alice.example.org): ping me later"));
    assert!(log[1].ends_with(
        "] services!s@services.example.org (notice): Your nick is registered"
    ));
}

#[test]
fn test_nothing_logged_while_attached() {
    let mut h = Harness::in_channel(context());
    h.attach("bob");
    h.take_received();

    h.server(":alice!a@alice.example.org PRIVMSG bob :hi");
    assert!(h.session.offline_log().is_empty());
    assert_eq!(
        h.take_received(),
        vec![":alice!a@alice.example.org PRIVMSG bob :hi"]
    );
}

#[test]
fn test_nick_in_use_while_detached() {
    let mut h = Harness::connected(context());
    h.server(":irc.example.net 433 bob bob_away :Nickname is already in use.");
    h.flush();
    assert_eq!(h.take_sent(), vec!["NICK :bob_away_"]);
}

#[test]
fn test_nick_in_use_left_to_client() {
    let mut h = Harness::connected(context());
    h.attach("bob");
    h.flush();
    h.take_sent();
    h.take_received();

    h.server(":irc.example.net 433 bob bob_away :Nickname is already in use.");
    h.flush();
    assert!(h.take_sent().is_empty());
    assert_eq!(
        h.take_received(),
        vec![":irc.example.net 433 bob bob_away :Nickname is already in use."]
    );
}

#[test]
fn test_kick_while_detached_rejoins() {
    let mut h = Harness::in_channel(context());
    h.server(":alice!a@alice.example.org KICK #test bob :bye");

    assert!(!h.session.upstream().unwrap().is_on_channel("#test"));
    assert!(log_ends_with(
        &h,
        "alice (a@alice.example.org) kicked you from #test (bye)"
    ));

    h.flush();
    assert_eq!(h.take_sent(), vec!["JOIN #test"]);
}

#[test]
fn test_kick_rejoin_uses_known_key() {
    let mut h = Harness::in_channel(context());
    h.server(":alice!a@alice.example.org MODE #test +k sesame");
    assert_eq!(h.session.keyring().get_key("#test"), Some("sesame"));

    h.server(":alice!a@alice.example.org KICK #test bob :bye");
    h.flush();
    assert_eq!(h.take_sent(), vec!["JOIN #test sesame"]);
}

#[test]
fn test_kick_while_attached_does_not_rejoin() {
    let mut h = Harness::in_channel(context());
    h.attach("bob");
    h.flush();
    h.take_sent();

    h.server(":alice!a@alice.example.org KICK #test bob :bye");
    h.flush();
    assert!(h.take_sent().is_empty());
    assert!(h.session.offline_log().is_empty());
    assert!(h.session.channel_list().is_empty());
}

#[test]
fn test_detach_sets_away_and_dropmodes() {
    let mut ctx = context();
    ctx.user.away = Some("out".into());
    ctx.user.dropmodes = "w".into();
    let mut h = Harness::in_channel(ctx);
    h.attach("bob");
    h.flush();
    h.take_sent();

    h.detach();
    h.flush();
    assert_eq!(h.take_sent(), vec!["MODE bob -w", "AWAY :out"]);
}

#[test]
fn test_disconnect_logged_and_reconnect_scheduled() {
    let mut h = Harness::in_channel(context());
    h.advance(200);
    h.server(":irc.example.net NOTICE bob :still here");

    h.server("ERROR :Closing Link: bob (Reconnecting too fast, throttled)");
    h.session.upstream_closed("Connection closed", h.now);

    assert!(h.session.upstream().is_none());
    assert!(log_ends_with(&h, "Disconnected from the server."));
    assert!(h.session.offline_log().iter().any(|entry| entry.contains(
        "Error received for bob: Closing Link: bob (Reconnecting too fast, throttled)"
    )));
    assert_eq!(h.session.reconnect_at(), Some(h.now + 50));
}
