use crate::common::{CLIENT_HOST, Harness, context};
use slbnc::Output;

mod common;

#[test]
fn test_attach_replays_channel_state() {
    let mut h = Harness::in_channel(context());
    h.attach("bob");

    let received = h.take_received();
    assert_eq!(
        received[0],
        ":irc.example.net 001 bob :Welcome to the Internet Relay Network bob"
    );
    assert_eq!(received[1], ":irc.example.net 422 bob :MOTD File is missing");
    assert!(received[2].starts_with(":irc.example.net 005 bob "));
    assert!(received[2].contains("PREFIX=(ov)@+"));
    assert_eq!(
        &received[3..],
        &[
            format!(":bob!bob@{CLIENT_HOST} JOIN #test"),
            ":irc.example.net 332 bob #test :hello".to_string(),
            ":irc.example.net 333 bob #test alice 1700000000".to_string(),
            ":irc.example.net 353 bob = #test :@alice bob +carol".to_string(),
            ":irc.example.net 366 bob #test :End of /NAMES list.".to_string(),
        ]
    );

    h.flush();
    assert_eq!(h.take_sent(), vec!["AWAY"]);
}

#[test]
fn test_attach_renames_client_to_current_nick() {
    let mut h = Harness::connected(context());
    h.server(":bob!bob@bob.example.org NICK :bob_away");
    h.attach("bob");

    let received = h.take_received();
    assert_eq!(received[0], format!(":bob!bob@{CLIENT_HOST} NICK :bob_away"));
    assert_eq!(h.session.client().unwrap().nick, "bob_away");

    h.flush();
    assert_eq!(h.take_sent(), vec!["AWAY", "NICK :bob"]);
}

#[test]
fn test_attach_announces_offline_log() {
    let mut h = Harness::connected(context());
    h.server(":alice!a@alice.example.org PRIVMSG bob :are you there?");
    assert_eq!(h.session.offline_log().len(), 1);

    h.attach("bob");
    let received = h.take_received();
    assert_eq!(
        received.last().map(String::as_str),
        Some(":-slbnc!bouncer@slbnc NOTICE bob :You have new messages.")
    );
}

#[test]
fn test_attach_without_upstream_connects() {
    let mut h = Harness::new(context());
    h.attach("bob");
    assert!(h.take_other().is_empty());

    h.advance(1);
    assert_eq!(h.take_other(), vec![Output::Connect]);
    assert_eq!(
        h.take_received(),
        vec![":-slbnc!bouncer@slbnc NOTICE bob :Trying to reconnect to irc.example.net:6667"]
    );
}

#[test]
fn test_reattach_closes_previous_client() {
    let mut h = Harness::in_channel(context());
    h.attach("bob");
    h.take_received();

    h.attach("bob");
    assert_eq!(
        h.take_other(),
        vec![Output::CloseClient("Another client has connected.".into())]
    );
    assert!(h.session.has_client());
}

#[test]
fn test_client_quit_keeps_session() {
    let mut h = Harness::in_channel(context());
    h.attach("bob");
    h.client("QUIT :bye");

    assert!(!h.session.has_client());
    assert!(h.session.upstream().is_some());
    assert!(h.session.upstream().unwrap().is_on_channel("#test"));
}
