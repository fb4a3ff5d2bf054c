//! End-to-end: a client and a fake upstream server on loopback sockets.

use futures_util::{SinkExt, StreamExt};
use slbnc::config::Config;
use slbnc::network::Gateway;
use slbnc_proto::LineCodec;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::net::{TcpListener, TcpStream};
use tokio::time::timeout;
use tokio_util::codec::Framed;

type Conn = Framed<TcpStream, LineCodec>;

const WAIT: Duration = Duration::from_secs(5);

/// Read until a line matches, failing after [`WAIT`].
async fn read_until(conn: &mut Conn, pred: impl Fn(&str) -> bool) -> String {
    timeout(WAIT, async {
        loop {
            let line = conn
                .next()
                .await
                .expect("connection open")
                .expect("valid line");
            if pred(&line) {
                return line;
            }
        }
    })
    .await
    .expect("expected line in time")
}

/// Start a gateway whose upstream is a local listener, and accept the
/// bouncer's connection on it.
async fn start() -> (std::net::SocketAddr, Conn) {
    let fake = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let upstream_port = fake.local_addr().unwrap().port();

    let config = Config::parse(&format!(
        r##"
        [bouncer]
        username = "bob"
        password = "secret"
        listen = "127.0.0.1:0"
        tick_interval_ms = 10

        [upstream]
        server = "127.0.0.1"
        port = {upstream_port}

        [user]
        nick = "bob"

        [flood]
        floodwait = 0
        "##
    ))
    .unwrap();

    let gateway = Gateway::bind(config).await.unwrap();
    let addr = gateway.local_addr().unwrap();
    tokio::spawn(gateway.run());

    let (stream, _) = timeout(WAIT, fake.accept()).await.unwrap().unwrap();
    let mut upstream = Framed::new(stream, LineCodec::new());
    read_until(&mut upstream, |l| l.starts_with("NICK ")).await;
    read_until(&mut upstream, |l| l.starts_with("USER ")).await;
    upstream
        .send(":irc.test 001 bob :Welcome to the test network".to_string())
        .await
        .unwrap();
    upstream
        .send(":irc.test 376 bob :End of /MOTD command.".to_string())
        .await
        .unwrap();

    (addr, upstream)
}

async fn client(addr: std::net::SocketAddr, password: &str) -> Conn {
    let stream = TcpStream::connect(addr).await.unwrap();
    let mut conn = Framed::new(stream, LineCodec::new());
    for line in [
        format!("PASS {password}"),
        "NICK bob".to_string(),
        "USER bob 0 * :Bob".to_string(),
    ] {
        conn.send(line).await.unwrap();
    }
    conn
}

#[tokio::test]
async fn test_client_relays_through_upstream() {
    let (addr, mut upstream) = start().await;
    let mut client = client(addr, "secret").await;

    read_until(&mut client, |l| l.contains(" 001 bob ")).await;
    read_until(&mut upstream, |l| l == "AWAY").await;

    client
        .send("PRIVMSG #chan :hello from the client".to_string())
        .await
        .unwrap();
    read_until(&mut upstream, |l| l == "PRIVMSG #chan :hello from the client").await;

    upstream
        .send(":alice!a@alice.example.org PRIVMSG bob :hi there".to_string())
        .await
        .unwrap();
    read_until(&mut client, |l| {
        l == ":alice!a@alice.example.org PRIVMSG bob :hi there"
    })
    .await;
}

#[tokio::test]
async fn test_wrong_password_rejected() {
    let (addr, _upstream) = start().await;
    let mut client = client(addr, "letmein").await;

    let line = read_until(&mut client, |l| l.contains(" 464 ")).await;
    assert_eq!(line, ":slbnc 464 bob :Password incorrect");
}

#[tokio::test]
async fn test_server_ping_answered() {
    let (_addr, mut upstream) = start().await;
    upstream.send("PING :irc.test".to_string()).await.unwrap();
    read_until(&mut upstream, |l| l == "PONG :irc.test").await;
}

#[tokio::test]
async fn test_latin1_line_keeps_upstream() {
    let (_addr, mut upstream) = start().await;
    upstream
        .get_mut()
        .write_all(b":alice!a@h PRIVMSG #chan :caf\xe9 au lait\r\nPING :after\r\n")
        .await
        .unwrap();
    read_until(&mut upstream, |l| l == "PONG :after").await;
}

#[tokio::test]
async fn test_stalled_client_does_not_block_session() {
    let (addr, mut upstream) = start().await;
    let mut stalled = client(addr, "secret").await;
    read_until(&mut stalled, |l| l.contains(" 001 bob ")).await;

    // The first client stops reading while the server keeps talking.
    let text = "x".repeat(400);
    for i in 0..4000 {
        upstream
            .send(format!(":alice!a@h PRIVMSG bob :{i} {text}"))
            .await
            .unwrap();
    }
    upstream.send("PING :after".to_string()).await.unwrap();
    read_until(&mut upstream, |l| l == "PONG :after").await;

    let mut second = client(addr, "secret").await;
    let line = read_until(&mut second, |l| l.contains(" 001 bob ")).await;
    assert_eq!(
        line,
        ":irc.test 001 bob :Welcome to the Internet Relay Network bob"
    );
    drop(stalled);
}
