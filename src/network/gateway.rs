//! Gateway - the client listener and the event loop around one session.
//!
//! The Gateway binds the client listener, then owns the [`Session`] and the
//! read halves of both sockets. Everything runs on a single task: ticks,
//! lines from either side, and events from the short-lived connect and
//! registration tasks all funnel into one `select!`, and the session's
//! outputs are applied after each of them. Writes go through a bounded
//! queue to a per-socket writer task, so a peer that stops reading never
//! stalls the loop.

use futures_util::stream::{SplitSink, SplitStream};
use futures_util::{SinkExt, StreamExt};
use slbnc_proto::{LineCodec, ProtocolError};
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::sync::mpsc::error::TrySendError;
use tokio::time::{MissedTickBehavior, interval, timeout};
use tokio_util::codec::Framed;
use tracing::{Instrument, Span, debug, error, info, instrument, warn};

use super::registration::register;
use crate::config::Config;
use crate::session::{Output, Session, SessionContext};
use crate::telemetry::spans;

/// A socket framed into IRC lines.
pub type LineStream = Framed<TcpStream, LineCodec>;

/// Give up on an upstream connection attempt after this long.
const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);

/// Lines the client may fall behind before it is detached.
const CLIENT_QUEUE: usize = 1024;

/// Upstream writes are already paced, so this only absorbs bursts.
const UPSTREAM_QUEUE: usize = 256;

/// A single write stuck longer than this ends the writer task.
const WRITE_TIMEOUT: Duration = Duration::from_secs(30);

/// Results handed back by spawned tasks.
enum Event {
    Connected(LineStream),
    ConnectFailed(String),
    Registered {
        conn: LineStream,
        nick: String,
        peer: SocketAddr,
    },
}

/// The Gateway accepts the client and relays for one session.
pub struct Gateway {
    listener: TcpListener,
    config: Config,
}

impl Gateway {
    /// Bind the client listener.
    pub async fn bind(config: Config) -> anyhow::Result<Self> {
        let listener = TcpListener::bind(config.bouncer.listen).await?;
        info!(addr = %config.bouncer.listen, "Client listener bound");
        Ok(Self { listener, config })
    }

    /// Address the listener ended up on.
    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the session until the listener fails.
    #[instrument(skip(self), name = "gateway")]
    pub async fn run(self) -> anyhow::Result<()> {
        let Self { listener, config } = self;
        let password: Arc<str> = Arc::from(config.bouncer.password.as_str());
        let (events_tx, mut events) = mpsc::channel(8);

        let mut ticker = interval(Duration::from_millis(config.bouncer.tick_interval_ms));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        let mut driver = Driver {
            session: Session::new(SessionContext::from_config(&config), now()),
            upstream: None,
            client: None,
            retiring: None,
            connecting: false,
            events: events_tx,
        };

        loop {
            tokio::select! {
                _ = ticker.tick() => driver.session.tick(now()),

                accepted = listener.accept() => match accepted {
                    Ok((stream, peer)) => {
                        info!(%peer, "Client connection accepted");
                        driver.spawn_registration(stream, peer, Arc::clone(&password));
                    }
                    Err(e) => {
                        error!(error = %e, "Failed to accept client connection");
                    }
                },

                Some(event) = events.recv() => driver.on_event(event),

                line = next_line(&mut driver.upstream) => match line {
                    Some(Ok(line)) => driver.session.handle_server_line(&line, now()),
                    Some(Err(e)) => {
                        warn!(error = %e, code = e.error_code(), "Upstream read failed");
                        driver.drop_upstream(&e.to_string());
                    }
                    None => driver.drop_upstream("Connection reset by peer"),
                },

                line = next_line(&mut driver.client) => match line {
                    Some(Ok(line)) => driver.session.handle_client_line(&line, now()),
                    Some(Err(e)) => {
                        warn!(error = %e, code = e.error_code(), "Client read failed");
                        driver.drop_client();
                    }
                    None => driver.drop_client(),
                },
            }

            driver.apply_outputs();
        }
    }
}

/// Sockets and in-flight work around the session.
struct Driver {
    session: Session,
    upstream: Option<Link>,
    client: Option<Link>,
    /// A client being replaced, held until the session says to close it.
    retiring: Option<Link>,
    connecting: bool,
    events: mpsc::Sender<Event>,
}

impl Driver {
    fn on_event(&mut self, event: Event) {
        match event {
            Event::Connected(conn) => {
                self.connecting = false;
                let ctx = self.session.context();
                let span = spans::upstream(&ctx.server, ctx.port);
                self.upstream = Some(Link::spawn(conn, UPSTREAM_QUEUE, span));
                self.session.upstream_connected(now());
            }
            Event::ConnectFailed(reason) => {
                self.connecting = false;
                self.session.connect_failed(&reason, now());
            }
            Event::Registered { conn, nick, peer } => {
                let span = spans::client(&peer.to_string());
                self.retiring = self.client.replace(Link::spawn(conn, CLIENT_QUEUE, span));
                self.session.attach(&nick, &peer.ip().to_string(), now());
            }
        }
    }

    /// The upstream socket failed underneath us.
    fn drop_upstream(&mut self, reason: &str) {
        self.upstream = None;
        self.session.upstream_closed(reason, now());
    }

    fn drop_client(&mut self) {
        if self.client.take().is_some() {
            info!("Client connection closed");
        }
        self.session.detach(now());
    }

    fn apply_outputs(&mut self) {
        while let Some(output) = self.session.poll_output() {
            match output {
                Output::ToServer(line) => {
                    let Some(link) = self.upstream.as_ref() else {
                        continue;
                    };
                    if let Err(e) = link.send(line) {
                        let reason = overflow_reason(&e);
                        warn!(%reason, "Upstream write queue failed");
                        self.drop_upstream(reason);
                    }
                }
                Output::ToClient(line) => {
                    let Some(link) = self.client.as_ref() else {
                        continue;
                    };
                    if let Err(e) = link.send(line) {
                        warn!(reason = overflow_reason(&e), "Client write queue failed");
                        self.drop_client();
                    }
                }
                Output::Connect => self.spawn_connect(),
                Output::CloseUpstream(reason) => {
                    if self.upstream.take().is_some() {
                        info!(%reason, "Upstream connection closed by session");
                    }
                }
                Output::CloseClient(reason) => {
                    let link = self.retiring.take().or_else(|| self.client.take());
                    if let Some(link) = link {
                        // Best effort; the writer flushes what it has, then closes.
                        let _ = link.send(format!("ERROR :{reason}"));
                        info!(%reason, "Client connection closed by session");
                    }
                }
            }
        }
        self.retiring = None;
    }

    fn spawn_connect(&mut self) {
        if self.connecting || self.upstream.is_some() {
            debug!("Connect requested while a link exists or is pending");
            return;
        }
        self.connecting = true;

        let ctx = self.session.context();
        let (server, port) = (ctx.server.clone(), ctx.port);
        let span = spans::upstream(&server, port);
        let events = self.events.clone();
        tokio::spawn(
            async move {
                let attempt = timeout(CONNECT_TIMEOUT, TcpStream::connect((server.as_str(), port)));
                let event = match attempt.await {
                    Ok(Ok(stream)) => {
                        info!("Upstream TCP connection established");
                        Event::Connected(Framed::new(stream, LineCodec::new()))
                    }
                    Ok(Err(e)) => Event::ConnectFailed(e.to_string()),
                    Err(_) => Event::ConnectFailed("Connection timed out".to_string()),
                };
                let _ = events.send(event).await;
            }
            .instrument(span),
        );
    }

    fn spawn_registration(&self, stream: TcpStream, peer: SocketAddr, password: Arc<str>) {
        let events = self.events.clone();
        tokio::spawn(
            async move {
                let mut conn = Framed::new(stream, LineCodec::new());
                match register(&mut conn, &password).await {
                    Ok(reg) => {
                        info!(nick = %reg.nick, "Client registered");
                        let event = Event::Registered {
                            conn,
                            nick: reg.nick,
                            peer,
                        };
                        let _ = events.send(event).await;
                    }
                    Err(e) => {
                        warn!(error = %e, code = e.error_code(), "Client registration failed");
                    }
                }
            }
            .instrument(spans::client(&peer.to_string())),
        );
    }
}

/// Read half of a socket plus the queue feeding its writer task.
///
/// Dropping a `Link` closes the queue; the writer drains what is left and
/// shuts the socket down.
struct Link {
    lines: SplitStream<LineStream>,
    outgoing: mpsc::Sender<String>,
}

impl Link {
    fn spawn(conn: LineStream, capacity: usize, span: Span) -> Self {
        let (sink, lines) = conn.split();
        let (outgoing, queue) = mpsc::channel(capacity);
        tokio::spawn(write_lines(sink, queue).instrument(span));
        Self { lines, outgoing }
    }

    /// Queue a line without waiting.
    fn send(&self, line: String) -> Result<(), TrySendError<String>> {
        self.outgoing.try_send(line)
    }
}

async fn write_lines(
    mut sink: SplitSink<LineStream, String>,
    mut queue: mpsc::Receiver<String>,
) {
    while let Some(line) = queue.recv().await {
        match timeout(WRITE_TIMEOUT, sink.send(line)).await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                debug!(error = %e, code = e.error_code(), "Write failed");
                return;
            }
            Err(_) => {
                debug!("Write timed out");
                return;
            }
        }
    }
    let _ = timeout(WRITE_TIMEOUT, sink.close()).await;
}

fn overflow_reason(e: &TrySendError<String>) -> &'static str {
    match e {
        TrySendError::Full(_) => "Write queue full",
        TrySendError::Closed(_) => "Connection closed",
    }
}

/// Next line from an optional connection; pends forever when there is none.
async fn next_line(link: &mut Option<Link>) -> Option<Result<String, ProtocolError>> {
    match link {
        Some(link) => link.lines.next().await,
        None => std::future::pending().await,
    }
}

fn now() -> i64 {
    chrono::Utc::now().timestamp()
}
