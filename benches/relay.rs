use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use slbnc::config::Config;
use slbnc::session::{Session, SessionContext};
use std::hint::black_box;

fn context() -> SessionContext {
    let config = Config::parse(
        r##"
        [bouncer]
        username = "bob"
        password = "secret"

        [upstream]
        server = "irc.example.net"

        [user]
        nick = "bob"
        "##,
    )
    .unwrap();
    SessionContext::from_config(&config)
}

/// A registered session sitting in `#bench` with `members` other users.
fn populated(members: usize) -> Session {
    let mut session = Session::new(context(), 0);
    session.tick(0);
    session.upstream_connected(0);
    session.handle_server_line(":irc.example.net 001 bob :Welcome", 0);
    session.handle_server_line(":irc.example.net 376 bob :End of /MOTD command.", 0);
    session.handle_server_line(":bob!bob@host JOIN #bench", 0);

    let names: Vec<String> = (0..members).map(|i| format!("+user{i}")).collect();
    for chunk in names.chunks(40) {
        let line = format!(":irc.example.net 353 bob = #bench :{}", chunk.join(" "));
        session.handle_server_line(&line, 0);
    }
    session.handle_server_line(":irc.example.net 366 bob #bench :End of /NAMES list.", 0);
    session.drain_outputs().for_each(drop);
    session
}

fn server_line_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("server_line");
    let line = ":user7!u@host.example.org PRIVMSG #bench :Hello world";
    group.throughput(Throughput::Bytes(line.len() as u64));

    group.bench_function("channel_privmsg", |b| {
        let mut session = populated(200);
        session.attach("bob", "client.host", 0);
        b.iter(|| {
            session.handle_server_line(black_box(line), 1);
            session.drain_outputs().for_each(drop);
        })
    });

    group.bench_function("mode_change", |b| {
        let mut session = populated(200);
        b.iter(|| {
            session.handle_server_line(black_box(":op!o@h MODE #bench +o-o user1 user1"), 1);
        })
    });

    group.finish();
}

fn attach_benchmark(c: &mut Criterion) {
    let mut group = c.benchmark_group("attach");
    group.throughput(Throughput::Elements(1));

    group.bench_function("replay_500_members", |b| {
        let mut session = populated(500);
        b.iter(|| {
            session.attach("bob", "client.host", 1);
            session.drain_outputs().for_each(drop);
        })
    });

    group.finish();
}

criterion_group!(benches, server_line_benchmark, attach_benchmark);
criterion_main!(benches);
