//! Tracing setup and standard spans.

use tracing_subscriber::EnvFilter;

use crate::config::LogFormat;

/// Install the global subscriber. `RUST_LOG` overrides the default `info`.
pub fn init(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(true);
    match format {
        LogFormat::Pretty => builder.init(),
        LogFormat::Json => builder.json().init(),
    }
}

/// Standardized span constructors for bouncer observability.
pub mod spans {
    use tracing::{Span, info_span};

    /// Span covering one bouncer session.
    pub fn session(user: &str) -> Span {
        info_span!("session", user = %user)
    }

    /// Span for one upstream connection attempt and its lifetime.
    pub fn upstream(server: &str, port: u16) -> Span {
        info_span!("upstream", server = %server, port = port)
    }

    /// Span for a client connection during registration.
    pub fn client(peer: &str) -> Span {
        info_span!("client", peer = %peer)
    }
}
