//! slbnc - Straylight IRC Bouncer

use slbnc::config::{Config, validate};
use slbnc::network::Gateway;
use slbnc::telemetry::{self, spans};
use tracing::{Instrument, error, info};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load configuration
    let config_path = std::env::args()
        .nth(1)
        .unwrap_or_else(|| "config.toml".to_string());

    let config = Config::load(&config_path).map_err(|e| {
        eprintln!("Failed to load config {config_path}: {e}");
        e
    })?;

    // Initialize tracing
    telemetry::init(config.bouncer.log_format);

    if let Err(errors) = validate(&config) {
        for e in &errors {
            error!(path = %config_path, error = %e, "Invalid configuration");
        }
        return Err(anyhow::anyhow!(
            "{} configuration error(s) in {config_path}",
            errors.len()
        ));
    }

    info!(
        user = %config.bouncer.username,
        server = %config.upstream.server,
        port = config.upstream.port,
        "Starting slbnc"
    );

    let span = spans::session(&config.bouncer.username);
    let gateway = Gateway::bind(config).await?;

    tokio::select! {
        result = gateway.run().instrument(span) => result?,
        _ = tokio::signal::ctrl_c() => info!("Shutting down"),
    }

    Ok(())
}
