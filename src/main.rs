//! movie-api server binary.
//!
//! ```text
//!  config file ─┐
//!  CLI flags ───┴─▶ ServerConfig ─▶ Listener::bind
//!                                        │
//!   SIGINT/SIGTERM ─▶ ShutdownCoordinator │ drain signal
//!                          │              ▼
//!                          │        HttpServer::run (accept loop)
//!                          │              │ returns once draining
//!                          └─ outcome ────┴─▶ exit 0 / exit 1
//! ```

use std::net::SocketAddr;

use clap::Parser;

use movie_api::config::cli::Cli;
use movie_api::config::loader::{load_or_default, ConfigError};
use movie_api::config::validation::validate_config;
use movie_api::lifecycle::{ShutdownCoordinator, TerminationSignals};
use movie_api::net::Listener;
use movie_api::observability::{logging, metrics};
use movie_api::HttpServer;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let mut config = load_or_default(cli.config.as_deref())?;
    cli.apply(&mut config);
    validate_config(&config).map_err(ConfigError::Validation)?;

    logging::init_logging(&config.observability);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        env = %config.env,
        bind_address = %config.listener.bind_address,
        rate_limit_enabled = config.rate_limit.enabled,
        requests_per_second = config.rate_limit.requests_per_second,
        burst = config.rate_limit.burst,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse::<SocketAddr>() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    // Handlers must exist before the port is reachable.
    let signals = TerminationSignals::install()?;
    let listener = Listener::bind(&config.listener).await?;

    let coordinator = ShutdownCoordinator::new(config.timeouts.shutdown());
    let drain = coordinator.drain_signal();
    let connections = coordinator.connections();
    let shutdown = coordinator.spawn(signals.recv());

    let server = HttpServer::new(config);
    server.run(listener, drain, connections).await?;

    if let Err(e) = shutdown.outcome().await {
        tracing::error!(error = %e, "Graceful shutdown failed");
        return Err(e.into());
    }

    tracing::info!("Stopped server");
    Ok(())
}
