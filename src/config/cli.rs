//! Command-line flags layered over the config file.

use std::path::PathBuf;

use clap::Parser;

use crate::config::schema::ServerConfig;

#[derive(Debug, Parser)]
#[command(name = "movie-api")]
#[command(about = "JSON API server for the movie catalog", long_about = None)]
pub struct Cli {
    /// TOML config file. Defaults are used when omitted.
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// API server port (keeps the configured host).
    #[arg(long)]
    pub port: Option<u16>,

    /// Environment (development|staging|production)
    #[arg(long)]
    pub env: Option<String>,

    /// Rate limiter maximum requests per second
    #[arg(long)]
    pub limiter_rps: Option<f64>,

    /// Rate limiter maximum burst
    #[arg(long)]
    pub limiter_burst: Option<u32>,

    /// Enable rate limiter
    #[arg(long)]
    pub limiter_enabled: Option<bool>,
}

impl Cli {
    /// Overwrite config values with any flags that were given.
    pub fn apply(&self, config: &mut ServerConfig) {
        if let Some(port) = self.port {
            let host = config
                .listener
                .bind_address
                .rsplit_once(':')
                .map(|(host, _)| host)
                .unwrap_or("0.0.0.0");
            config.listener.bind_address = format!("{}:{}", host, port);
        }
        if let Some(env) = &self.env {
            config.env = env.clone();
        }
        if let Some(rps) = self.limiter_rps {
            config.rate_limit.requests_per_second = rps;
        }
        if let Some(burst) = self.limiter_burst {
            config.rate_limit.burst = burst;
        }
        if let Some(enabled) = self.limiter_enabled {
            config.rate_limit.enabled = enabled;
        }
    }
}
