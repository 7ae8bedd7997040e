//! traffic-tap: a reverse proxy that reports every exchange.
//!
//! ```text
//!   client ──▶ [ trace → tap → timeout → forward ] ──▶ upstream
//!                        │
//!                        └── detached POST ──▶ collector
//! ```

use std::net::SocketAddr;
use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use traffic_tap::config::{read_config, validate_config, ProxyConfig};
use traffic_tap::error::ConfigError;
use traffic_tap::observability::metrics;
use traffic_tap::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "traffic-tap")]
#[command(about = "Reverse proxy that reports each request/response to a collector", long_about = None)]
struct Cli {
    /// Path to a TOML config file.
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Collector endpoint; overrides `tap.collector_url`.
    #[arg(long)]
    collector_url: Option<String>,

    /// Listen address; overrides `listener.bind_address`.
    #[arg(short, long)]
    bind: Option<String>,

    /// Upstream address; overrides `upstream.address`.
    #[arg(short, long)]
    upstream: Option<String>,
}

impl Cli {
    fn resolve(&self) -> Result<ProxyConfig, ConfigError> {
        let mut config = match &self.config {
            Some(path) => read_config(path)?,
            None => ProxyConfig::default(),
        };

        if let Some(url) = &self.collector_url {
            config.tap.collector_url = Some(url.clone());
        }
        if let Some(bind) = &self.bind {
            config.listener.bind_address = bind.clone();
        }
        if let Some(upstream) = &self.upstream {
            config.upstream.address = upstream.clone();
        }

        validate_config(&config).map_err(ConfigError::Validation)?;
        Ok(config)
    }
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = Cli::parse().resolve()?;

    let level = &config.observability.log_level;
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("traffic_tap={level},tower_http={level}").into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    tracing::info!(
        bind_address = %config.listener.bind_address,
        upstream = %config.upstream.address,
        collector_url = config.tap.collector_url.as_deref().unwrap_or_default(),
        include_correlation_id = config.tap.include_correlation_id,
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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    let shutdown = Shutdown::new();
    let server = HttpServer::new(config)?;
    server.run(listener, shutdown.subscribe()).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
