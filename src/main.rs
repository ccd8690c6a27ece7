//! FHIR URL-rewriting reverse proxy.
//!
//! # Architecture Overview
//!
//! ```text
//!                      ┌──────────────────────────────────────────────┐
//!                      │                  FHIR PROXY                  │
//!   Client Request     │  ┌────────┐   ┌───────────┐   ┌───────────┐  │
//!  ────────────────────┼─▶│  http  │──▶│ upstream  │──▶│ forwarder │──┼──▶ Upstream
//!                      │  │ server │   │  policy   │   │ (reqwest) │  │    FHIR server
//!                      │  └────────┘   └───────────┘   └─────┬─────┘  │
//!                      │                                     ▼        │
//!   Client Response    │  ┌────────┐   ┌──────────────────────────┐   │
//!  ◀───────────────────┼──│response│◀──│ bundle rewriter          │◀──┼─── body
//!                      │  └────────┘   │ (fullUrl, link.url)      │   │
//!                      │               └──────────────────────────┘   │
//!                      │  config · logging · metrics · lifecycle      │
//!                      └──────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use fhir_proxy::config::{resolve_config, ConfigOverrides};
use fhir_proxy::observability::{logging, metrics};
use fhir_proxy::{HttpServer, Shutdown};

#[derive(Parser)]
#[command(name = "fhir-proxy")]
#[command(about = "Reverse proxy that rewrites FHIR Bundle links to point at itself", long_about = None)]
struct Cli {
    /// Optional TOML configuration file.
    #[arg(short, long, env = "FHIR_PROXY_CONFIG")]
    config: Option<PathBuf>,

    #[command(flatten)]
    overrides: ConfigOverrides,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();
    let config = resolve_config(cli.config.as_deref(), cli.overrides)?;

    logging::init_logging(&config.observability);

    tracing::info!("fhir-proxy v{} starting", env!("CARGO_PKG_VERSION"));
    tracing::info!(
        bind_address = %config.listener.bind_address,
        public_address = %config.public_address(),
        upstream = %config.upstreams[0],
        upstream_count = config.upstreams.len(),
        "Configuration loaded"
    );
    if config.upstreams.len() > 1 {
        tracing::warn!("Only the first upstream receives traffic");
    }

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => {
                if let Err(e) = metrics::init_metrics(addr) {
                    tracing::error!(error = %e, "Failed to start metrics exporter");
                }
            }
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let server = HttpServer::new(config)?;
    let listener = TcpListener::bind(&server.config().listener.bind_address).await?;

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    shutdown.trigger_on_signal();

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
