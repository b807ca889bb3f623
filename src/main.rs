//! Rewriting Reverse Proxy
//!
//! Forwards every request to a single upstream origin and rewrites the
//! upstream's identity out of redirects, cookies and textual bodies so that
//! clients stay on the proxy's host.
//!
//! # Architecture Overview
//!
//! ```text
//!                         ┌──────────────────────────────────────────────────────┐
//!                         │                  REWRITING PROXY                     │
//!                         │                                                      │
//!   Client Request        │  ┌──────────┐   ┌──────────┐   ┌────────────────┐    │
//!   ──────────────────────┼─▶│  http    │──▶│  origin  │──▶│   upstream     │────┼──▶ Upstream
//!                         │  │  server  │   │ resolver │   │   forwarder    │    │    Origin
//!                         │  └──────────┘   └──────────┘   └───────┬────────┘    │
//!                         │                                        │             │
//!                         │                                        ▼             │
//!   Client Response       │  ┌──────────┐   ┌──────────────────────────────┐     │
//!   ◀─────────────────────┼──│ response │◀──│ rewrite: headers + body      │◀────┼─── Response
//!                         │  │ assembler│   │ (buffered rewrite | stream)  │     │
//!                         │  └──────────┘   └──────────────────────────────┘     │
//!                         │                                                      │
//!                         │  cross-cutting: config · observability · lifecycle   │
//!                         └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use clap::Parser;
use tokio::net::TcpListener;

use rewriting_proxy::config;
use rewriting_proxy::http::HttpServer;
use rewriting_proxy::lifecycle::{signals, Shutdown};
use rewriting_proxy::observability::{logging, metrics};

#[derive(Parser)]
#[command(name = "rewriting-proxy")]
#[command(about = "Reverse proxy that rewrites the upstream host out of responses", long_about = None)]
struct Cli {
    /// TOML configuration file; TARGET_URL and ENABLE_URL_REWRITING override it.
    #[arg(short, long, env = "PROXY_CONFIG")]
    config: Option<PathBuf>,

    /// Address to listen on, e.g. 0.0.0.0:5000.
    #[arg(short, long, env = "BIND_ADDRESS")]
    bind: Option<String>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    let mut config = match config::load(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            logging::init_logging("info");
            tracing::error!(error = %e, "Invalid configuration");
            std::process::exit(1);
        }
    };
    if let Some(bind) = cli.bind {
        config.listener.bind_address = bind;
    }

    logging::init_logging(&config.observability.log_level);
    tracing::info!("rewriting-proxy v{} starting", env!("CARGO_PKG_VERSION"));

    let server = HttpServer::new(config)?;
    let config = server.config();

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

    let listener = TcpListener::bind(&config.listener.bind_address).await?;
    tracing::info!(address = %listener.local_addr()?, "Listening for connections");

    let shutdown = Shutdown::new();
    let server_shutdown = shutdown.subscribe();
    signals::spawn_signal_listener(shutdown);

    server.run(listener, server_shutdown).await?;

    tracing::info!("Shutdown complete");
    Ok(())
}
