//! coldwatch server
//!
//! Runs the observability pipeline of the cold-storage backend as a
//! standalone service: the host metrics collector, the instrumented HTTP
//! server and the reporting API.
//!
//! # Architecture Overview
//!
//! ```text
//!                  ┌──────────────────────────────────────────────────────┐
//!                  │                      COLDWATCH                        │
//!                  │                                                       │
//!   ticker ────────┼─▶ collector ──▶ sampler (sysinfo)                     │
//!                  │        │                                              │
//!                  │        ▼ record_system_metrics                        │
//!                  │  ┌─────────────┐     ┌──────────────────────────┐     │
//!                  │  │ MetricsStore│────▶│ PgBackend / MemoryBackend│     │
//!                  │  └─────────────┘     └──────────────────────────┘     │
//!                  │        ▲ record_api_metric (queued)   ▲ reads        │
//!   HTTP request ──┼─▶ http::instrument ──▶ routes          │              │
//!                  │                         └── admin ──▶ analytics      │
//!                  └──────────────────────────────────────────────────────┘
//! ```

use std::path::PathBuf;

use axum::Router;
use clap::Parser;
use tokio::net::TcpListener;

use coldwatch::collector::Collector;
use coldwatch::config::load_config;
use coldwatch::http::HttpServer;
use coldwatch::lifecycle::{open_store, wait_for_signal, Shutdown};
use coldwatch::observability::{logging, metrics};
use coldwatch::sampler::SysinfoSampler;

#[derive(Parser)]
#[command(name = "coldwatch", version, about = "Host and API metrics pipeline")]
struct Args {
    /// Path to a TOML configuration file
    #[arg(short, long, env = "COLDWATCH_CONFIG")]
    config: Option<PathBuf>,
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();

    let config = match load_config(args.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("coldwatch: {e}");
            std::process::exit(2);
        }
    };

    logging::init_logging(&config.observability);

    tracing::info!(version = env!("CARGO_PKG_VERSION"), "coldwatch starting");
    tracing::info!(
        bind_address = %config.server.bind_address,
        database = config.database.url.is_some(),
        collector_interval_secs = config.collector.interval_secs,
        "Configuration loaded"
    );

    if config.observability.metrics_enabled {
        match config.observability.metrics_address.parse() {
            Ok(addr) => metrics::init_metrics(addr),
            Err(_) => tracing::error!(
                metrics_address = %config.observability.metrics_address,
                "Failed to parse metrics address"
            ),
        }
    }

    let store = open_store(&config).await?;
    let shutdown = Shutdown::new();

    let collector = Collector::new(SysinfoSampler::new(), store.clone(), &config.collector);
    let collector_task = tokio::spawn(collector.run(shutdown.subscribe()));

    let listener = TcpListener::bind(&config.server.bind_address).await?;
    let server = HttpServer::new(&config, store.clone(), Router::new());
    let server_task = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_signal().await;
    shutdown.trigger();

    if let Err(e) = server_task.await? {
        tracing::error!(error = %e, "HTTP server exited with error");
    }
    collector_task.await?;

    let flush_limit = config.store.write_timeout();
    if tokio::time::timeout(flush_limit, store.flush()).await.is_err() {
        tracing::warn!(
            pending = store.pending_api_writes(),
            "Shutdown before all API metrics were written"
        );
    }

    tracing::info!("Shutdown complete");
    Ok(())
}
