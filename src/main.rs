use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use stt_relay::{create_router, AppState, Config, NullBackend};
use tracing::{info, warn};

/// WebSocket relay for streaming speech recognition with usage metering.
#[derive(Debug, Parser)]
#[command(name = "stt-relay")]
struct Args {
    /// Config file base path (extension resolved by the config loader)
    #[arg(long, default_value = "config/stt-relay")]
    config: String,

    /// Override the configured HTTP port
    #[arg(long)]
    port: Option<u16>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt::init();

    let args = Args::parse();
    let mut cfg = Config::load(&args.config)
        .with_context(|| format!("failed to load config from {}", args.config))?;
    if let Some(port) = args.port {
        cfg.service.http.port = port;
    }

    info!("{} v{}", cfg.service.name, env!("CARGO_PKG_VERSION"));
    info!(
        rate_per_quantum_usd = cfg.billing.rate_per_quantum_usd,
        quantum_seconds = cfg.billing.quantum_seconds,
        "billing configuration loaded"
    );

    // The upstream recognizer is an external collaborator wired in at
    // deployment; without one the relay still runs, it just never produces
    // transcripts.
    warn!("no upstream recognizer configured, using the inert null backend");
    let backend = Arc::new(NullBackend);

    let addr = format!("{}:{}", cfg.service.http.bind, cfg.service.http.port);
    let state = AppState::new(cfg, backend);
    let router = create_router(state);

    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .with_context(|| format!("failed to bind {addr}"))?;
    info!("listening on {addr}, relay endpoint at ws://{addr}/ws");

    axum::serve(listener, router).await.context("server error")?;

    Ok(())
}
