use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use pageforge_core::{AppConfig, Orchestrator};
use pageforged::{router, AppState};
use tracing::{info, Level};

#[derive(Parser)]
#[command(name = "pageforged")]
#[command(version = pageforge_core::VERSION)]
#[command(about = "Pageforge deployment service", long_about = None)]
struct Args {
    /// Address to listen on
    #[arg(long, env = "PAGEFORGE_BIND", default_value = "0.0.0.0:8080")]
    bind: SocketAddr,

    /// Enable verbose output
    #[arg(short, long)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, env = "PAGEFORGE_JSON_LOGS")]
    json: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let level = if args.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    pageforge_core::init_tracing(args.json, level);

    let config = AppConfig::from_env().context("Failed to load configuration")?;
    let orchestrator =
        Orchestrator::from_config(&config).context("Failed to build deployment pipeline")?;
    let app = router(Arc::new(AppState::new(orchestrator)));

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .with_context(|| format!("Failed to bind {}", args.bind))?;
    info!(address = %args.bind, owner = %config.github.owner, "pageforged listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("pageforged stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!(error = %e, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
